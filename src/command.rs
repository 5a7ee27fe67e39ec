use std::time::Instant;

use eframe::egui::{Pos2, Vec2};

use crate::callgraph::{CallForest, ExpansionSet, ForestNode, FunctionKey};
use crate::layout::{LayoutConfig, LayoutScene, layout_forest};
use crate::source::{DataSourceCoordinator, FetchOutcome, FetchRequest};
use crate::viewport::{Viewport, ViewportConfig};

/// Padding kept around the scene when fitting it to the canvas.
const FIT_PADDING: f32 = 40.0;

/// Input to the explorer. Pointer positions are canvas-local screen
/// coordinates.
#[derive(Debug)]
pub enum Command {
    // Viewport
    Pan { delta: Vec2 },
    Zoom { factor: f32, anchor: Pos2 },
    /// One wheel step; positive `scroll` zooms in.
    Wheel { scroll: f32, anchor: Pos2 },
    ZoomIn { anchor: Pos2 },
    ZoomOut { anchor: Pos2 },
    ResetView,
    FitView { canvas_size: Vec2 },

    // Pointer
    /// Toggles an expand control, selects a node, or starts panning,
    /// depending on what lies under the pointer.
    PointerPressed { pos: Pos2 },
    PointerMoved { pos: Pos2 },
    PointerReleased,
    /// The pointer left the window; a release may never arrive.
    PointerLeft,

    // Expansion and selection
    Toggle { key: FunctionKey },
    /// Collapses every node and restores the default view.
    CollapseAll,
    Select { key: Option<FunctionKey> },

    // Data source
    SetQuery { query: String, now: Instant },
    SubmitQuery,
    ClearQuery,
    Tick { now: Instant },
    SetServerEnabled { enabled: bool },
    NextPage,
    PrevPage,
    SetPage { page: usize },
    SetPageSize { page_size: usize },
    Refresh,
    Reload,
    LoadUpload { label: String, raw: String },
    FetchCompleted { outcome: FetchOutcome },
    DismissError,
}

/// Work the reducer cannot do itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch(FetchRequest),
}

/// Everything the canvas shows, owned in one place and only changed
/// through [`update`].
pub struct ExplorerState {
    layout_config: LayoutConfig,
    coordinator: DataSourceCoordinator,
    forest: CallForest,
    expansion: ExpansionSet,
    viewport: Viewport,
    scene: LayoutScene,
    selected: Option<FunctionKey>,
    dataset_revision: u64,
}

impl ExplorerState {
    pub fn new(
        layout_config: LayoutConfig,
        viewport_config: ViewportConfig,
        coordinator: DataSourceCoordinator,
    ) -> Self {
        let forest = coordinator.active().forest();
        let expansion = ExpansionSet::new();
        let scene = layout_forest(&forest, &expansion, &layout_config);
        let dataset_revision = coordinator.active().revision;
        Self {
            layout_config,
            coordinator,
            forest,
            expansion,
            viewport: Viewport::new(viewport_config),
            scene,
            selected: None,
            dataset_revision,
        }
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    pub fn coordinator(&self) -> &DataSourceCoordinator {
        &self.coordinator
    }

    pub fn forest(&self) -> &CallForest {
        &self.forest
    }

    pub fn expansion(&self) -> &ExpansionSet {
        &self.expansion
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scene(&self) -> &LayoutScene {
        &self.scene
    }

    pub fn selected(&self) -> Option<&FunctionKey> {
        self.selected.as_ref()
    }

    pub fn selected_node(&self) -> Option<&ForestNode> {
        let index = self.forest.index_of(self.selected.as_ref()?)?;
        self.forest.node(index)
    }

    fn relayout(&mut self) {
        self.scene = layout_forest(&self.forest, &self.expansion, &self.layout_config);
    }

    /// Rebuilds the forest when the coordinator has replaced the dataset.
    /// Expansion and selection belong to the old dataset and are dropped.
    fn sync_dataset(&mut self) {
        let active = self.coordinator.active();
        if active.revision == self.dataset_revision {
            return;
        }
        self.dataset_revision = active.revision;
        self.forest = active.forest();
        tracing::debug!(
            label = %active.label,
            nodes = self.forest.node_count(),
            roots = self.forest.roots().len(),
            "rebuilt call forest"
        );
        self.expansion.collapse_all();
        self.selected = None;
        self.relayout();
    }

    fn toggle(&mut self, key: &FunctionKey) {
        if self.forest.index_of(key).is_none() {
            return;
        }
        self.expansion.toggle(key);
        self.relayout();
    }

    fn press(&mut self, pos: Pos2) {
        let world = self.viewport.screen_to_world(pos);
        if let Some(position) = self.scene.control_at(world, &self.layout_config) {
            let key = self.scene.nodes[position].key.clone();
            self.toggle(&key);
        } else if let Some(position) = self.scene.hit_test(world) {
            self.selected = Some(self.scene.nodes[position].key.clone());
        } else {
            self.viewport.begin_pan(pos);
        }
    }

    fn source<F>(&mut self, operation: F) -> Vec<Effect>
    where
        F: FnOnce(&mut DataSourceCoordinator) -> Option<FetchRequest>,
    {
        let request = operation(&mut self.coordinator);
        self.sync_dataset();
        request.map(Effect::Fetch).into_iter().collect()
    }
}

/// Applies one command and returns the effects it asks for.
pub fn update(state: &mut ExplorerState, command: Command) -> Vec<Effect> {
    match command {
        Command::Pan { delta } => {
            state.viewport.pan_by(delta);
            vec![]
        }
        Command::Zoom { factor, anchor } => {
            state.viewport.zoom_at(factor, anchor);
            vec![]
        }
        Command::Wheel { scroll, anchor } => {
            state.viewport.wheel(scroll, anchor);
            vec![]
        }
        Command::ZoomIn { anchor } => {
            state.viewport.zoom_in(anchor);
            vec![]
        }
        Command::ZoomOut { anchor } => {
            state.viewport.zoom_out(anchor);
            vec![]
        }
        Command::ResetView => {
            state.viewport.reset();
            vec![]
        }
        Command::FitView { canvas_size } => {
            state.viewport.fit(state.scene.bounds, canvas_size, FIT_PADDING);
            vec![]
        }

        Command::PointerPressed { pos } => {
            state.press(pos);
            vec![]
        }
        Command::PointerMoved { pos } => {
            state.viewport.pointer_moved(pos);
            vec![]
        }
        Command::PointerReleased | Command::PointerLeft => {
            state.viewport.end_pan();
            vec![]
        }

        Command::Toggle { key } => {
            state.toggle(&key);
            vec![]
        }
        Command::CollapseAll => {
            state.expansion.collapse_all();
            state.viewport.reset();
            state.relayout();
            vec![]
        }
        Command::Select { key } => {
            state.selected = key.filter(|key| state.forest.index_of(key).is_some());
            vec![]
        }

        Command::SetQuery { query, now } => {
            state.coordinator.set_query(query, now);
            vec![]
        }
        Command::SubmitQuery => state.source(DataSourceCoordinator::submit_query),
        Command::ClearQuery => state.source(DataSourceCoordinator::clear_query),
        Command::Tick { now } => state.source(|coordinator| coordinator.tick(now)),
        Command::SetServerEnabled { enabled } => {
            state.source(|coordinator| coordinator.set_server_enabled(enabled))
        }
        Command::NextPage => state.source(DataSourceCoordinator::next_page),
        Command::PrevPage => state.source(DataSourceCoordinator::prev_page),
        Command::SetPage { page } => state.source(|coordinator| coordinator.set_page(page)),
        Command::SetPageSize { page_size } => {
            state.source(|coordinator| coordinator.set_page_size(page_size))
        }
        Command::Refresh => state.source(DataSourceCoordinator::refresh),
        Command::Reload => state.source(DataSourceCoordinator::reload),
        Command::LoadUpload { label, raw } => state.source(|coordinator| {
            // The coordinator keeps the error for the banner.
            let _ = coordinator.load_upload_json(&label, &raw);
            None
        }),
        Command::FetchCompleted { outcome } => state.source(|coordinator| {
            coordinator.complete(outcome);
            None
        }),
        Command::DismissError => {
            state.coordinator.dismiss_error();
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;
    use crate::layout::NodeKind;
    use crate::source::SourceConfig;

    const DATASET: &str = r#"[
        { "name": "main.main", "line": 3, "filePath": "cmd/app/main.go",
          "called": [{ "name": "pkg.Run", "filePath": "pkg/run.go" }] },
        { "name": "pkg.Run", "line": 7, "filePath": "pkg/run.go", "called": [] }
    ]"#;

    fn explorer() -> ExplorerState {
        let mut coordinator = DataSourceCoordinator::with_sample(SourceConfig::default());
        coordinator.load_upload_json("app.json", DATASET).unwrap();
        ExplorerState::new(
            LayoutConfig::default(),
            ViewportConfig::default(),
            coordinator,
        )
    }

    fn control_screen_pos(state: &ExplorerState, position: usize) -> Pos2 {
        let world = state.scene().nodes[position].control_center(state.layout_config());
        state.viewport().world_to_screen(world)
    }

    #[test]
    fn clicking_control_toggles_expansion() {
        let mut state = explorer();
        assert_eq!(state.scene().len(), 1);

        let pos = control_screen_pos(&state, 0);
        update(&mut state, Command::PointerPressed { pos });
        update(&mut state, Command::PointerReleased);
        assert_eq!(state.scene().len(), 2);
        assert_eq!(state.scene().nodes[1].kind, NodeKind::Leaf);
        assert!(!state.viewport().is_panning());

        update(&mut state, Command::PointerPressed { pos });
        assert_eq!(state.scene().len(), 1);
    }

    #[test]
    fn clicking_node_body_selects_it() {
        let mut state = explorer();
        let center = state.scene().nodes[0].rect.center();
        let pos = state.viewport().world_to_screen(center);
        update(&mut state, Command::PointerPressed { pos });
        assert_eq!(state.selected_node().unwrap().name, "main.main");
        assert!(!state.viewport().is_panning());
    }

    #[test]
    fn background_drag_pans_until_pointer_leaves() {
        let mut state = explorer();
        update(&mut state, Command::PointerPressed { pos: pos2(5.0, 5.0) });
        update(&mut state, Command::PointerMoved { pos: pos2(25.0, 15.0) });
        assert_eq!(state.viewport().pan(), vec2(20.0, 10.0));

        update(&mut state, Command::PointerLeft);
        update(&mut state, Command::PointerMoved { pos: pos2(90.0, 90.0) });
        assert_eq!(state.viewport().pan(), vec2(20.0, 10.0));
    }

    #[test]
    fn collapse_all_resets_view() {
        let mut state = explorer();
        let key = FunctionKey::new("main.main", "cmd/app/main.go");
        update(&mut state, Command::Toggle { key });
        update(&mut state, Command::Zoom { factor: 2.0, anchor: pos2(100.0, 100.0) });
        update(&mut state, Command::Pan { delta: vec2(30.0, 0.0) });

        update(&mut state, Command::CollapseAll);
        assert!(state.expansion().is_empty());
        assert_eq!(state.scene().len(), 1);
        assert_eq!(state.viewport().zoom(), 1.0);
        assert_eq!(state.viewport().pan(), Vec2::ZERO);
    }

    #[test]
    fn dataset_replacement_drops_expansion_and_selection() {
        let mut state = explorer();
        let key = FunctionKey::new("main.main", "cmd/app/main.go");
        update(&mut state, Command::Toggle { key: key.clone() });
        update(&mut state, Command::Select { key: Some(key) });

        update(
            &mut state,
            Command::LoadUpload {
                label: "other.json".to_string(),
                raw: r#"[{ "name": "x.X", "filePath": "x.go" }]"#.to_string(),
            },
        );
        assert!(state.expansion().is_empty());
        assert!(state.selected().is_none());
        assert_eq!(state.scene().nodes[0].label, "X");
    }

    #[test]
    fn rejected_upload_keeps_scene() {
        let mut state = explorer();
        let key = FunctionKey::new("main.main", "cmd/app/main.go");
        update(&mut state, Command::Toggle { key });
        update(
            &mut state,
            Command::LoadUpload {
                label: "broken.json".to_string(),
                raw: "{".to_string(),
            },
        );
        assert_eq!(state.scene().len(), 2);
        assert!(state.coordinator().error().is_some());

        update(&mut state, Command::DismissError);
        assert!(state.coordinator().error().is_none());
    }

    #[test]
    fn enabling_server_requests_first_page() {
        let mut state = explorer();
        let effects = update(&mut state, Command::SetServerEnabled { enabled: true });
        let [Effect::Fetch(request)] = effects.as_slice() else {
            panic!("expected one fetch, got {effects:?}");
        };
        assert_eq!((request.page, request.page_size), (1, 5));
        assert!(state.coordinator().is_loading());
    }

    #[test]
    fn fit_view_shows_whole_scene() {
        let mut state = explorer();
        let canvas = vec2(800.0, 600.0);
        update(&mut state, Command::FitView { canvas_size: canvas });
        let bounds = state.scene().bounds;
        let min = state.viewport().world_to_screen(bounds.min);
        let max = state.viewport().world_to_screen(bounds.max);
        assert!(min.x >= 0.0 && min.y >= 0.0);
        assert!(max.x <= canvas.x && max.y <= canvas.y);
    }
}
