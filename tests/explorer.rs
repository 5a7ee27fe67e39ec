use std::io::Write;

use eframe::egui::{Pos2, pos2, vec2};

use callmap::callgraph::{DatasetError, FunctionKey, load_records_file};
use callmap::command::{Command, ExplorerState, update};
use callmap::layout::{LayoutConfig, NodeKind};
use callmap::source::{DataSourceCoordinator, SourceConfig, SourceMode};
use callmap::viewport::ViewportConfig;

fn explorer() -> ExplorerState {
    ExplorerState::new(
        LayoutConfig::default(),
        ViewportConfig::default(),
        DataSourceCoordinator::with_sample(SourceConfig::default()),
    )
}

fn upload(state: &mut ExplorerState, raw: &str) {
    let effects = update(
        state,
        Command::LoadUpload {
            label: "upload.json".to_string(),
            raw: raw.to_string(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.coordinator().error(), None);
}

fn labels(state: &ExplorerState) -> Vec<&str> {
    state
        .scene()
        .nodes
        .iter()
        .map(|placed| placed.label.as_str())
        .collect()
}

/// Screen position of the expand control of the first visible node named `name`.
fn control_of(state: &ExplorerState, name: &str) -> Pos2 {
    let placed = state
        .scene()
        .nodes
        .iter()
        .find(|placed| {
            placed.key.as_str().starts_with(&format!("{name}@")) && placed.has_expand_control()
        })
        .unwrap_or_else(|| panic!("{name} has no visible expand control"));
    state
        .viewport()
        .world_to_screen(placed.control_center(state.layout_config()))
}

fn click_control(state: &mut ExplorerState, name: &str) {
    let pos = control_of(state, name);
    update(state, Command::PointerPressed { pos });
    update(state, Command::PointerReleased);
}

#[test]
fn expanding_main_reveals_its_callee() {
    let mut state = explorer();
    upload(
        &mut state,
        r#"[
            { "name": "main.main", "called": [{ "name": "pkg.Run" }] },
            { "name": "pkg.Run", "called": [] }
        ]"#,
    );
    assert_eq!(labels(&state), ["main"]);

    click_control(&mut state, "main.main");
    assert_eq!(labels(&state), ["main", "Run"]);

    let child = &state.scene().nodes[1];
    assert_eq!(child.kind, NodeKind::Leaf);
    assert_eq!(child.call_count, 0);
    assert!(!child.has_expand_control());
    assert!(!state.viewport().is_panning());

    click_control(&mut state, "main.main");
    assert_eq!(labels(&state), ["main"]);
}

#[test]
fn cycles_stop_at_the_repeated_function() {
    let mut state = explorer();
    upload(
        &mut state,
        r#"[
            { "name": "cmd.Start", "filePath": "cmd/start.go",
              "called": [{ "name": "loop.A", "filePath": "loop/a.go" }] },
            { "name": "loop.A", "filePath": "loop/a.go",
              "called": [{ "name": "loop.B", "filePath": "loop/b.go" }] },
            { "name": "loop.B", "filePath": "loop/b.go",
              "called": [{ "name": "loop.A", "filePath": "loop/a.go" }] }
        ]"#,
    );

    click_control(&mut state, "cmd.Start");
    click_control(&mut state, "loop.A");
    click_control(&mut state, "loop.B");

    let kinds = state
        .scene()
        .nodes
        .iter()
        .map(|placed| placed.kind)
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        [
            NodeKind::Expanded,
            NodeKind::Expanded,
            NodeKind::Expanded,
            NodeKind::Recursive
        ]
    );
    assert_eq!(
        state.scene().nodes[3].key,
        FunctionKey::new("loop.A", "loop/a.go")
    );
}

#[test]
fn unknown_callee_becomes_synthetic_leaf() {
    let mut state = explorer();
    upload(
        &mut state,
        r#"[
            { "name": "svc.Handle", "filePath": "svc/handle.go",
              "called": [{ "name": "fmt.Println", "filePath": "" }] }
        ]"#,
    );
    click_control(&mut state, "svc.Handle");

    let child = state.scene().nodes[1].clone();
    assert!(child.synthetic);
    assert_eq!(child.kind, NodeKind::Leaf);

    update(
        &mut state,
        Command::Select {
            key: Some(child.key),
        },
    );
    let selected = state.selected_node().unwrap();
    assert_eq!(selected.name, "fmt.Println");
    assert_eq!(selected.line, None);
}

#[test]
fn drag_on_background_pans_until_release() {
    let mut state = explorer();
    let start = state.viewport().world_to_screen(pos2(5.0, 5.0));
    let before = state.viewport().pan();

    update(&mut state, Command::PointerPressed { pos: start });
    assert!(state.viewport().is_panning());
    update(
        &mut state,
        Command::PointerMoved {
            pos: start + vec2(30.0, -10.0),
        },
    );
    update(
        &mut state,
        Command::PointerMoved {
            pos: start + vec2(50.0, 0.0),
        },
    );
    update(&mut state, Command::PointerReleased);
    update(
        &mut state,
        Command::PointerMoved {
            pos: start + vec2(500.0, 500.0),
        },
    );

    assert!(!state.viewport().is_panning());
    assert_eq!(state.viewport().pan(), before + vec2(50.0, 0.0));
}

#[test]
fn large_upload_pages_locally_without_fetching() {
    let mut state = explorer();
    let records = (0..12)
        .map(|index| format!(r#"{{ "name": "jobs.Task{index}", "filePath": "jobs/task.go" }}"#))
        .collect::<Vec<_>>()
        .join(",");
    upload(&mut state, &format!("[{records}]"));

    assert_eq!(state.coordinator().mode(), SourceMode::LocalPaged);
    assert_eq!(labels(&state), ["Task0", "Task1", "Task2", "Task3", "Task4"]);

    assert!(update(&mut state, Command::NextPage).is_empty());
    assert_eq!(state.scene().nodes[0].label, "Task5");
    assert_eq!(state.coordinator().active().label, "upload.json (roots page 2)");

    assert!(update(&mut state, Command::SetPage { page: 99 }).is_empty());
    assert_eq!(labels(&state), ["Task10", "Task11"]);
}

#[test]
fn rejected_upload_leaves_graph_alone() {
    let mut state = explorer();
    upload(
        &mut state,
        r#"[{ "name": "main.main", "called": [{ "name": "pkg.Run" }] }]"#,
    );
    click_control(&mut state, "main.main");
    let before = labels(&state).join(",");

    update(
        &mut state,
        Command::LoadUpload {
            label: "broken.json".to_string(),
            raw: r#"{ "name": "main.main" }"#.to_string(),
        },
    );
    assert!(state.coordinator().error().is_some());
    assert_eq!(labels(&state).join(","), before);

    update(&mut state, Command::DismissError);
    assert_eq!(state.coordinator().error(), None);
}

#[test]
fn dataset_files_load_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{ "name": "main.main", "line": 3, "filePath": "main.go", "called": null }}]"#
    )
    .unwrap();

    let records = load_records_file(file.path()).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].calls.is_empty());

    let missing = file.path().with_extension("missing");
    assert!(matches!(
        load_records_file(&missing),
        Err(DatasetError::Io { .. })
    ));
}

#[test]
fn search_draws_every_counted_match_as_a_root() {
    let mut state = explorer();
    upload(
        &mut state,
        r#"[
            { "name": "foo.A", "filePath": "a.go", "called": [{ "name": "bar.C", "filePath": "c.go" }] },
            { "name": "bar.C", "filePath": "c.go", "called": [{ "name": "baz.D", "filePath": "foo/d.go" }] },
            { "name": "baz.D", "filePath": "foo/d.go", "called": [] }
        ]"#,
    );

    update(
        &mut state,
        Command::SetQuery {
            query: "foo".to_string(),
            now: std::time::Instant::now(),
        },
    );
    assert!(update(&mut state, Command::SubmitQuery).is_empty());

    assert_eq!(state.coordinator().mode(), SourceMode::LocalSearch);
    assert_eq!(state.coordinator().pagination().total, 2);
    assert_eq!(state.forest().roots().len(), 2);
    assert_eq!(labels(&state), ["A", "D"]);
}
