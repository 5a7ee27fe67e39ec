use std::collections::HashSet;

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};
use serde::Deserialize;

use crate::callgraph::{CallForest, ExpansionSet, FunctionKey, NodeIndex};
use crate::util::display_name;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub origin_x: f32,
    pub origin_y: f32,
    /// Vertical slot taken by one collapsed node.
    pub row_height: f32,
    pub node_height: f32,
    pub min_node_width: f32,
    pub base_node_width: f32,
    pub char_width: f32,
    /// Horizontal space between a parent's right edge and its children.
    pub column_gutter: f32,
    /// Horizontal offset of the connector control points from each endpoint.
    pub connector_offset: f32,
    pub control_radius: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 50.0,
            origin_y: 100.0,
            row_height: 60.0,
            node_height: 40.0,
            min_node_width: 120.0,
            base_node_width: 60.0,
            char_width: 8.0,
            column_gutter: 120.0,
            connector_offset: 60.0,
            control_radius: 12.0,
        }
    }
}

impl LayoutConfig {
    pub fn node_width(&self, label: &str) -> f32 {
        let chars = label.chars().count() as f32;
        self.min_node_width
            .max(self.base_node_width + self.char_width * chars)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// No callees; no expand control.
    Leaf,
    Collapsed,
    Expanded,
    /// The node already appears on its own ancestor path. Rendered as a
    /// terminal marker instead of being descended into again.
    Recursive,
}

/// Cubic curve from a parent's right edge to a child's left edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connector {
    pub points: [Pos2; 4],
}

impl Connector {
    fn between(from: Pos2, to: Pos2, offset: f32) -> Self {
        Self {
            points: [from, from + vec2(offset, 0.0), to - vec2(offset, 0.0), to],
        }
    }
}

#[cfg(test)]
impl Connector {
    fn start(&self) -> Pos2 {
        self.points[0]
    }

    fn end(&self) -> Pos2 {
        self.points[3]
    }

    fn point_at(&self, t: f32) -> Pos2 {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let [p0, p1, p2, p3] = self.points;
        let weights = [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t];
        pos2(
            weights[0] * p0.x + weights[1] * p1.x + weights[2] * p2.x + weights[3] * p3.x,
            weights[0] * p0.y + weights[1] * p1.y + weights[2] * p2.y + weights[3] * p3.y,
        )
    }
}

#[derive(Clone, Debug)]
pub struct PlacedNode {
    pub node: NodeIndex,
    pub key: FunctionKey,
    pub label: String,
    pub depth: usize,
    /// Position of the parent inside [`LayoutScene::nodes`].
    pub parent: Option<usize>,
    pub rect: Rect,
    pub kind: NodeKind,
    pub call_count: usize,
    pub synthetic: bool,
    pub connector: Option<Connector>,
}

impl PlacedNode {
    pub fn has_expand_control(&self) -> bool {
        matches!(self.kind, NodeKind::Collapsed | NodeKind::Expanded)
    }

    pub fn control_center(&self, config: &LayoutConfig) -> Pos2 {
        self.rect.right_center() + vec2(config.control_radius, 0.0)
    }
}

#[derive(Clone, Debug)]
pub struct LayoutScene {
    pub nodes: Vec<PlacedNode>,
    pub bounds: Rect,
}

impl LayoutScene {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topmost node whose box contains `world`.
    pub fn hit_test(&self, world: Pos2) -> Option<usize> {
        self.nodes
            .iter()
            .rposition(|placed| placed.rect.contains(world))
    }

    pub fn control_at(&self, world: Pos2, config: &LayoutConfig) -> Option<usize> {
        self.nodes.iter().rposition(|placed| {
            placed.has_expand_control()
                && placed.control_center(config).distance(world) <= config.control_radius
        })
    }
}

struct Visit {
    node: NodeIndex,
    parent: Option<usize>,
    depth: usize,
    kind: NodeKind,
}

enum Step {
    Enter {
        index: NodeIndex,
        parent: Option<usize>,
        depth: usize,
    },
    Leave(NodeIndex),
}

/// Pre-order walk of the visible part under `root`. Runs on an explicit stack
/// so deep call chains cannot overflow the thread stack.
fn collect_visible(
    forest: &CallForest,
    expansion: &ExpansionSet,
    root: NodeIndex,
    path: &mut HashSet<NodeIndex>,
    visits: &mut Vec<Visit>,
) {
    let mut stack = vec![Step::Enter {
        index: root,
        parent: None,
        depth: 0,
    }];

    while let Some(step) = stack.pop() {
        let (index, parent, depth) = match step {
            Step::Enter {
                index,
                parent,
                depth,
            } => (index, parent, depth),
            Step::Leave(index) => {
                path.remove(&index);
                continue;
            }
        };
        let Some(node) = forest.node(index) else {
            continue;
        };

        let kind = if path.contains(&index) {
            tracing::trace!(key = %node.key, depth, "call cycle truncated");
            NodeKind::Recursive
        } else if !node.has_children() {
            NodeKind::Leaf
        } else if expansion.is_expanded(&node.key) {
            NodeKind::Expanded
        } else {
            NodeKind::Collapsed
        };

        let position = visits.len();
        visits.push(Visit {
            node: index,
            parent,
            depth,
            kind,
        });

        if kind == NodeKind::Expanded {
            path.insert(index);
            // Leave sits below the children so it pops after the whole subtree.
            stack.push(Step::Leave(index));
            stack.extend(node.children.iter().rev().map(|&child| Step::Enter {
                index: child,
                parent: Some(position),
                depth: depth + 1,
            }));
        }
    }
}

/// Lays out the visible part of `forest`: every root, plus the children of
/// every expanded node whose ancestors are all expanded. Collapsed subtrees
/// are never visited, so cost is bounded by the visible node count.
pub fn layout_forest(
    forest: &CallForest,
    expansion: &ExpansionSet,
    config: &LayoutConfig,
) -> LayoutScene {
    let mut visits = Vec::new();
    let mut path = HashSet::new();
    for &root in forest.roots() {
        collect_visible(forest, expansion, root, &mut path, &mut visits);
    }

    // Visits are in pre-order, so walking backwards sees every child before
    // its parent.
    let mut slot_heights = vec![config.row_height; visits.len()];
    let mut children_height = vec![0.0_f32; visits.len()];
    for position in (0..visits.len()).rev() {
        if children_height[position] > 0.0 {
            slot_heights[position] = children_height[position].max(config.row_height);
        }
        if let Some(parent) = visits[position].parent {
            children_height[parent] += slot_heights[position];
        }
    }

    let mut nodes: Vec<PlacedNode> = Vec::with_capacity(visits.len());
    let mut next_child_top = vec![0.0_f32; visits.len()];
    let mut next_root_top = config.origin_y;
    let mut bounds = Rect::NOTHING;

    for (position, visit) in visits.iter().enumerate() {
        let Some(node) = forest.node(visit.node) else {
            continue;
        };

        let top = match visit.parent {
            Some(parent) => &mut next_child_top[parent],
            None => &mut next_root_top,
        };
        let slot_top = *top;
        *top += slot_heights[position];
        next_child_top[position] = slot_top;

        let x = match visit.parent {
            Some(parent) => nodes[parent].rect.right() + config.column_gutter,
            None => config.origin_x,
        };
        let center_y = slot_top + slot_heights[position] / 2.0;
        let label = display_name(&node.name, &node.file_path);
        let width = config.node_width(&label);
        let rect = Rect::from_min_size(
            pos2(x, center_y - config.node_height / 2.0),
            vec2(width, config.node_height),
        );

        let connector = visit.parent.map(|parent| {
            Connector::between(
                nodes[parent].rect.right_center(),
                rect.left_center(),
                config.connector_offset,
            )
        });

        bounds = bounds.union(rect);
        if matches!(visit.kind, NodeKind::Collapsed | NodeKind::Expanded) {
            let control = rect.right_center() + vec2(config.control_radius * 2.0, 0.0);
            bounds = bounds.union(Rect::from_min_max(control, control));
        }

        nodes.push(PlacedNode {
            node: visit.node,
            key: node.key.clone(),
            label,
            depth: visit.depth,
            parent: visit.parent,
            rect,
            kind: visit.kind,
            call_count: node.call_count(),
            synthetic: node.synthetic,
            connector,
        });
    }

    if nodes.is_empty() {
        bounds = Rect::from_min_size(pos2(config.origin_x, config.origin_y), Vec2::ZERO);
    }

    LayoutScene { nodes, bounds }
}
