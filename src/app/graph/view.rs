use std::collections::HashSet;

use eframe::egui::epaint::CubicBezierShape;
use eframe::egui::{
    self, Align2, Color32, CornerRadius, FontId, Pos2, Rect, Sense, Stroke, StrokeKind, Ui, vec2,
};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use callmap::layout::{LayoutScene, NodeKind};
use callmap::util::call_badge;

use super::super::ViewModel;
use super::super::render_utils::{
    blend_color, curve_visible, dim_color, draw_background, font_size, node_fill,
};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Scene positions whose label fuzzy-matches `query`.
fn search_matches(scene: &LayoutScene, query: &str) -> HashSet<usize> {
    let query = query.trim();
    if query.is_empty() {
        return HashSet::new();
    }

    let matcher = SkimMatcherV2::default();
    scene
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, placed)| fuzzy_match_score(&matcher, &placed.label, query).is_some())
        .map(|(position, _)| position)
        .collect()
}

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.canvas_size = rect.size();

        self.handle_canvas_input(ui, rect, &response);
        let hovered = self.hovered_node(ui, rect);

        let painter = ui.painter_at(rect);
        let viewport = self.explorer.viewport();
        let zoom = viewport.zoom();
        draw_background(&painter, rect, viewport.pan(), zoom);

        let scene = self.explorer.scene();
        let config = self.explorer.layout_config();
        let selected = self.explorer.selected();
        let to_screen = |world: Pos2| rect.min + viewport.world_to_screen(world).to_vec2();

        if scene.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No functions in this dataset.",
                FontId::proportional(16.0),
                Color32::from_gray(200),
            );
            return;
        }

        let matches = search_matches(scene, &self.search);
        let search_active = !matches.is_empty();

        let connector_stroke = Stroke::new((1.6 * zoom.sqrt()).clamp(0.8, 3.0), Color32::from_gray(120));
        for placed in &scene.nodes {
            let Some(connector) = placed.connector else {
                continue;
            };
            let points = connector.points.map(to_screen);
            if !curve_visible(rect, &points, 2.0) {
                continue;
            }
            painter.add(CubicBezierShape::from_points_stroke(
                points,
                false,
                Color32::TRANSPARENT,
                connector_stroke,
            ));
        }

        let selected_color = Color32::from_rgb(245, 206, 93);
        let mut selection_animating = false;
        let text_size = font_size(zoom);
        let rounding = CornerRadius::same((6.0 * zoom).clamp(1.0, 12.0) as u8);

        for (position, placed) in scene.nodes.iter().enumerate() {
            let node_rect = Rect::from_min_max(to_screen(placed.rect.min), to_screen(placed.rect.max));
            let control_center = to_screen(placed.control_center(config));
            let control_radius = config.control_radius * zoom;
            let extent = node_rect.union(Rect::from_center_size(
                control_center,
                vec2(control_radius, control_radius) * 2.0,
            ));
            if !rect.intersects(extent) {
                continue;
            }

            let is_selected = selected == Some(&placed.key);
            let is_hovered = hovered == Some(position);
            let is_match = matches.contains(&position);

            let base_color = node_fill(placed.kind, placed.synthetic);
            let unselected_color = if is_hovered {
                blend_color(base_color, Color32::WHITE, 0.18)
            } else if is_match {
                blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.68)
            } else if search_active {
                dim_color(base_color, 0.45)
            } else {
                base_color
            };

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("node-selection", placed.key.as_str())),
                is_selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }
            let fill = blend_color(unselected_color, selected_color, selection_mix * 0.55);

            painter.rect_filled(node_rect, rounding, fill);
            let outline = if placed.kind == NodeKind::Recursive {
                Stroke::new(1.5, Color32::from_rgb(210, 170, 230))
            } else {
                Stroke::new(1.0 + selection_mix * 1.4, blend_color(
                    Color32::from_rgba_unmultiplied(15, 15, 15, 190),
                    selected_color,
                    selection_mix,
                ))
            };
            painter.rect_stroke(node_rect, rounding, outline, StrokeKind::Inside);

            let label = if placed.kind == NodeKind::Recursive {
                format!("{} (recursive)", placed.label)
            } else {
                placed.label.clone()
            };
            painter.text(
                node_rect.center(),
                Align2::CENTER_CENTER,
                label,
                FontId::proportional(text_size),
                Color32::from_gray(240),
            );

            if placed.has_expand_control() {
                painter.text(
                    node_rect.center_bottom() + vec2(0.0, 2.0 * zoom),
                    Align2::CENTER_TOP,
                    call_badge(placed.call_count),
                    FontId::proportional(text_size * 0.75),
                    Color32::from_gray(170),
                );

                painter.circle_filled(control_center, control_radius, Color32::from_rgb(36, 42, 52));
                painter.circle_stroke(control_center, control_radius, Stroke::new(1.0, Color32::from_gray(150)));
                let glyph = if placed.kind == NodeKind::Expanded { "<" } else { ">" };
                painter.text(
                    control_center,
                    Align2::CENTER_CENTER,
                    glyph,
                    FontId::monospace(text_size),
                    Color32::from_gray(230),
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        if self.explorer.viewport().is_panning() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::Grabbing);
        } else if let Some(position) = hovered {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
            let placed = &scene.nodes[position];
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!("{}  |  {}", placed.key, call_badge(placed.call_count)),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }
    }
}
