use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use callmap::layout::NodeKind;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Grid that moves with the viewport. `pan` is canvas-local.
pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (40.0 * zoom).max(16.0);
    let origin = rect.min + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 60));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

/// Conservative test using the control polygon, which always contains the
/// curve.
pub(super) fn curve_visible(rect: Rect, points: &[Pos2; 4], padding: f32) -> bool {
    let bounds = Rect::from_points(points).expand(padding);
    rect.intersects(bounds)
}

pub(super) fn node_fill(kind: NodeKind, synthetic: bool) -> Color32 {
    if synthetic {
        return Color32::from_rgb(78, 84, 96);
    }
    match kind {
        NodeKind::Leaf => Color32::from_rgb(52, 110, 150),
        NodeKind::Collapsed => Color32::from_rgb(44, 132, 112),
        NodeKind::Expanded => Color32::from_rgb(58, 156, 94),
        NodeKind::Recursive => Color32::from_rgb(132, 92, 150),
    }
}

pub(super) fn font_size(zoom: f32) -> f32 {
    (13.0 * zoom).clamp(6.0, 30.0)
}
