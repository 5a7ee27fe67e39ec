use eframe::egui::{self, Event, PointerButton, Pos2, Rect, Ui};

use callmap::command::Command;

use super::super::ViewModel;

/// Canvas-local position of a window position.
fn to_canvas(rect: Rect, pos: Pos2) -> Pos2 {
    (pos - rect.min).to_pos2()
}

impl ViewModel {
    /// Turns this frame's raw pointer events into commands. Moves and
    /// releases are taken from the whole window so a drag that leaves the
    /// canvas keeps panning until the button goes up.
    pub(in crate::app) fn handle_canvas_input(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        let events = ui.input(|input| input.events.clone());
        for event in events {
            let command = match event {
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed: true,
                    ..
                } if rect.contains(pos) && response.hovered() => Command::PointerPressed {
                    pos: to_canvas(rect, pos),
                },
                Event::PointerButton {
                    button: PointerButton::Primary,
                    pressed: false,
                    ..
                } => Command::PointerReleased,
                Event::PointerMoved(pos) => Command::PointerMoved {
                    pos: to_canvas(rect, pos),
                },
                Event::PointerGone => Command::PointerLeft,
                _ => continue,
            };
            self.dispatch(command);
        }

        self.handle_canvas_zoom(ui, rect, response);
    }

    fn handle_canvas_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        self.dispatch(Command::Wheel {
            scroll,
            anchor: to_canvas(rect, pointer),
        });
    }

    /// Index in the scene of the node under the pointer, if any.
    pub(in crate::app) fn hovered_node(&self, ui: &Ui, rect: Rect) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        if !rect.contains(pointer) || self.explorer.viewport().is_panning() {
            return None;
        }
        let world = self
            .explorer
            .viewport()
            .screen_to_world(to_canvas(rect, pointer));
        self.explorer.scene().hit_test(world)
    }
}
