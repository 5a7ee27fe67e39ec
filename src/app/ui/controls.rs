use std::path::PathBuf;
use std::time::Instant;

use eframe::egui::{self, Key, Ui};

use callmap::command::Command;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_controls(
        &mut self,
        ui: &mut Ui,
        is_loading_file: bool,
        open_requested: &mut Option<PathBuf>,
    ) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.draw_dataset_controls(ui, is_loading_file, open_requested);
                ui.separator();
                self.draw_source_controls(ui);
                ui.separator();
                self.draw_search_controls(ui);
                ui.separator();
                self.draw_page_controls(ui);
                ui.separator();
                self.draw_view_controls(ui);
            });
    }

    fn draw_dataset_controls(
        &mut self,
        ui: &mut Ui,
        is_loading_file: bool,
        open_requested: &mut Option<PathBuf>,
    ) {
        ui.heading("Dataset");
        ui.small("Open a JSON call dataset, or drop one onto the window.");
        ui.horizontal(|ui| {
            let field = ui.add(
                egui::TextEdit::singleline(&mut self.open_path)
                    .hint_text("path/to/calls.json")
                    .desired_width(180.0),
            );
            let submitted = field.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
            let can_open = !is_loading_file && !self.open_path.trim().is_empty();
            let clicked = ui.add_enabled(can_open, egui::Button::new("Open")).clicked();
            if can_open && (clicked || submitted) {
                *open_requested = Some(PathBuf::from(self.open_path.trim()));
            }
        });
    }

    fn draw_source_controls(&mut self, ui: &mut Ui) {
        ui.heading("Source");

        let mut server_enabled = self.explorer.coordinator().server_enabled();
        let toggle = ui.add_enabled(
            self.worker.is_some(),
            egui::Checkbox::new(&mut server_enabled, "Server mode"),
        );
        if toggle.changed() {
            self.dispatch(Command::SetServerEnabled {
                enabled: server_enabled,
            });
            self.search.clear();
        }

        match &self.server_url {
            Some(url) => {
                ui.small(format!("server: {url}"));
            }
            None => {
                ui.small("No server configured (--server <url>).");
            }
        }

        if server_enabled {
            ui.horizontal(|ui| {
                let loading = self.explorer.coordinator().is_loading();
                if ui
                    .add_enabled(!loading, egui::Button::new("Reload server data"))
                    .on_hover_text("Rebuild the server's dataset, then show page 1")
                    .clicked()
                {
                    self.dispatch(Command::Reload);
                    self.search.clear();
                }
                if let Some(url) = &self.download_url {
                    ui.hyperlink_to("Download", url);
                }
            });
        }
    }

    fn draw_search_controls(&mut self, ui: &mut Ui) {
        ui.heading("Search");

        let field = ui.add(
            egui::TextEdit::singleline(&mut self.search)
                .hint_text("function, file or callee")
                .desired_width(f32::INFINITY),
        );
        if field.changed() {
            self.dispatch(Command::SetQuery {
                query: self.search.clone(),
                now: Instant::now(),
            });
        }
        if field.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter)) {
            self.dispatch(Command::SubmitQuery);
        }

        ui.horizontal(|ui| {
            if ui.button("Search").clicked() {
                self.dispatch(Command::SubmitQuery);
            }
            if ui.button("Clear").clicked() {
                self.search.clear();
                self.dispatch(Command::ClearQuery);
            }
            if self.explorer.coordinator().debounce_deadline().is_some() {
                ui.small("pending...");
            }
        });

        let applied = self.explorer.coordinator().applied_query();
        if !applied.is_empty() {
            ui.small(format!("showing results for \"{applied}\""));
        }
    }

    fn draw_page_controls(&mut self, ui: &mut Ui) {
        ui.heading("Pages");

        let coordinator = self.explorer.coordinator();
        let mode = coordinator.mode();
        let pagination = coordinator.pagination();
        let loading = coordinator.is_loading();
        let choices = coordinator.config().page_size_choices.clone();

        if !mode.is_paginated() {
            ui.label(format!("All {} roots shown", pagination.total));
            return;
        }

        let total_label = if mode.is_search() { "matches" } else { "roots" };
        ui.label(format!(
            "Page {} of {} ({} {total_label})",
            pagination.page,
            pagination.page_count(),
            pagination.total
        ));

        ui.horizontal(|ui| {
            if ui
                .add_enabled(pagination.has_prev() && !loading, egui::Button::new("< Prev"))
                .clicked()
            {
                self.dispatch(Command::PrevPage);
            }
            if ui
                .add_enabled(pagination.has_next() && !loading, egui::Button::new("Next >"))
                .clicked()
            {
                self.dispatch(Command::NextPage);
            }
            if ui.add_enabled(!loading, egui::Button::new("Refresh")).clicked() {
                self.dispatch(Command::Refresh);
            }
        });

        let mut page_size = pagination.page_size;
        egui::ComboBox::from_label("per page")
            .selected_text(page_size.to_string())
            .show_ui(ui, |ui| {
                for choice in choices {
                    ui.selectable_value(&mut page_size, choice, choice.to_string());
                }
            });
        if page_size != pagination.page_size {
            self.dispatch(Command::SetPageSize { page_size });
        }
    }

    fn draw_view_controls(&mut self, ui: &mut Ui) {
        ui.heading("View");

        let anchor = (self.canvas_size / 2.0).to_pos2();
        ui.horizontal(|ui| {
            if ui.button("-").on_hover_text("Zoom out").clicked() {
                self.dispatch(Command::ZoomOut { anchor });
            }
            ui.label(format!("{:.0}%", self.explorer.viewport().zoom() * 100.0));
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                self.dispatch(Command::ZoomIn { anchor });
            }
        });

        ui.horizontal(|ui| {
            if ui.button("Reset view").clicked() {
                self.dispatch(Command::ResetView);
            }
            if ui.button("Fit").clicked() {
                self.dispatch(Command::FitView {
                    canvas_size: self.canvas_size,
                });
            }
            if ui.button("Collapse all").clicked() {
                self.dispatch(Command::CollapseAll);
            }
        });

        ui.small(format!(
            "{} functions, {} expanded",
            self.explorer.forest().node_count(),
            self.explorer.expansion().len()
        ));
    }
}
