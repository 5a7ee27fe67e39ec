use std::path::{Path, PathBuf};

use eframe::egui::{self, Align, Align2, Color32, Context, FontId, Id, LayerId, Layout, Order, RichText};

use callmap::command::Command;

use super::super::ViewModel;

fn is_json(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        is_loading_file: bool,
        open_requested: &mut Option<PathBuf>,
    ) {
        self.poll_background(ctx);
        self.handle_dropped_files(ctx, open_requested);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("callmap");
                    ui.separator();
                    ui.label(self.status_text());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if is_loading_file || self.explorer.coordinator().is_loading() {
                            ui.spinner();
                        }
                        ui.label(self.explorer.coordinator().mode().label());
                        ui.checkbox(&mut self.show_details, "Details");
                    });
                });
            });

        self.draw_error_banner(ctx);

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui, is_loading_file, open_requested));

        if self.show_details {
            egui::SidePanel::right("details")
                .resizable(true)
                .default_width(320.0)
                .show(ctx, |ui| self.draw_details(ui));
        }

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));

        Self::draw_drop_overlay(ctx);
    }

    /// Dataset label, page position and visible node count.
    fn status_text(&self) -> String {
        let coordinator = self.explorer.coordinator();
        let pagination = coordinator.pagination();
        let mut text = coordinator.active().label.clone();
        if coordinator.mode().is_paginated() {
            text.push_str(&format!(
                "  |  page {} / {}",
                pagination.page,
                pagination.page_count()
            ));
        }
        text.push_str(&format!("  |  {} visible", self.explorer.scene().len()));
        text
    }

    fn draw_error_banner(&mut self, ctx: &Context) {
        let error = self
            .explorer
            .coordinator()
            .error()
            .map(str::to_owned)
            .or_else(|| self.notice.clone());
        let Some(error) = error else {
            return;
        };

        egui::TopBottomPanel::top("error_banner")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(error).color(Color32::from_rgb(255, 120, 110)));
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.button("Dismiss").clicked() {
                            self.notice = None;
                            self.dispatch(Command::DismissError);
                        }
                    });
                });
            });
    }

    fn handle_dropped_files(&mut self, ctx: &Context, open_requested: &mut Option<PathBuf>) {
        let dropped = ctx.input(|input| input.raw.dropped_files.clone());
        for file in dropped {
            let name = file
                .path
                .as_ref()
                .and_then(|path| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.name.clone());
            if !is_json(&name) {
                tracing::warn!(name = %name, "ignored dropped file that is not JSON");
                self.notice = Some(format!("{name} is not a JSON file"));
                continue;
            }

            if let Some(path) = file.path {
                self.open_path = path.display().to_string();
                *open_requested = Some(path);
            } else if let Some(bytes) = file.bytes {
                match String::from_utf8(bytes.to_vec()) {
                    Ok(raw) => self.load_text(name, raw),
                    Err(error) => self.notice = Some(format!("{name} is not UTF-8: {error}")),
                }
            }
        }
    }

    fn draw_drop_overlay(ctx: &Context) {
        if ctx.input(|input| input.raw.hovered_files.is_empty()) {
            return;
        }

        let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("drop_overlay")));
        let screen = ctx.content_rect();
        painter.rect_filled(screen, 0.0, Color32::from_black_alpha(180));
        painter.text(
            screen.center(),
            Align2::CENTER_CENTER,
            "Drop a JSON call dataset to load it",
            FontId::proportional(22.0),
            Color32::WHITE,
        );
    }
}
