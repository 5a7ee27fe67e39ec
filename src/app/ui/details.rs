use eframe::egui::{self, RichText, Ui};

use callmap::command::Command;
use callmap::util::{call_badge, display_name};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Function Details");
        ui.add_space(6.0);

        let Some(node) = self.explorer.selected_node() else {
            ui.label("Select a node on the canvas.");
            return;
        };

        let title = display_name(&node.name, &node.file_path);
        let name = node.name.clone();
        let file_path = node.file_path.clone();
        let line = node.line;
        let synthetic = node.synthetic;
        let key = node.key.clone();
        let callees = node
            .children
            .iter()
            .filter_map(|&child| self.explorer.forest().node(child))
            .map(|child| (child.key.clone(), child.name.clone(), child.file_path.clone(), child.line))
            .collect::<Vec<_>>();

        ui.label(RichText::new(title).strong());
        ui.small(name.as_str());
        ui.add_space(6.0);

        ui.label(format!("File: {file_path}"));
        match line {
            Some(line) if line > 0 => ui.label(format!("Line: {line}")),
            _ => ui.label("Line: unknown"),
        };
        if synthetic {
            ui.label("Not defined in this dataset (external or outside the current page).");
        }

        let expanded = self.explorer.expansion().is_expanded(&key);
        if !callees.is_empty() {
            let text = if expanded { "Collapse" } else { "Expand" };
            if ui.button(text).clicked() {
                self.dispatch(Command::Toggle { key: key.clone() });
            }
        }

        ui.separator();
        ui.label(RichText::new(format!("Calls ({})", call_badge(callees.len()))).strong());
        if callees.is_empty() {
            ui.label("This function makes no calls.");
            return;
        }

        egui::ScrollArea::vertical()
            .id_salt("callee_list_scroll")
            .max_height(360.0)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (callee_key, callee_name, callee_path, callee_line) in callees {
                    let short = display_name(&callee_name, &callee_path);
                    let label = match callee_line {
                        Some(line) if line > 0 => format!("{short}  ({callee_path}:{line})"),
                        _ => format!("{short}  ({callee_path})"),
                    };
                    if ui.link(label).on_hover_text(callee_name.as_str()).clicked() {
                        self.dispatch(Command::Select {
                            key: Some(callee_key),
                        });
                    }
                }
            });
    }
}
