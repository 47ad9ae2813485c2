// src/gui/components/action_bar.rs
use eframe::egui;

use crate::gui::app::App;

pub fn draw(ui: &mut egui::Ui, app: &mut App) {
    ui.horizontal(|ui| {
        let running = app.running();

        if ui.add_enabled(!running, egui::Button::new("Reload")).clicked() {
            logf!("UI: reload");
            app.reload();
        }

        if ui.add_enabled(!running, egui::Button::new("Collect now")).clicked() {
            app.start_run();
        }
        if running {
            ui.spinner();
        }

        ui.separator();

        let mut all = app.state.gui.top_k.is_none();
        if ui.checkbox(&mut all, "All rows").changed() {
            app.state.gui.top_k = if all { None } else { Some(100) };
            app.reload();
        }
        if let Some(k) = app.state.gui.top_k.as_mut() {
            ui.label("Top");
            let resp = ui.add(egui::DragValue::new(k).range(1..=100_000));
            if resp.drag_stopped() || resp.lost_focus() {
                logf!("UI: top_k -> {}", k);
                app.reload();
            }
        }

        ui.separator();
        ui.label(format!("data: {}", app.state.options.data_dir.display()));
    });
}
