// src/gui/components/feed_panel.rs
//
// Left panel: one entry per known feed; feeds without data are greyed.

use eframe::egui::{self, RichText};

use crate::gui::app::App;

pub fn draw(ui: &mut egui::Ui, app: &mut App) {
    ui.heading("Feeds");
    ui.separator();

    let root = app.state.options.data_dir.clone();
    let selected = app.state.gui.selected_feed;
    let mut clicked = None;

    egui::ScrollArea::vertical().show(ui, |ui| {
        for (i, feed) in app.feeds.iter().enumerate() {
            let text = if feed.exists(&root) {
                RichText::new(&feed.id)
            } else {
                RichText::new(&feed.id).weak()
            };
            if ui.selectable_label(i == selected, text).clicked() {
                clicked = Some(i);
            }
        }
    });

    if let Some(i) = clicked {
        app.select(i);
    }

    if let Some(view) = &app.view {
        ui.separator();
        ui.label(format!("{} rows, {} hours", view.rows, view.columns));
        if view.load.repaired() {
            ui.label(RichText::new("table was repaired on load").weak());
        }
    }
}
