// src/gui/components/ranking_table.rs
//
// Central table: Ranking View of the selected feed. Purely a view.

use eframe::egui::{self, Align, Layout, RichText};
use egui_extras::{Column, TableBuilder};

use crate::gui::app::App;

fn seen(b: Option<crate::core::TimeBucket>) -> String {
    b.map(|b| b.label()).unwrap_or_default()
}

pub fn draw(ui: &mut egui::Ui, app: &mut App) {
    let Some(view) = &app.view else {
        ui.centered_and_justified(|ui| ui.label("No data for this feed yet."));
        return;
    };
    let ranking = &view.ranking;
    let Some(column) = ranking.column.as_deref() else {
        ui.label("Table has no time columns.");
        return;
    };

    ui.label(RichText::new(format!("Ranked by {column}")).strong());
    ui.add_space(4.0);

    let keys = ranking.key_headers.len();
    let mut headers: Vec<String> = vec![s!("#")];
    headers.extend(ranking.key_headers.iter().cloned());
    headers.extend([s!("Name"), s!("Viewers"), s!("First seen"), s!("Last seen")]);

    TableBuilder::new(ui)
        .striped(true)
        .cell_layout(Layout::left_to_right(Align::Center))
        .column(Column::exact(40.0))
        .columns(Column::initial(120.0).resizable(true).clip(true), keys)
        .column(Column::initial(200.0).resizable(true).clip(true))
        .column(Column::initial(80.0).resizable(true))
        .column(Column::initial(150.0).resizable(true))
        .column(Column::remainder())
        .header(24.0, |mut header| {
            for h in &headers {
                header.col(|ui| {
                    ui.strong(h);
                });
            }
        })
        .body(|body| {
            body.rows(20.0, ranking.rows.len(), |mut row| {
                let Some(r) = ranking.rows.get(row.index()) else { return };
                row.col(|ui| {
                    ui.label(r.rank.to_string());
                });
                for f in r.key.fields() {
                    row.col(|ui| {
                        ui.label(f);
                    });
                }
                row.col(|ui| {
                    ui.label(&r.name);
                });
                row.col(|ui| {
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(r.value.map(|v| v.to_string()).unwrap_or_else(|| s!("-")));
                    });
                });
                row.col(|ui| {
                    ui.label(seen(r.first_seen));
                });
                row.col(|ui| {
                    ui.label(seen(r.last_seen));
                });
            });
        });
}
