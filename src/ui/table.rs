use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Summary table (bottom panel)
// ---------------------------------------------------------------------------

/// Render the grouped summary as a table: one row per group, key columns
/// first, then n, mean, sd, se and the interval bounds.
pub fn summary_table(ui: &mut Ui, state: &AppState) {
    if state.summaries.is_empty() {
        ui.label("No summary to show.");
        return;
    }

    let key_columns = &state.summary_group_columns;
    let stat_headers = ["n", "mean", "sd", "se", "ci low", "ci high"];

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .columns(Column::auto(), key_columns.len() + stat_headers.len() - 1)
        .column(Column::remainder())
        .header(20.0, |mut header| {
            for col in key_columns {
                header.col(|ui| {
                    ui.strong(col);
                });
            }
            for name in stat_headers {
                header.col(|ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, state.summaries.len(), |mut row| {
                let s = &state.summaries[row.index()];
                for key in &s.keys {
                    row.col(|ui| {
                        ui.label(key.to_string());
                    });
                }
                row.col(|ui| {
                    ui.label(s.n.to_string());
                });
                row.col(|ui| {
                    ui.label(format!("{:.3}", s.mean));
                });
                for stat in [s.sd, s.se, s.ci_lower, s.ci_upper] {
                    row.col(|ui| {
                        ui.label(fmt_stat(stat));
                    });
                }
            });
        });
}

/// Missing statistics (singleton groups) show as NA, like missing cells.
fn fmt_stat(value: Option<f64>) -> String {
    match value {
        Some(x) => format!("{x:.3}"),
        None => "NA".to_owned(),
    }
}
