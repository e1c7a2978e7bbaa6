use eframe::egui::{self, Color32, ScrollArea, Ui, RichText};
use egui_extras::DatePickerButton;

use crate::chart::dates::DateUnit;
use crate::chart::style::LegendOrder;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – summary, style and filter widgets
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Controls");
    ui.separator();

    let Some(table) = &state.table else {
        ui.label("No data loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let columns = table.column_names.clone();
    let unique = table.unique_values.clone();
    let numeric_cols = table.numeric_columns();
    let grouping_cols = table.grouping_columns();
    let date_cols = table.date_columns();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Summary settings ----
            ui.strong("Summary");
            if column_combo(ui, "value_col", "Value", &numeric_cols, &mut state.value_column) {
                state.resummarize();
            }
            if column_combo(ui, "group_col", "Group", &grouping_cols, &mut state.group_column) {
                state.resummarize();
            }
            if column_combo(ui, "series_col", "Series", &grouping_cols, &mut state.series_column) {
                state.resummarize();
            }
            if column_combo(ui, "date_col", "Date", &date_cols, &mut state.date_column) {
                state.refilter();
            }
            confidence_combo(ui, state);
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Min observations");
                if ui
                    .add(egui::DragValue::new(&mut state.min_obs).range(1..=100))
                    .changed()
                {
                    state.resummarize();
                }
            });
            ui.separator();

            // ---- Chart style ----
            ui.strong("Style");
            legend_order_controls(ui, state);
            if ui
                .checkbox(&mut state.style.reverse_legend, "Reverse legend")
                .changed()
            {
                state.resummarize();
            }

            let mut wrap_on = state.style.wrap_width.is_some();
            if ui.checkbox(&mut wrap_on, "Wrap category labels").changed() {
                state.style.wrap_width = if wrap_on { Some(12) } else { None };
            }
            if let Some(width) = &mut state.style.wrap_width {
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("Wrap at");
                    ui.add(egui::DragValue::new(width).range(2..=60));
                });
            }

            ui.checkbox(&mut state.style.show_x_grid, "x gridlines");
            ui.checkbox(&mut state.style.show_y_grid, "y gridlines");
            date_axis_controls(ui, state);
            ui.separator();

            // ---- Date range ----
            ui.strong("Date range");
            if state.date_column.is_none() {
                ui.label("Pick a date column to restrict by date.");
            } else {
                let mut changed = ui
                    .checkbox(&mut state.date_span_enabled, "Restrict to range")
                    .changed();
                if state.date_span_enabled {
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("From");
                        ui.push_id("span_from", |ui: &mut Ui| {
                            changed |= ui
                                .add(DatePickerButton::new(&mut state.date_from))
                                .changed();
                        });
                    });
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("To");
                        ui.push_id("span_to", |ui: &mut Ui| {
                            changed |= ui
                                .add(DatePickerButton::new(&mut state.date_to))
                                .changed();
                        });
                    });
                }
                if changed {
                    state.refilter();
                }
            }
            ui.separator();

            // ---- Per-column filter widgets (collapsible) ----
            ui.strong("Filters");
            for col in &columns {
                let Some(all_values) = unique.get(col) else {
                    continue;
                };

                let n_selected = state.filters.get(col).map(|s| s.len()).unwrap_or(0);
                let n_total = all_values.len();
                let header_text = format!("{col}  ({n_selected}/{n_total})");

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(col)
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(col);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(col);
                            }
                        });

                        for val in all_values {
                            let is_selected = state
                                .filters
                                .get(col)
                                .is_some_and(|s| s.contains(val));
                            let label = val.to_string();

                            // Show a colour swatch if this is the series column
                            let mut text = RichText::new(&label);
                            if state.series_column.as_deref() == Some(col) {
                                if let Some(cm) = &state.color_map {
                                    text = text.color(cm.color_for(&label));
                                }
                            }

                            let mut checked = is_selected;
                            if ui.checkbox(&mut checked, text).changed() {
                                state.toggle_filter_value(col, val);
                            }
                        }
                    });
            }
            ui.separator();

            // ---- Ordered legend ----
            if let Some(map) = &state.color_map {
                ui.strong("Legend");
                for (name, color) in map.legend_entries() {
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label(RichText::new("■").color(color));
                        ui.label(name);
                    });
                }
            }
        });
}

/// Column picker with a "(none)" entry; returns true when the choice
/// changed.
fn column_combo(
    ui: &mut Ui,
    id: &str,
    label: &str,
    choices: &[String],
    current: &mut Option<String>,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        let shown = current.clone().unwrap_or_else(|| "(none)".to_owned());
        egui::ComboBox::from_id_salt(id)
            .selected_text(shown)
            .show_ui(ui, |ui: &mut Ui| {
                if ui.selectable_label(current.is_none(), "(none)").clicked() {
                    *current = None;
                    changed = true;
                }
                for col in choices {
                    if ui
                        .selectable_label(current.as_ref() == Some(col), col)
                        .clicked()
                    {
                        *current = Some(col.clone());
                        changed = true;
                    }
                }
            });
    });
    changed
}

const CONFIDENCE_PRESETS: [f64; 3] = [0.90, 0.95, 0.99];

fn confidence_combo(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Confidence");
        let shown = format!("{:.0} %", state.confidence_level * 100.0);
        egui::ComboBox::from_id_salt("confidence_level")
            .selected_text(shown)
            .show_ui(ui, |ui: &mut Ui| {
                for level in CONFIDENCE_PRESETS {
                    let text = format!("{:.0} %", level * 100.0);
                    let selected = (state.confidence_level - level).abs() < 1e-9;
                    if ui.selectable_label(selected, text).clicked() {
                        state.confidence_level = level;
                        state.resummarize();
                    }
                }
            });
    });
}

fn legend_order_controls(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Legend order");
        egui::ComboBox::from_id_salt("legend_order")
            .selected_text(state.style.legend.label())
            .show_ui(ui, |ui: &mut Ui| {
                let alphabetical =
                    matches!(state.style.legend, LegendOrder::Alphabetical);
                if ui.selectable_label(alphabetical, "Alphabetical").clicked() {
                    state.style.legend = LegendOrder::Alphabetical;
                    state.resummarize();
                }
                let data_order = matches!(state.style.legend, LegendOrder::DataOrder);
                if ui.selectable_label(data_order, "Data order").clicked() {
                    state.style.legend = LegendOrder::DataOrder;
                    state.resummarize();
                }
                let custom = matches!(state.style.legend, LegendOrder::Explicit(_));
                if ui.selectable_label(custom, "Custom").clicked() {
                    state.apply_legend_text();
                }
            });
    });
    if matches!(state.style.legend, LegendOrder::Explicit(_)) {
        ui.horizontal(|ui: &mut Ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut state.legend_order_text)
                    .hint_text("first, second, third"),
            );
            if response.lost_focus() || ui.small_button("Apply").clicked() {
                state.apply_legend_text();
            }
        });
    }
}

fn date_axis_controls(ui: &mut Ui, state: &mut AppState) {
    if state.date_column.is_none() {
        return;
    }
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Ticks every");
        ui.add(egui::DragValue::new(&mut state.style.date_axis.breaks.every).range(1..=60));
        let shown = state.style.date_axis.breaks.unit.label();
        egui::ComboBox::from_id_salt("date_unit")
            .selected_text(shown)
            .show_ui(ui, |ui: &mut Ui| {
                for unit in DateUnit::ALL {
                    let selected = state.style.date_axis.breaks.unit == unit;
                    if ui.selectable_label(selected, unit.label()).clicked() {
                        state.style.date_axis.breaks.unit = unit;
                    }
                }
            });
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Tick format");
        ui.add(
            egui::TextEdit::singleline(&mut state.style.date_axis.format)
                .hint_text("%b %Y")
                .desired_width(80.0),
        );
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.menu_button("Archive", |ui: &mut Ui| {
            if ui.button("Fetch dataset…").clicked() {
                state.show_archive_window = true;
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            let source = state.source_name.as_deref().unwrap_or("data");
            ui.label(format!(
                "{source}: {} rows, {} visible",
                table.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Archive window
// ---------------------------------------------------------------------------

/// Floating window with the archive fetch form.
pub fn archive_window(ctx: &egui::Context, state: &mut AppState) {
    if !state.show_archive_window {
        return;
    }
    let mut open = true;
    egui::Window::new("Fetch from archive")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .default_width(360.0)
        .show(ctx, |ui: &mut Ui| {
            egui::Grid::new("archive_form")
                .num_columns(2)
                .show(ui, |ui: &mut Ui| {
                    ui.label("Server");
                    ui.text_edit_singleline(&mut state.archive_server);
                    ui.end_row();

                    ui.label("Dataset DOI");
                    ui.add(
                        egui::TextEdit::singleline(&mut state.archive_doi)
                            .hint_text("doi:10.70122/FK2/..."),
                    );
                    ui.end_row();

                    ui.label("File name");
                    ui.add(
                        egui::TextEdit::singleline(&mut state.archive_file)
                            .hint_text("field_samples.tab"),
                    );
                    ui.end_row();
                });
            ui.add_space(4.0);
            ui.small("The API token is read from DATAVERSE_KEY when set.");
            ui.add_space(4.0);
            if ui.button("Fetch").clicked() {
                state.fetch_archive();
            }
        });
    if !open {
        state.show_archive_window = false;
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open tabular data")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv", "tsv", "tab"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV / TSV", &["csv", "tsv", "tab"])
        .pick_file();

    if let Some(path) = file {
        state.open_file(&path);
    }
}
