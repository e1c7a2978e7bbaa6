use eframe::egui::{Color32, Ui, Vec2b};
use egui_plot::{GridMark, Line, LineStyle, MarkerShape, Plot, PlotPoints, Points};

use crate::chart::dates::{break_marks, date_to_axis, format_tick};
use crate::data::model::Value;
use crate::state::AppState;

/// Fraction of a category slot the series dots spread across.
const SLOT_SPREAD: f64 = 0.6;
/// Half-width of the whisker caps, in category units.
const CAP_HALF_WIDTH: f64 = 0.08;

// ---------------------------------------------------------------------------
// Summary chart (central panel)
// ---------------------------------------------------------------------------

/// Render the summary chart in the central panel.
pub fn summary_chart(ui: &mut Ui, state: &AppState) {
    if state.table.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file or fetch a dataset  (File → Open…)");
        });
        return;
    }
    if state.summaries.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Nothing to plot with the current selection");
        });
        return;
    }

    if state.date_mode() {
        date_chart(ui, state);
    } else {
        category_chart(ui, state);
    }
}

/// Where the series key sits in the summary key tuple, if anywhere.
fn series_key_index(state: &AppState) -> Option<usize> {
    let col = state.series_column.as_ref()?;
    state.summary_group_columns.iter().position(|c| c == col)
}

/// One legend entry's worth of drawable data.
struct SeriesDraw {
    name: String,
    color: Color32,
    means: Vec<[f64; 2]>,
    lower: Vec<[f64; 2]>,
    upper: Vec<[f64; 2]>,
    whiskers: Vec<[[f64; 2]; 2]>,
}

impl SeriesDraw {
    fn new(name: String, color: Color32) -> Self {
        Self {
            name,
            color,
            means: Vec::new(),
            lower: Vec::new(),
            upper: Vec::new(),
            whiskers: Vec::new(),
        }
    }
}

/// Build one draw slot per series, in legend order, or a single anonymous
/// slot when no series column is active.
fn series_slots(state: &AppState) -> Vec<SeriesDraw> {
    match (&state.color_map, state.series_names.is_empty()) {
        (Some(map), false) => state
            .series_names
            .iter()
            .map(|name| SeriesDraw::new(name.clone(), map.color_for(name)))
            .collect(),
        _ => {
            let name = state.value_column.clone().unwrap_or_default();
            vec![SeriesDraw::new(name, Color32::LIGHT_BLUE)]
        }
    }
}

// ---------------------------------------------------------------------------
// Category mode
// ---------------------------------------------------------------------------

fn category_chart(ui: &mut Ui, state: &AppState) {
    let style = &state.style;

    // Distinct x keys, ascending (summaries arrive sorted by key tuple).
    let mut categories: Vec<Value> = Vec::new();
    for s in &state.summaries {
        let key = s.key(0);
        if !categories.contains(&key) {
            categories.push(key);
        }
    }

    let series_idx = series_key_index(state);
    // When the series key doubles as the x key there is nothing to spread.
    let spread = matches!(series_idx, Some(i) if i > 0);
    let mut slots = series_slots(state);
    let slot_count = slots.len().max(1);

    for s in &state.summaries {
        let Some(pos) = categories.iter().position(|c| *c == s.key(0)) else {
            continue;
        };
        let j = match series_idx {
            Some(i) => {
                let name = s.key(i).to_string();
                match slots.iter().position(|slot| slot.name == name) {
                    Some(j) => j,
                    None => continue,
                }
            }
            None => 0,
        };
        let offset = if spread {
            ((j as f64 + 0.5) / slot_count as f64 - 0.5) * SLOT_SPREAD
        } else {
            0.0
        };
        let x = pos as f64 + offset;

        slots[j].means.push([x, s.mean]);
        if let (Some(lo), Some(hi)) = (s.ci_lower, s.ci_upper) {
            slots[j].whiskers.push([[x, lo], [x, hi]]);
            slots[j]
                .whiskers
                .push([[x - CAP_HALF_WIDTH, lo], [x + CAP_HALF_WIDTH, lo]]);
            slots[j]
                .whiskers
                .push([[x - CAP_HALF_WIDTH, hi], [x + CAP_HALF_WIDTH, hi]]);
        }
    }

    let n_categories = categories.len();
    let tick_labels: Vec<String> = categories
        .iter()
        .map(|c| style.wrap_label(&c.to_string()))
        .collect();

    let [grid_x, grid_y] = style.grid_visibility();
    let x_label = state
        .summary_group_columns
        .first()
        .cloned()
        .unwrap_or_default();
    let y_label = state.value_column.clone().unwrap_or_default();

    Plot::new("summary_categories")
        .legend(egui_plot::Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show_grid(Vec2b::new(grid_x, grid_y))
        .include_x(-0.5)
        .include_x(n_categories as f64 - 0.5)
        .x_grid_spacer(move |_input| {
            (0..n_categories)
                .map(|i| GridMark {
                    value: i as f64,
                    step_size: 1.0,
                })
                .collect()
        })
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 0.25 || idx < 0.0 {
                return String::new();
            }
            tick_labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            for slot in &slots {
                // Whiskers first so the mean dots land on top.
                for seg in &slot.whiskers {
                    let points: PlotPoints = seg.iter().copied().collect();
                    plot_ui.line(Line::new(points).color(slot.color).width(1.0));
                }
            }
            for slot in &slots {
                let points: PlotPoints = slot.means.iter().copied().collect();
                plot_ui.points(
                    Points::new(points)
                        .name(&slot.name)
                        .color(slot.color)
                        .shape(MarkerShape::Circle)
                        .radius(4.0),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Date mode
// ---------------------------------------------------------------------------

fn date_chart(ui: &mut Ui, state: &AppState) {
    let style = &state.style;

    let series_idx = series_key_index(state);
    let mut slots = series_slots(state);

    for s in &state.summaries {
        // Rows without a parseable date have nowhere to go on this axis.
        let Some(date) = s.key(0).as_date() else {
            continue;
        };
        let x = date_to_axis(date);
        let j = match series_idx {
            Some(i) => {
                let name = s.key(i).to_string();
                match slots.iter().position(|slot| slot.name == name) {
                    Some(j) => j,
                    None => continue,
                }
            }
            None => 0,
        };
        slots[j].means.push([x, s.mean]);
        if let (Some(lo), Some(hi)) = (s.ci_lower, s.ci_upper) {
            slots[j].lower.push([x, lo]);
            slots[j].upper.push([x, hi]);
        }
    }

    let [grid_x, grid_y] = style.grid_visibility();
    let x_label = state
        .summary_group_columns
        .first()
        .cloned()
        .unwrap_or_default();
    let y_label = state.value_column.clone().unwrap_or_default();

    let breaks = style.date_axis.breaks;
    let tick_format = style.date_axis.format.clone();

    Plot::new("summary_dates")
        .legend(egui_plot::Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show_grid(Vec2b::new(grid_x, grid_y))
        .x_grid_spacer(move |input| {
            let (min, max) = input.bounds;
            break_marks(min, max, &breaks)
                .into_iter()
                .map(|m| GridMark {
                    value: m.value,
                    step_size: m.step,
                })
                .collect()
        })
        .x_axis_formatter(move |mark, _range| format_tick(mark.value, &tick_format))
        .show(ui, |plot_ui| {
            for slot in &slots {
                let band = slot.color.gamma_multiply(0.45);
                for bound in [&slot.lower, &slot.upper] {
                    if bound.len() < 2 {
                        continue;
                    }
                    let points: PlotPoints = bound.iter().copied().collect();
                    plot_ui.line(
                        Line::new(points)
                            .color(band)
                            .width(1.0)
                            .style(LineStyle::Dashed { length: 6.0 }),
                    );
                }
            }
            for slot in &slots {
                let line: PlotPoints = slot.means.iter().copied().collect();
                plot_ui.line(
                    Line::new(line)
                        .name(&slot.name)
                        .color(slot.color)
                        .width(1.8),
                );
                let dots: PlotPoints = slot.means.iter().copied().collect();
                plot_ui.points(
                    Points::new(dots)
                        .name(&slot.name)
                        .color(slot.color)
                        .shape(MarkerShape::Circle)
                        .radius(2.5),
                );
            }
        });
}
