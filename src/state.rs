//! Application state and the actions the panels trigger on it.
//!
//! The widgets mutate fields directly where a change is purely visual and
//! go through the methods here when derived data (visible rows, summaries,
//! colours) must be rebuilt.

use std::path::Path;

use chrono::NaiveDate;

use crate::archive::client::ArchiveClient;
use crate::archive::config::{ArchiveConfig, SERVER_ENV, TOKEN_ENV};
use crate::chart::style::{ChartStyle, LegendOrder};
use crate::color::ColorMap;
use crate::data::filter::{self, DateSpan, FilterState};
use crate::data::loader;
use crate::data::model::{Table, Value};
use crate::data::summary::{summarize, GroupSummary, SummarySpec};

pub struct AppState {
    pub table: Option<Table>,
    /// File name the table came from, for the window chrome.
    pub source_name: Option<String>,

    pub filters: FilterState,
    pub visible_indices: Vec<usize>,

    pub value_column: Option<String>,
    pub group_column: Option<String>,
    pub series_column: Option<String>,
    /// When set, the x axis switches from categories to time.
    pub date_column: Option<String>,

    pub confidence_level: f64,
    pub min_obs: usize,

    pub date_span_enabled: bool,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,

    pub style: ChartStyle,
    /// Raw comma-separated text behind [`LegendOrder::Explicit`].
    pub legend_order_text: String,

    pub summaries: Vec<GroupSummary>,
    /// Key columns the current summaries were grouped by, in key order.
    pub summary_group_columns: Vec<String>,
    /// Series names in legend order, matching `color_map`.
    pub series_names: Vec<String>,
    pub color_map: Option<ColorMap>,

    pub archive_server: String,
    pub archive_doi: String,
    pub archive_file: String,
    pub show_archive_window: bool,

    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            table: None,
            source_name: None,
            filters: FilterState::new(),
            visible_indices: Vec::new(),
            value_column: None,
            group_column: None,
            series_column: None,
            date_column: None,
            confidence_level: 0.95,
            min_obs: 1,
            date_span_enabled: false,
            date_from: NaiveDate::default(),
            date_to: NaiveDate::default(),
            style: ChartStyle::default(),
            legend_order_text: String::new(),
            summaries: Vec::new(),
            summary_group_columns: Vec::new(),
            series_names: Vec::new(),
            color_map: None,
            archive_server: std::env::var(SERVER_ENV).unwrap_or_default(),
            archive_doi: String::new(),
            archive_file: String::new(),
            show_archive_window: false,
            status_message: None,
        }
    }
}

impl AppState {
    // -----------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------

    pub fn open_file(&mut self, path: &Path) {
        log::info!("loading {}", path.display());
        match loader::load_file(path) {
            Ok(table) => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                self.install_table(table, name);
            }
            Err(err) => self.report_error(format!("could not load {}: {err:#}", path.display())),
        }
    }

    /// Fetch the named file from the archive form fields.  The API token,
    /// if any, always comes from the environment rather than the UI.
    pub fn fetch_archive(&mut self) {
        let server = self.archive_server.trim().to_owned();
        let doi = self.archive_doi.trim().to_owned();
        let label = self.archive_file.trim().to_owned();
        if server.is_empty() || doi.is_empty() || label.is_empty() {
            self.report_error("server, dataset DOI and file name are all required".to_owned());
            return;
        }

        let config = ArchiveConfig::new(&server, std::env::var(TOKEN_ENV).ok());
        let outcome = ArchiveClient::new(config)
            .and_then(|client| client.fetch_table_by_name(&label, &doi));
        match outcome {
            Ok(table) => {
                log::info!("fetched '{label}': {} rows", table.len());
                self.show_archive_window = false;
                self.install_table(table, Some(label));
            }
            Err(err) => self.report_error(err.to_string()),
        }
    }

    /// Swap in a new table and re-derive everything: filters, default
    /// column choices, the date picker span and the summaries.
    pub fn install_table(&mut self, table: Table, source_name: Option<String>) {
        self.filters = filter::init_filter_state(&table);

        let numeric = table.numeric_columns();
        let dates = table.date_columns();
        self.value_column = numeric.first().cloned();
        self.group_column = table
            .column_names
            .iter()
            .find(|c| !numeric.contains(*c) && !dates.contains(*c))
            .cloned();
        self.series_column = None;
        self.date_column = None;

        self.date_span_enabled = false;
        if let Some(col) = dates.first() {
            if let Some((lo, hi)) = date_extent(&table, col) {
                self.date_from = lo;
                self.date_to = hi;
            }
        }

        self.source_name = source_name;
        self.status_message = None;
        self.table = Some(table);
        self.refilter();
    }

    // -----------------------------------------------------------------
    // Derived data
    // -----------------------------------------------------------------

    /// Recompute the visible row set from the filters and the date span,
    /// then the summaries from that.
    pub fn refilter(&mut self) {
        let span = self.active_date_span();
        self.visible_indices = match &self.table {
            Some(table) => filter::filtered_indices(table, &self.filters, span.as_ref()),
            None => Vec::new(),
        };
        self.resummarize();
    }

    /// Rebuild the grouped summaries and the series colour assignment.
    pub fn resummarize(&mut self) {
        self.summaries.clear();
        self.summary_group_columns.clear();
        self.series_names.clear();
        self.color_map = None;

        let Some(table) = self.table.as_ref() else {
            return;
        };
        let Some(value_column) = self.value_column.clone() else {
            return;
        };

        // A date column takes over the x axis; otherwise categories.
        let mut group_columns: Vec<String> = Vec::new();
        if let Some(col) = &self.date_column {
            group_columns.push(col.clone());
        } else if let Some(col) = &self.group_column {
            group_columns.push(col.clone());
        }
        if let Some(col) = &self.series_column {
            if !group_columns.contains(col) {
                group_columns.push(col.clone());
            }
        }

        let spec = SummarySpec {
            value_column,
            group_columns: group_columns.clone(),
            level: self.confidence_level,
            min_obs: self.min_obs,
        };
        let outcome = summarize(table, &self.visible_indices, &spec);

        let mut encountered: Vec<String> = Vec::new();
        if let Some(col) = &self.series_column {
            for &idx in &self.visible_indices {
                let Some(value) = table.records.get(idx).and_then(|rec| rec.get(col)) else {
                    continue;
                };
                let name = value.to_string();
                if !encountered.contains(&name) {
                    encountered.push(name);
                }
            }
        }

        match outcome {
            Ok(groups) => {
                self.summaries = groups;
                self.summary_group_columns = group_columns;
                self.status_message = None;
            }
            Err(err) => {
                self.report_error(err.to_string());
                return;
            }
        }

        if let Some(col) = self.series_column.clone() {
            let ordered = self.style.ordered_series(&encountered);
            self.color_map = Some(ColorMap::new(&col, &ordered));
            self.series_names = ordered;
        }
    }

    pub fn date_mode(&self) -> bool {
        self.date_column.is_some()
    }

    fn active_date_span(&self) -> Option<DateSpan> {
        if !self.date_span_enabled {
            return None;
        }
        let column = self.date_column.clone()?;
        Some(DateSpan {
            column,
            from: self.date_from,
            to: self.date_to,
        })
    }

    // -----------------------------------------------------------------
    // Filter actions
    // -----------------------------------------------------------------

    pub fn toggle_filter_value(&mut self, column: &str, value: &Value) {
        if let Some(selected) = self.filters.get_mut(column) {
            if !selected.remove(value) {
                selected.insert(value.clone());
            }
            self.refilter();
        }
    }

    pub fn select_all(&mut self, column: &str) {
        let Some(table) = &self.table else {
            return;
        };
        let Some(uniques) = table.unique_values.get(column) else {
            return;
        };
        let uniques = uniques.clone();
        if let Some(selected) = self.filters.get_mut(column) {
            *selected = uniques;
        }
        self.refilter();
    }

    pub fn select_none(&mut self, column: &str) {
        if let Some(selected) = self.filters.get_mut(column) {
            selected.clear();
        }
        self.refilter();
    }

    // -----------------------------------------------------------------
    // Legend text
    // -----------------------------------------------------------------

    /// Parse the comma-separated legend text into an explicit order.
    pub fn apply_legend_text(&mut self) {
        let wanted: Vec<String> = self
            .legend_order_text
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
        self.style.legend = LegendOrder::Explicit(wanted);
        self.resummarize();
    }

    fn report_error(&mut self, message: String) {
        log::error!("{message}");
        self.status_message = Some(message);
    }
}

/// Smallest and largest parseable date in a column.
fn date_extent(table: &Table, column: &str) -> Option<(NaiveDate, NaiveDate)> {
    let mut extent: Option<(NaiveDate, NaiveDate)> = None;
    for rec in &table.records {
        if let Some(d) = rec.get(column).and_then(Value::as_date) {
            extent = Some(match extent {
                Some((lo, hi)) => (lo.min(d), hi.max(d)),
                None => (d, d),
            });
        }
    }
    extent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Record;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_table() -> Table {
        let rows = [
            ("Cedar Creek", "IC", 1, 4.0),
            ("Cedar Creek", "IC", 8, 6.0),
            ("Cedar Creek", "Probe", 1, 5.0),
            ("Mill Race", "IC", 8, 2.0),
            ("Mill Race", "Probe", 8, 3.0),
        ];
        let records = rows
            .iter()
            .map(|(station, method, dom, conc)| {
                let mut rec = Record::new();
                rec.insert("station".into(), Value::Str(station.to_string()));
                rec.insert("method".into(), Value::Str(method.to_string()));
                rec.insert("sampled".into(), Value::Date(day(2023, 3, *dom)));
                rec.insert("conc".into(), Value::Float(*conc));
                rec
            })
            .collect();
        Table::from_records(records)
    }

    fn loaded_state() -> AppState {
        let mut state = AppState::default();
        state.install_table(sample_table(), Some("sample".into()));
        state
    }

    #[test]
    fn test_install_picks_sensible_defaults() {
        let state = loaded_state();
        assert_eq!(state.value_column.as_deref(), Some("conc"));
        assert_eq!(state.group_column.as_deref(), Some("method"));
        assert_eq!(state.date_column, None);
        assert_eq!(state.date_from, day(2023, 3, 1));
        assert_eq!(state.date_to, day(2023, 3, 8));
        assert_eq!(state.visible_indices.len(), 5);
    }

    #[test]
    fn test_summaries_follow_group_column() {
        let mut state = loaded_state();
        state.group_column = Some("station".into());
        state.resummarize();
        assert_eq!(state.summaries.len(), 2);
        assert_eq!(state.summaries[0].key_label(), "Cedar Creek");
        assert_eq!(state.summaries[0].n, 3);
    }

    #[test]
    fn test_filter_toggle_hides_rows() {
        let mut state = loaded_state();
        state.group_column = Some("station".into());
        state.toggle_filter_value("method", &Value::Str("Probe".into()));
        assert_eq!(state.visible_indices.len(), 3);
        state.resummarize();
        assert_eq!(state.summaries[0].n, 2);

        state.select_all("method");
        assert_eq!(state.visible_indices.len(), 5);
        state.select_none("method");
        assert!(state.visible_indices.is_empty());
    }

    #[test]
    fn test_date_mode_groups_by_date() {
        let mut state = loaded_state();
        state.date_column = Some("sampled".into());
        state.series_column = Some("method".into());
        state.resummarize();
        // Two dates x up to two methods, minus absent combinations.
        assert_eq!(state.summaries.len(), 4);
        assert!(state.date_mode());
        assert_eq!(
            state.summary_group_columns,
            vec!["sampled".to_string(), "method".to_string()]
        );
        assert_eq!(state.series_names, vec!["IC".to_string(), "Probe".to_string()]);
        assert!(state.color_map.is_some());
    }

    #[test]
    fn test_date_span_restricts_rows() {
        let mut state = loaded_state();
        state.date_column = Some("sampled".into());
        state.date_span_enabled = true;
        state.date_from = day(2023, 3, 1);
        state.date_to = day(2023, 3, 1);
        state.refilter();
        assert_eq!(state.visible_indices, vec![0, 2]);
    }

    #[test]
    fn test_explicit_legend_order_drives_colors() {
        let mut state = loaded_state();
        state.series_column = Some("method".into());
        state.legend_order_text = "Probe, IC".into();
        state.apply_legend_text();
        assert_eq!(
            state.series_names,
            vec!["Probe".to_string(), "IC".to_string()]
        );
        let map = state.color_map.as_ref().unwrap();
        let entries: Vec<&str> = map.legend_entries().map(|(name, _)| name).collect();
        assert_eq!(entries, vec!["Probe", "IC"]);
    }

    #[test]
    fn test_summary_error_surfaces_in_status() {
        let mut state = loaded_state();
        state.confidence_level = 1.5;
        state.resummarize();
        assert!(state.summaries.is_empty());
        assert!(state
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("confidence level")));
    }
}
