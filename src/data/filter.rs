use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::model::{Record, Table, Value};

// ---------------------------------------------------------------------------
// Filter predicate: which unique values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of selected values.
/// If a column is absent, it means "no filter" (show all).
pub type FilterState = BTreeMap<String, BTreeSet<Value>>;

/// Initialise a [`FilterState`] with all values selected (i.e., show everything).
pub fn init_filter_state(table: &Table) -> FilterState {
    table
        .unique_values
        .iter()
        .map(|(col, vals)| (col.clone(), vals.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Date-range restriction
// ---------------------------------------------------------------------------

/// Inclusive date window applied on one date column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSpan {
    pub column: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateSpan {
    /// Whether a record falls inside the window.  Records without a parseable
    /// date in the column are excluded.
    fn contains(&self, rec: &Record) -> bool {
        match rec.get(&self.column).and_then(Value::as_date) {
            Some(d) => d >= self.from && d <= self.to,
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Row selection
// ---------------------------------------------------------------------------

/// Return indices of records that pass all active filters.
///
/// A record passes a column filter when:
/// * The column is not present in `filters` → passes (no constraint)
/// * The filter set for that column is empty → nothing selected → fails
/// * All unique values are selected → passes (no effective filter)
/// * The record's value for that column is in the selected set → passes
/// * The record lacks the column → passes only when `Null` is selected
pub fn filtered_indices(
    table: &Table,
    filters: &FilterState,
    date_span: Option<&DateSpan>,
) -> Vec<usize> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| record_passes(table, rec, filters))
        .filter(|(_, rec)| date_span.map_or(true, |span| span.contains(rec)))
        .map(|(i, _)| i)
        .collect()
}

fn record_passes(table: &Table, rec: &Record, filters: &FilterState) -> bool {
    for (col, selected) in filters {
        if selected.is_empty() {
            // Nothing selected for this column → hide everything
            return false;
        }
        // Check all unique values are selected → no effective filter
        if let Some(all_vals) = table.unique_values.get(col) {
            if selected.len() == all_vals.len() {
                continue;
            }
        }
        match rec.get(col) {
            Some(val) => {
                if !selected.contains(val) {
                    return false;
                }
            }
            None => {
                // record doesn't have this column → include only if Null is selected
                if !selected.contains(&Value::Null) {
                    return false;
                }
            }
        }
    }
    true
}
