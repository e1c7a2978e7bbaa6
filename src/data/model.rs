use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Value – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common dataframe dtypes.
/// Used as a `BTreeMap` / `BTreeSet` key downstream, so `Value` must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so floats can live in ordered collections --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Int(_) => 2,
                Float(_) => 3,
                Date(_) => 4,
                Str(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Str(a), Str(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Str(s) => s.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            // NaiveDate displays as ISO-8601 (YYYY-MM-DD)
            Value::Date(d) => write!(f, "{d}"),
            Value::Null => write!(f, "NA"),
        }
    }
}

impl Value {
    /// Try to interpret the cell as an `f64` for aggregation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to interpret the cell as a calendar date for the time axis.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

/// A single observation (one row): column name → cell value.
/// Columns absent from a record are treated as `Null` by consumers.
pub type Record = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed column indices.
#[derive(Debug, Clone)]
pub struct Table {
    /// All records (rows).
    pub records: Vec<Record>,
    /// Ordered list of column names seen anywhere in the data.
    pub column_names: Vec<String>,
    /// For each column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<Value>>,
}

impl Table {
    /// Build column indices from the loaded records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut column_names_set: BTreeSet<String> = BTreeSet::new();
        let mut unique_values: BTreeMap<String, BTreeSet<Value>> = BTreeMap::new();

        for rec in &records {
            for (col, val) in rec {
                column_names_set.insert(col.clone());
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        let column_names: Vec<String> = column_names_set.into_iter().collect();
        Table {
            records,
            column_names,
            unique_values,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Columns containing at least one numeric cell (candidates for the
    /// value column of a summary).
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns_where(|v| v.as_f64().is_some())
    }

    /// Columns containing at least one date cell (candidates for the time axis).
    pub fn date_columns(&self) -> Vec<String> {
        self.columns_where(|v| v.as_date().is_some())
    }

    /// Columns usable as grouping keys: everything that is not a date column.
    pub fn grouping_columns(&self) -> Vec<String> {
        let dates: BTreeSet<String> = self.date_columns().into_iter().collect();
        self.column_names
            .iter()
            .filter(|c| !dates.contains(*c))
            .cloned()
            .collect()
    }

    fn columns_where(&self, pred: impl Fn(&Value) -> bool) -> Vec<String> {
        self.column_names
            .iter()
            .filter(|col| {
                self.unique_values
                    .get(*col)
                    .is_some_and(|vals| vals.iter().any(&pred))
            })
            .cloned()
            .collect()
    }
}
