use std::collections::BTreeMap;

use thiserror::Error;

use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures produced while building a grouped summary.
#[derive(Error, Debug, PartialEq)]
pub enum SummaryError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("confidence level {0} must lie strictly between 0 and 1")]
    InvalidLevel(f64),

    #[error("no numeric observations in column '{0}'")]
    NoObservations(String),
}

// ---------------------------------------------------------------------------
// Request and result types
// ---------------------------------------------------------------------------

/// What to aggregate: one numeric column partitioned by key columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySpec {
    /// Column holding the numeric observations.
    pub value_column: String,
    /// Key columns, in partition order (e.g. `[station]` or `[date, method]`).
    pub group_columns: Vec<String>,
    /// Confidence level for the interval, e.g. 0.95.
    pub level: f64,
    /// Groups with fewer numeric observations than this are dropped.
    pub min_obs: usize,
}

/// Derived statistics for one partition.
///
/// `sd`, `se` and the interval bounds are `None` for singleton groups
/// (sample standard deviation needs at least two observations); they are
/// missing, never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    /// Key values, aligned with `SummarySpec::group_columns`.
    pub keys: Vec<Value>,
    pub n: usize,
    pub mean: f64,
    pub sd: Option<f64>,
    pub se: Option<f64>,
    pub ci_lower: Option<f64>,
    pub ci_upper: Option<f64>,
}

impl GroupSummary {
    /// Key value at the given position (Null when out of range).
    pub fn key(&self, idx: usize) -> Value {
        self.keys.get(idx).cloned().unwrap_or(Value::Null)
    }

    /// Human-readable key, e.g. `"Cedar Creek / Colorimetric"`.
    pub fn key_label(&self) -> String {
        self.keys
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

// ---------------------------------------------------------------------------
// Grouped aggregation
// ---------------------------------------------------------------------------

/// Partition the selected rows by the key columns and summarise the value
/// column per partition: n, mean, sample sd, standard error and the
/// normal-approximation confidence interval at `spec.level`.
///
/// Cells that are missing or non-numeric (including non-finite floats) are
/// ignored; a key cell that is missing becomes a `Null` key, and the group
/// is kept (dataframe `group_by` semantics).  Output order is deterministic:
/// ascending by key tuple.
pub fn summarize(
    table: &Table,
    indices: &[usize],
    spec: &SummarySpec,
) -> Result<Vec<GroupSummary>, SummaryError> {
    if !(spec.level > 0.0 && spec.level < 1.0) {
        return Err(SummaryError::InvalidLevel(spec.level));
    }
    for col in std::iter::once(&spec.value_column).chain(spec.group_columns.iter()) {
        if !table.column_names.contains(col) {
            return Err(SummaryError::UnknownColumn(col.clone()));
        }
    }

    // BTreeMap keys give the ascending output order.
    let mut groups: BTreeMap<Vec<Value>, Vec<f64>> = BTreeMap::new();
    for &idx in indices {
        let Some(rec) = table.records.get(idx) else {
            continue;
        };
        let keys: Vec<Value> = spec
            .group_columns
            .iter()
            .map(|col| rec.get(col).cloned().unwrap_or(Value::Null))
            .collect();
        let observations = groups.entry(keys).or_default();
        if let Some(x) = rec.get(&spec.value_column).and_then(Value::as_f64) {
            if x.is_finite() {
                observations.push(x);
            }
        }
    }

    let z = z_score(spec.level);
    let mut out = Vec::new();
    for (keys, observations) in groups {
        let n = observations.len();
        if n == 0 || n < spec.min_obs {
            continue;
        }
        let mean = observations.iter().sum::<f64>() / n as f64;
        let sd = sample_sd(&observations, mean);
        let se = sd.map(|s| s / (n as f64).sqrt());
        let half_width = se.map(|s| z * s);
        out.push(GroupSummary {
            keys,
            n,
            mean,
            sd,
            se,
            ci_lower: half_width.map(|h| mean - h),
            ci_upper: half_width.map(|h| mean + h),
        });
    }

    if out.is_empty() {
        return Err(SummaryError::NoObservations(spec.value_column.clone()));
    }
    Ok(out)
}

/// Sample standard deviation (n - 1 denominator); undefined below two points.
fn sample_sd(xs: &[f64], mean: f64) -> Option<f64> {
    let n = xs.len();
    if n < 2 {
        return None;
    }
    let ss: f64 = xs.iter().map(|x| (x - mean) * (x - mean)).sum();
    Some((ss / (n as f64 - 1.0)).sqrt())
}

// ---------------------------------------------------------------------------
// Normal quantiles
// ---------------------------------------------------------------------------

/// Critical value for a two-sided interval: `z = Phi^-1((1 + level) / 2)`.
///
/// The common levels use their textbook constants; everything else goes
/// through Acklam's rational approximation of the inverse normal CDF.
pub fn z_score(level: f64) -> f64 {
    if (level - 0.99).abs() < 1e-6 {
        2.576
    } else if (level - 0.95).abs() < 1e-6 {
        1.960
    } else if (level - 0.90).abs() < 1e-6 {
        1.645
    } else {
        acklam_inverse_cdf((1.0 + level) / 2.0)
    }
}

/// Rational approximation of the inverse standard normal CDF.
fn acklam_inverse_cdf(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }

    // Coefficients for central region
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239e0,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];

    // Coefficients for tail regions
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838e0,
        -2.549_732_539_343_734e0,
        4.374_664_141_464_968e0,
        2.938_163_982_698_783e0,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996e0,
        3.754_408_661_907_416e0,
    ];

    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 0.97575;

    if p < P_LOW {
        // Lower tail
        let q = (-2.0 * p.ln()).sqrt();
        let num = ((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5];
        let den = (((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0;
        num / den
    } else if p > P_HIGH {
        // Upper tail
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        let num = ((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5];
        let den = (((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0;
        -(num / den)
    } else {
        // Central region
        let q = p - 0.5;
        let r = q * q;
        let num = (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q;
        let den = ((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0;
        num / den
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::Record;

    fn field_table() -> Table {
        // station A: 1, 2, 3   station B: 10, 20   station C: 5
        let rows = [
            ("A", Some(1.0)),
            ("A", Some(2.0)),
            ("A", Some(3.0)),
            ("B", Some(10.0)),
            ("B", Some(20.0)),
            ("C", Some(5.0)),
            ("C", None),
        ];
        let records = rows
            .iter()
            .map(|(station, conc)| {
                let mut rec = Record::new();
                rec.insert("station".into(), Value::Str(station.to_string()));
                rec.insert(
                    "conc".into(),
                    conc.map(Value::Float).unwrap_or(Value::Null),
                );
                rec
            })
            .collect();
        Table::from_records(records)
    }

    fn spec(min_obs: usize) -> SummarySpec {
        SummarySpec {
            value_column: "conc".into(),
            group_columns: vec!["station".into()],
            level: 0.95,
            min_obs,
        }
    }

    fn all_indices(table: &Table) -> Vec<usize> {
        (0..table.len()).collect()
    }

    // ====================
    // Aggregation tests
    // ====================

    #[test]
    fn test_grouped_mean_sd_se() {
        let table = field_table();
        let out = summarize(&table, &all_indices(&table), &spec(1)).unwrap();

        assert_eq!(out.len(), 3);
        let a = &out[0];
        assert_eq!(a.keys, vec![Value::Str("A".into())]);
        assert_eq!(a.n, 3);
        assert_relative_eq!(a.mean, 2.0);
        assert_relative_eq!(a.sd.unwrap(), 1.0);
        assert_relative_eq!(a.se.unwrap(), 1.0 / 3.0f64.sqrt(), epsilon = 1e-12);

        let b = &out[1];
        assert_eq!(b.n, 2);
        assert_relative_eq!(b.mean, 15.0);
        assert_relative_eq!(b.sd.unwrap(), 50.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_confidence_interval_width() {
        let table = field_table();
        let out = summarize(&table, &all_indices(&table), &spec(1)).unwrap();

        let a = &out[0];
        let half = 1.960 * a.se.unwrap();
        assert_relative_eq!(a.ci_lower.unwrap(), a.mean - half, epsilon = 1e-12);
        assert_relative_eq!(a.ci_upper.unwrap(), a.mean + half, epsilon = 1e-12);
    }

    #[test]
    fn test_singleton_group_has_no_spread() {
        let table = field_table();
        let out = summarize(&table, &all_indices(&table), &spec(1)).unwrap();

        let c = &out[2];
        assert_eq!(c.n, 1); // the Null observation is ignored
        assert_relative_eq!(c.mean, 5.0);
        assert_eq!(c.sd, None);
        assert_eq!(c.se, None);
        assert_eq!(c.ci_lower, None);
    }

    #[test]
    fn test_min_obs_drops_small_groups() {
        let table = field_table();
        let out = summarize(&table, &all_indices(&table), &spec(3)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].keys, vec![Value::Str("A".into())]);
    }

    #[test]
    fn test_indices_restrict_input() {
        let table = field_table();
        // Only station B's rows.
        let out = summarize(&table, &[3, 4], &spec(1)).unwrap();
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].mean, 15.0);
    }

    #[test]
    fn test_missing_key_becomes_null_group() {
        let mut records = Vec::new();
        let mut rec = Record::new();
        rec.insert("conc".into(), Value::Float(7.0));
        records.push(rec); // no "station" cell at all
        let mut rec = Record::new();
        rec.insert("station".into(), Value::Str("A".into()));
        rec.insert("conc".into(), Value::Float(1.0));
        records.push(rec);
        let table = Table::from_records(records);

        let out = summarize(&table, &[0, 1], &spec(1)).unwrap();
        assert_eq!(out.len(), 2);
        // Null sorts before strings.
        assert_eq!(out[0].keys, vec![Value::Null]);
        assert_relative_eq!(out[0].mean, 7.0);
    }

    #[test]
    fn test_two_key_columns_and_label() {
        let d = NaiveDate::from_ymd_opt(2023, 3, 6).unwrap();
        let mut records = Vec::new();
        for method in ["ic", "color"] {
            let mut rec = Record::new();
            rec.insert("date".into(), Value::Date(d));
            rec.insert("method".into(), Value::Str(method.into()));
            rec.insert("conc".into(), Value::Float(1.0));
            records.push(rec);
        }
        let table = Table::from_records(records);

        let spec = SummarySpec {
            value_column: "conc".into(),
            group_columns: vec!["date".into(), "method".into()],
            level: 0.95,
            min_obs: 1,
        };
        let out = summarize(&table, &[0, 1], &spec).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key_label(), "2023-03-06 / color");
    }

    // ====================
    // Error tests
    // ====================

    #[test]
    fn test_invalid_level_rejected() {
        let table = field_table();
        let mut bad = spec(1);
        bad.level = 1.0;
        assert_eq!(
            summarize(&table, &all_indices(&table), &bad),
            Err(SummaryError::InvalidLevel(1.0))
        );
    }

    #[test]
    fn test_unknown_column_rejected() {
        let table = field_table();
        let mut bad = spec(1);
        bad.value_column = "nope".into();
        assert_eq!(
            summarize(&table, &all_indices(&table), &bad),
            Err(SummaryError::UnknownColumn("nope".into()))
        );
    }

    #[test]
    fn test_no_observations() {
        let table = field_table();
        assert_eq!(
            summarize(&table, &[], &spec(1)),
            Err(SummaryError::NoObservations("conc".into()))
        );
    }

    // ====================
    // Quantile tests
    // ====================

    #[test]
    fn test_z_score_fast_paths() {
        assert_relative_eq!(z_score(0.90), 1.645);
        assert_relative_eq!(z_score(0.95), 1.960);
        assert_relative_eq!(z_score(0.99), 2.576);
    }

    #[test]
    fn test_z_score_acklam_against_tables() {
        // Reference values from standard normal tables.
        assert_relative_eq!(z_score(0.80), 1.281_551_6, epsilon = 1e-4);
        assert_relative_eq!(z_score(0.50), 0.674_489_8, epsilon = 1e-4);
        assert_relative_eq!(z_score(0.998), 3.090_232_3, epsilon = 1e-4);
    }

    #[test]
    fn test_z_score_monotone_in_level() {
        let mut prev = 0.0;
        for level in [0.5, 0.8, 0.9, 0.95, 0.99, 0.999] {
            let z = z_score(level);
            assert!(z > prev, "z({level}) = {z} not increasing");
            prev = z;
        }
    }
}
