//! Date axis support.
//!
//! Plot coordinates are `f64`, so calendar dates ride the x axis as whole
//! days since the Unix epoch.  [`break_marks`] turns a visible range into
//! calendar-aligned tick positions (month starts, Mondays, ...) and
//! [`format_tick`] renders them with a strftime pattern.

use std::fmt::Write as _;

use chrono::{Datelike, Duration, NaiveDate};

/// Hard cap on generated ticks, for degenerate zoom ranges.
const MAX_MARKS: usize = 512;

const FALLBACK_FORMAT: &str = "%Y-%m-%d";

/// Days since 1970-01-01 as a plot coordinate.
pub fn date_to_axis(date: NaiveDate) -> f64 {
    date.signed_duration_since(NaiveDate::default()).num_days() as f64
}

/// Inverse of [`date_to_axis`]; `None` for values outside chrono's range.
pub fn axis_to_date(value: f64) -> Option<NaiveDate> {
    if !value.is_finite() {
        return None;
    }
    let days = value.round() as i64;
    Duration::try_days(days).and_then(|d| NaiveDate::default().checked_add_signed(d))
}

// ---------------------------------------------------------------------------
// Break generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Day,
    Week,
    Month,
    Year,
}

impl DateUnit {
    pub const ALL: [DateUnit; 4] = [
        DateUnit::Day,
        DateUnit::Week,
        DateUnit::Month,
        DateUnit::Year,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DateUnit::Day => "day",
            DateUnit::Week => "week",
            DateUnit::Month => "month",
            DateUnit::Year => "year",
        }
    }
}

/// Tick cadence, e.g. every 3 months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBreaks {
    pub every: u32,
    pub unit: DateUnit,
}

impl Default for DateBreaks {
    fn default() -> Self {
        Self {
            every: 1,
            unit: DateUnit::Month,
        }
    }
}

/// One tick position in plot coordinates, with the nominal spacing the
/// cadence implies (months and years use average lengths).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisMark {
    pub value: f64,
    pub step: f64,
}

/// Calendar-aligned ticks covering `[min, max]` in axis units.
///
/// Weeks start on Monday; months and years tick on their first day.  The
/// first mark is the first aligned date at or after `min`; an inverted or
/// empty range yields no marks.
pub fn break_marks(min: f64, max: f64, breaks: &DateBreaks) -> Vec<AxisMark> {
    let every = breaks.every.max(1);
    let (Some(start), Some(end)) = (axis_to_date(min), axis_to_date(max)) else {
        return Vec::new();
    };
    if start > end {
        return Vec::new();
    }

    let step = match breaks.unit {
        DateUnit::Day => every as f64,
        DateUnit::Week => 7.0 * every as f64,
        DateUnit::Month => 30.44 * every as f64,
        DateUnit::Year => 365.25 * every as f64,
    };

    let mut marks = Vec::new();
    let mut push = |date: NaiveDate| {
        let value = date_to_axis(date);
        if value >= min && value <= max && marks.len() < MAX_MARKS {
            marks.push(AxisMark { value, step });
        }
        value <= max && marks.len() < MAX_MARKS
    };

    match breaks.unit {
        DateUnit::Day => {
            let mut date = start;
            loop {
                if !push(date) {
                    break;
                }
                let Some(next) = date.checked_add_signed(Duration::days(every as i64)) else {
                    break;
                };
                date = next;
            }
        }
        DateUnit::Week => {
            // Advance to the next Monday at or after the range start.
            let offset = start.weekday().num_days_from_monday();
            let days_ahead = (7 - offset) % 7;
            let Some(mut date) = start.checked_add_signed(Duration::days(days_ahead as i64))
            else {
                return marks;
            };
            loop {
                if !push(date) {
                    break;
                }
                let Some(next) = date.checked_add_signed(Duration::days(7 * every as i64)) else {
                    break;
                };
                date = next;
            }
        }
        DateUnit::Month => {
            // First month start at or after the range start.
            let mut months = start.year() * 12 + start.month0() as i32;
            if start.day() > 1 {
                months += 1;
            }
            loop {
                let (year, month0) = (months.div_euclid(12), months.rem_euclid(12) as u32);
                let Some(date) = NaiveDate::from_ymd_opt(year, month0 + 1, 1) else {
                    break;
                };
                if !push(date) {
                    break;
                }
                months += every as i32;
            }
        }
        DateUnit::Year => {
            let mut year = start.year();
            if start.ordinal() > 1 {
                year += 1;
            }
            loop {
                let Some(date) = NaiveDate::from_ymd_opt(year, 1, 1) else {
                    break;
                };
                if !push(date) {
                    break;
                }
                year += every as i32;
            }
        }
    }

    marks
}

// ---------------------------------------------------------------------------
// Tick text
// ---------------------------------------------------------------------------

/// Render an axis position with a strftime pattern, e.g. `"%b %Y"` giving
/// `"Mar 2023"`.  An invalid pattern falls back to ISO `%Y-%m-%d`; a value
/// outside the date range renders empty.
pub fn format_tick(value: f64, fmt: &str) -> String {
    let Some(date) = axis_to_date(value) else {
        return String::new();
    };
    let mut out = String::new();
    if write!(out, "{}", date.format(fmt)).is_err() {
        out.clear();
        let _ = write!(out, "{}", date.format(FALLBACK_FORMAT));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_axis_roundtrip() {
        for date in [day(1970, 1, 1), day(1969, 12, 25), day(2023, 6, 15)] {
            assert_eq!(axis_to_date(date_to_axis(date)), Some(date));
        }
        assert_eq!(date_to_axis(day(1970, 1, 1)), 0.0);
        assert_eq!(date_to_axis(day(1970, 1, 2)), 1.0);
    }

    #[test]
    fn test_axis_to_date_rejects_nonsense() {
        assert_eq!(axis_to_date(f64::NAN), None);
        assert_eq!(axis_to_date(f64::INFINITY), None);
        assert_eq!(axis_to_date(1e18), None);
    }

    #[test]
    fn test_month_breaks_cross_year_boundary() {
        let breaks = DateBreaks {
            every: 1,
            unit: DateUnit::Month,
        };
        let min = date_to_axis(day(2022, 11, 15));
        let max = date_to_axis(day(2023, 2, 10));
        let marks = break_marks(min, max, &breaks);
        let dates: Vec<NaiveDate> = marks
            .iter()
            .map(|m| axis_to_date(m.value).unwrap())
            .collect();
        assert_eq!(
            dates,
            vec![day(2022, 12, 1), day(2023, 1, 1), day(2023, 2, 1)]
        );
    }

    #[test]
    fn test_quarterly_breaks() {
        let breaks = DateBreaks {
            every: 3,
            unit: DateUnit::Month,
        };
        let min = date_to_axis(day(2023, 1, 1));
        let max = date_to_axis(day(2023, 12, 31));
        let marks = break_marks(min, max, &breaks);
        let dates: Vec<NaiveDate> = marks
            .iter()
            .map(|m| axis_to_date(m.value).unwrap())
            .collect();
        assert_eq!(
            dates,
            vec![day(2023, 1, 1), day(2023, 4, 1), day(2023, 7, 1), day(2023, 10, 1)]
        );
    }

    #[test]
    fn test_week_breaks_land_on_mondays() {
        let breaks = DateBreaks {
            every: 1,
            unit: DateUnit::Week,
        };
        // 2023-03-01 is a Wednesday; the next Monday is 2023-03-06.
        let min = date_to_axis(day(2023, 3, 1));
        let max = date_to_axis(day(2023, 3, 21));
        let marks = break_marks(min, max, &breaks);
        let dates: Vec<NaiveDate> = marks
            .iter()
            .map(|m| axis_to_date(m.value).unwrap())
            .collect();
        assert_eq!(dates, vec![day(2023, 3, 6), day(2023, 3, 13), day(2023, 3, 20)]);
        assert!(marks.iter().all(|m| m.step == 7.0));
    }

    #[test]
    fn test_year_breaks() {
        let breaks = DateBreaks {
            every: 1,
            unit: DateUnit::Year,
        };
        let min = date_to_axis(day(2021, 6, 1));
        let max = date_to_axis(day(2023, 6, 1));
        let marks = break_marks(min, max, &breaks);
        let dates: Vec<NaiveDate> = marks
            .iter()
            .map(|m| axis_to_date(m.value).unwrap())
            .collect();
        assert_eq!(dates, vec![day(2022, 1, 1), day(2023, 1, 1)]);
    }

    #[test]
    fn test_day_breaks_start_at_range_start() {
        let breaks = DateBreaks {
            every: 2,
            unit: DateUnit::Day,
        };
        let min = date_to_axis(day(2023, 5, 10));
        let max = date_to_axis(day(2023, 5, 15));
        let marks = break_marks(min, max, &breaks);
        let dates: Vec<NaiveDate> = marks
            .iter()
            .map(|m| axis_to_date(m.value).unwrap())
            .collect();
        assert_eq!(dates, vec![day(2023, 5, 10), day(2023, 5, 12), day(2023, 5, 14)]);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let breaks = DateBreaks::default();
        let min = date_to_axis(day(2023, 6, 1));
        let max = date_to_axis(day(2023, 1, 1));
        assert!(break_marks(min, max, &breaks).is_empty());
    }

    #[test]
    fn test_every_zero_treated_as_one() {
        let breaks = DateBreaks {
            every: 0,
            unit: DateUnit::Day,
        };
        let min = date_to_axis(day(2023, 5, 10));
        let max = date_to_axis(day(2023, 5, 12));
        assert_eq!(break_marks(min, max, &breaks).len(), 3);
    }

    #[test]
    fn test_format_tick() {
        let x = date_to_axis(day(2023, 3, 6));
        assert_eq!(format_tick(x, "%b %Y"), "Mar 2023");
        assert_eq!(format_tick(x, "%Y-%m-%d"), "2023-03-06");
    }

    #[test]
    fn test_format_tick_bad_pattern_falls_back() {
        let x = date_to_axis(day(2023, 3, 6));
        assert_eq!(format_tick(x, "%Q"), "2023-03-06");
    }

    #[test]
    fn test_format_tick_out_of_range() {
        assert_eq!(format_tick(f64::NAN, "%Y"), "");
    }
}
