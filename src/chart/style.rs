//! Declarative chart appearance.
//!
//! [`ChartStyle`] collects everything the view layer needs to render the
//! summary chart: legend ordering, label wrapping, grid visibility and the
//! date axis cadence.  It holds no egui state and owns no plot items; the
//! panels mutate it and the plot reads it.

use super::dates::DateBreaks;
use super::labels::wrap_text;

/// How series are ordered in the legend (and in colour assignment).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LegendOrder {
    /// Ascending by series name.
    #[default]
    Alphabetical,
    /// First appearance in the visible rows.
    DataOrder,
    /// A user-supplied order; series it does not mention keep their
    /// data order and follow the listed ones.
    Explicit(Vec<String>),
}

impl LegendOrder {
    pub fn label(&self) -> &'static str {
        match self {
            LegendOrder::Alphabetical => "Alphabetical",
            LegendOrder::DataOrder => "Data order",
            LegendOrder::Explicit(_) => "Custom",
        }
    }
}

/// Tick cadence and strftime pattern for a date-valued x axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateAxis {
    pub breaks: DateBreaks,
    pub format: String,
}

impl Default for DateAxis {
    fn default() -> Self {
        Self {
            breaks: DateBreaks::default(),
            format: "%b %Y".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub legend: LegendOrder,
    pub reverse_legend: bool,
    /// Wrap category tick labels at this many characters; `None` leaves
    /// them on one line.
    pub wrap_width: Option<usize>,
    pub show_x_grid: bool,
    pub show_y_grid: bool,
    pub date_axis: DateAxis,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            legend: LegendOrder::default(),
            reverse_legend: false,
            wrap_width: None,
            show_x_grid: true,
            show_y_grid: true,
            date_axis: DateAxis::default(),
        }
    }
}

impl ChartStyle {
    /// Arrange the series names the legend should show, given the order
    /// they were encountered in the data.
    pub fn ordered_series(&self, encountered: &[String]) -> Vec<String> {
        let mut out: Vec<String> = match &self.legend {
            LegendOrder::Alphabetical => {
                let mut sorted = encountered.to_vec();
                sorted.sort();
                sorted
            }
            LegendOrder::DataOrder => encountered.to_vec(),
            LegendOrder::Explicit(wanted) => {
                let mut out: Vec<String> = wanted
                    .iter()
                    .filter(|name| encountered.contains(name))
                    .cloned()
                    .collect();
                for name in encountered {
                    if !out.contains(name) {
                        out.push(name.clone());
                    }
                }
                out
            }
        };
        if self.reverse_legend {
            out.reverse();
        }
        out
    }

    /// Apply the configured wrap width to a tick label.
    pub fn wrap_label(&self, text: &str) -> String {
        match self.wrap_width {
            Some(width) => wrap_text(text, width),
            None => text.to_owned(),
        }
    }

    /// `[x, y]` gridline visibility, in the shape the plot wants.
    pub fn grid_visibility(&self) -> [bool; 2] {
        [self.show_x_grid, self.show_y_grid]
    }
}
