//! Series colours.
//!
//! One colour per legend entry, assigned in legend order so the first
//! listed series always gets the first hue.  The mapping is keyed by the
//! series name, which keeps colours stable while filters hide and reveal
//! rows.

use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

const SATURATION: f32 = 0.65;
const LIGHTNESS: f32 = 0.45;

/// Evenly hue-spaced colours for `n` series.
pub fn series_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, SATURATION, LIGHTNESS);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Colour assignment for the current series column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    /// Column whose values the series come from.
    pub column: String,
    mapping: BTreeMap<String, Color32>,
    order: Vec<String>,
    fallback: Color32,
}

impl ColorMap {
    /// Assign palette colours to the given names, in order.
    pub fn new(column: &str, ordered_names: &[String]) -> Self {
        let colors = series_palette(ordered_names.len());
        let mapping = ordered_names
            .iter()
            .cloned()
            .zip(colors.iter().copied())
            .collect();
        Self {
            column: column.to_owned(),
            mapping,
            order: ordered_names.to_vec(),
            fallback: Color32::GRAY,
        }
    }

    pub fn color_for(&self, name: &str) -> Color32 {
        self.mapping.get(name).copied().unwrap_or(self.fallback)
    }

    /// Legend rows: `(name, colour)` in legend order.
    pub fn legend_entries(&self) -> impl Iterator<Item = (&str, Color32)> {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.color_for(name)))
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
