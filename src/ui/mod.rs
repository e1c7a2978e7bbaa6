//! egui widgets: the control panels, the summary chart and the summary
//! table.  Everything here reads and mutates [`crate::state::AppState`];
//! no data processing happens in this layer.

pub mod panels;
pub mod plot;
pub mod table;
