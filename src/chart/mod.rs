//! Chart appearance: everything about how the summary is drawn that is
//! independent of egui widgets.  The UI layer consumes [`style::ChartStyle`]
//! when it builds the plot.

pub mod dates;
pub mod labels;
pub mod style;
