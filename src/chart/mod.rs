//! Bar chart of the Recent Window
//!
//! Pure, synchronous charting: nothing in here touches the store or the
//! network.
//!
//! ## Components
//!
//! - `scale`: band scale for timestamps, linear scale and ticks for temperatures
//! - `join`: enter/update/exit reconciliation between two key lists
//! - `axis`: tick generation and label styling
//! - `binder`: the stateful chart that applies windows to bars
//! - `svg`: serialization of a frame to SVG markup
//!
//! ## Example
//!
//! ```rust,ignore
//! use weatherboard::chart::{render_svg, ChartBinder, ChartOptions};
//! use weatherboard::Reading;
//!
//! let mut chart = ChartBinder::new(ChartOptions::default());
//! chart.update(&[Reading::new(10, 100), Reading::new(50, 200)]);
//! let svg = render_svg(&chart.frame());
//! ```

pub mod axis;
pub mod binder;
pub mod join;
pub mod layout;
pub mod scale;
pub mod svg;

use serde::Serialize;

pub use axis::{Axis, AxisOrient, LabelStyle, Tick};
pub use binder::{Bar, ChartBinder, Transition, UpdateReport};
pub use join::{reconcile, JoinBy, JoinPlan};
pub use layout::{ChartLayout, ChartOptions, Margin};
pub use scale::{ticks, BandScale, LinearScale};
pub use svg::render_svg;

/// Everything needed to draw the chart once
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    pub layout: ChartLayout,
    pub bars: Vec<Bar>,
    /// `None` until the first update
    pub x_axis: Option<Axis>,
    pub y_axis: Option<Axis>,
}
