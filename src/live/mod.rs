//! Live chart binding
//!
//! Connects the store gateway to the chart: writes readings on user
//! actions and keeps a per-viewer chart in step with the standing query
//! for the most recent readings.
//!
//! ```text
//! add → LiveChart::append → store ─push→ ChartSession::next_frame → frame
//! ```

pub mod error;
pub mod session;

pub use error::{LiveError, LiveResult};
pub use session::{
    AppendedReading, ChartSession, LiveChart, SessionFrame, DEFAULT_COLLECTION,
    DEFAULT_WINDOW_SIZE, ORDER_FIELD,
};
