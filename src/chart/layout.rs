//! Chart geometry and fixed styling

use serde::Serialize;

use crate::chart::join::JoinBy;

/// Space reserved around the plot area
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 100.0,
            left: 100.0,
        }
    }
}

/// Outer SVG size and margins
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            margin: Margin::default(),
        }
    }
}

impl ChartLayout {
    /// Width of the plot area
    pub fn chart_width(&self) -> f64 {
        self.width - self.margin.left - self.margin.right
    }

    /// Height of the plot area
    pub fn chart_height(&self) -> f64 {
        self.height - self.margin.top - self.margin.bottom
    }
}

/// Everything the binder needs besides the data
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub layout: ChartLayout,
    /// Inner and outer padding of the x band scale
    pub padding: f64,
    /// Duration of the enter transition
    pub transition_ms: u64,
    /// Bar and label colour
    pub fill: String,
    /// Requested tick count on the y axis
    pub y_ticks: usize,
    pub join_by: JoinBy,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            layout: ChartLayout::default(),
            padding: 0.2,
            transition_ms: 1000,
            fill: "orange".to_string(),
            y_ticks: 10,
            join_by: JoinBy::Index,
        }
    }
}
