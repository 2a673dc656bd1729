//! Chart binder
//!
//! Owns the scales, axes and bars of one chart and applies each new
//! Recent Window to them. The binder is a plain state machine: it has no
//! clock, so entering bars record their transition and the renderer
//! decides how to play it.
//!
//! ## Update steps
//!
//! 1. x domain := timestamps of the window (band scale)
//! 2. y domain := `[0, max(temperature)]`, `[0, NaN]` for an empty window
//! 3. join the previous bars against the new keys (`reconcile`)
//! 4. redraw both axes and re-apply the label styles

use serde::Serialize;

use crate::chart::axis::{celsius, Axis, LabelStyle};
use crate::chart::join::{reconcile, JoinPlan};
use crate::chart::layout::ChartOptions;
use crate::chart::scale::{BandScale, LinearScale};
use crate::chart::ChartFrame;
use crate::reading::Reading;

/// Enter animation of a bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub duration_ms: u64,
    /// Height the bar starts from; it ends at the bar's `height`
    pub height_from: f64,
}

/// One rendered rectangle, in plot-area coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    /// Timestamp the bar is drawn for
    pub key: i64,
    pub temperature: i64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    /// Final height
    pub height: f64,
    pub fill: String,
    /// Present while the bar is entering
    pub transition: Option<Transition>,
}

impl Bar {
    pub fn is_entering(&self) -> bool {
        self.transition.is_some()
    }

    /// Height `elapsed_ms` after the bar was created
    pub fn height_at(&self, elapsed_ms: u64) -> f64 {
        match &self.transition {
            Some(t) if t.duration_ms > 0 && elapsed_ms < t.duration_ms => {
                let k = cubic_in_out(elapsed_ms as f64 / t.duration_ms as f64);
                t.height_from + (self.height - t.height_from) * k
            }
            _ => self.height,
        }
    }

    /// The bar with its transition finished
    pub fn settled(&self) -> Self {
        Self {
            transition: None,
            ..self.clone()
        }
    }
}

/// Default easing of chart transitions
pub fn cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// What one `update` did to the bars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
}

impl From<&JoinPlan> for UpdateReport {
    fn from(plan: &JoinPlan) -> Self {
        Self {
            entered: plan.enter.len(),
            updated: plan.update.len(),
            exited: plan.exit.len(),
        }
    }
}

/// Keeps one chart in sync with successive windows
#[derive(Debug, Clone)]
pub struct ChartBinder {
    options: ChartOptions,
    x: BandScale<i64>,
    y: LinearScale,
    bars: Vec<Bar>,
    x_axis: Option<Axis>,
    y_axis: Option<Axis>,
}

impl ChartBinder {
    pub fn new(options: ChartOptions) -> Self {
        let layout = options.layout;
        Self {
            x: BandScale::new((0.0, layout.chart_width())).padding(options.padding),
            y: LinearScale::new((layout.chart_height(), 0.0)),
            bars: Vec::new(),
            x_axis: None,
            y_axis: None,
            options,
        }
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn x_scale(&self) -> &BandScale<i64> {
        &self.x
    }

    pub fn y_scale(&self) -> &LinearScale {
        &self.y
    }

    /// Apply a window given in ascending timestamp order
    pub fn update(&mut self, data: &[Reading]) -> UpdateReport {
        self.x.set_domain(data.iter().map(|r| r.timestamp));

        let max = data
            .iter()
            .map(|r| r.temperature as f64)
            .reduce(f64::max)
            .unwrap_or(f64::NAN);
        self.y.set_domain(0.0, max);

        let previous_keys: Vec<i64> = self.bars.iter().map(|b| b.key).collect();
        let next_keys: Vec<i64> = data.iter().map(|r| r.timestamp).collect();
        let plan = reconcile(&previous_keys, &next_keys, self.options.join_by);

        let mut previous: Vec<Option<Bar>> = std::mem::take(&mut self.bars)
            .into_iter()
            .map(Some)
            .collect();
        let mut next: Vec<Option<Bar>> = vec![None; data.len()];

        for &(i, j) in &plan.update {
            if let Some(mut bar) = previous[i].take() {
                self.place(&mut bar, &data[j]);
                bar.transition = None;
                next[j] = Some(bar);
            }
        }
        for &j in &plan.enter {
            let mut bar = Bar {
                key: data[j].timestamp,
                temperature: data[j].temperature,
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
                fill: self.options.fill.clone(),
                transition: Some(Transition {
                    duration_ms: self.options.transition_ms,
                    height_from: 0.0,
                }),
            };
            self.place(&mut bar, &data[j]);
            next[j] = Some(bar);
        }

        self.bars = next.into_iter().flatten().collect();
        self.redraw_axes();

        let report = UpdateReport::from(&plan);
        tracing::debug!(
            entered = report.entered,
            updated = report.updated,
            exited = report.exited,
            "Chart updated"
        );
        report
    }

    /// Current state as a renderable frame
    pub fn frame(&self) -> ChartFrame {
        ChartFrame {
            layout: self.options.layout,
            bars: self.bars.clone(),
            x_axis: self.x_axis.clone(),
            y_axis: self.y_axis.clone(),
        }
    }

    /// Current state with every transition finished
    pub fn settled_frame(&self) -> ChartFrame {
        ChartFrame {
            bars: self.bars.iter().map(Bar::settled).collect(),
            ..self.frame()
        }
    }

    fn place(&self, bar: &mut Bar, reading: &Reading) {
        let y = self.y.apply(reading.temperature as f64);
        bar.key = reading.timestamp;
        bar.temperature = reading.temperature;
        bar.x = self.x.position(&reading.timestamp).unwrap_or(0.0);
        bar.width = self.x.bandwidth();
        bar.y = y;
        bar.height = self.options.layout.chart_height() - y;
        bar.fill = self.options.fill.clone();
    }

    fn redraw_axes(&mut self) {
        let fill = self.options.fill.clone();

        self.x_axis = Some(Axis::bottom(&self.x).with_label_style(LabelStyle {
            text_anchor: "end".to_string(),
            rotate: Some(-40.0),
            fill: fill.clone(),
            font_size: Some("0.5rem".to_string()),
        }));
        self.y_axis = Some(
            Axis::left(&self.y, self.options.y_ticks, celsius).with_label_style(LabelStyle {
                text_anchor: "end".to_string(),
                rotate: None,
                fill,
                font_size: Some("0.75rem".to_string()),
            }),
        );
    }
}
