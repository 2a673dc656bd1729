//! Axis generation
//!
//! An axis is regenerated from its scale on every update. Regeneration
//! resets tick labels to the default style, so the binder re-applies its
//! label style each time.

use serde::Serialize;

use crate::chart::scale::{BandScale, LinearScale};

/// Length of tick marks and the outer domain caps
pub const TICK_SIZE: f64 = 6.0;
/// Gap between a tick mark and its label
pub const TICK_PADDING: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOrient {
    Bottom,
    Left,
}

/// Presentation attributes of tick labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelStyle {
    pub text_anchor: String,
    /// Rotation in degrees, applied around the label anchor
    pub rotate: Option<f64>,
    pub fill: String,
    pub font_size: Option<String>,
}

impl LabelStyle {
    /// Style a freshly drawn axis gives its labels
    pub fn default_for(orient: AxisOrient) -> Self {
        Self {
            text_anchor: match orient {
                AxisOrient::Bottom => "middle".to_string(),
                AxisOrient::Left => "end".to_string(),
            },
            rotate: None,
            fill: "currentColor".to_string(),
            font_size: None,
        }
    }
}

/// One tick: label text and offset along the axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub label: String,
    pub offset: f64,
}

/// A drawn axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub orient: AxisOrient,
    /// Extent of the domain line
    pub range: (f64, f64),
    pub ticks: Vec<Tick>,
    pub label_style: LabelStyle,
}

impl Axis {
    /// Bottom axis for a band scale; ticks sit at band centres
    pub fn bottom<K: PartialEq + Clone + ToString>(scale: &BandScale<K>) -> Self {
        let half = scale.bandwidth() / 2.0;
        let ticks = scale
            .domain()
            .iter()
            .filter_map(|key| {
                scale.position(key).map(|x| Tick {
                    label: key.to_string(),
                    offset: x + half,
                })
            })
            .collect();

        Self {
            orient: AxisOrient::Bottom,
            range: scale.range(),
            ticks,
            label_style: LabelStyle::default_for(AxisOrient::Bottom),
        }
    }

    /// Left axis for a linear scale, labels built by `format`
    pub fn left(scale: &LinearScale, count: usize, format: impl Fn(f64) -> String) -> Self {
        let ticks = scale
            .ticks(count)
            .into_iter()
            .map(|value| Tick {
                label: format(value),
                offset: scale.apply(value),
            })
            .collect();

        Self {
            orient: AxisOrient::Left,
            range: scale.range(),
            ticks,
            label_style: LabelStyle::default_for(AxisOrient::Left),
        }
    }

    /// Builder method: override tick label styling
    pub fn with_label_style(mut self, style: LabelStyle) -> Self {
        self.label_style = style;
        self
    }
}

/// Degrees Celsius tick label
pub fn celsius(value: f64) -> String {
    format!("{}°C", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bottom_ticks_centered_in_bands() {
        let mut x = BandScale::new((0.0, 680.0)).padding(0.2);
        x.set_domain([100_i64, 200]);

        let axis = Axis::bottom(&x);
        assert_eq!(axis.ticks.len(), 2);
        assert_eq!(axis.ticks[0].label, "100");
        assert_eq!(
            axis.ticks[0].offset,
            x.position(&100).unwrap() + x.bandwidth() / 2.0
        );
        assert_eq!(axis.label_style.text_anchor, "middle");
    }

    #[test]
    fn test_left_ticks_celsius() {
        let mut y = LinearScale::new((480.0, 0.0));
        y.set_domain(0.0, 50.0);

        let axis = Axis::left(&y, 10, celsius);
        assert_eq!(axis.ticks.len(), 11);
        assert_eq!(axis.ticks[0].label, "0°C");
        assert_eq!(axis.ticks[0].offset, 480.0);
        assert_eq!(axis.ticks[10].label, "50°C");
        assert_eq!(axis.ticks[10].offset, 0.0);
    }

    #[test]
    fn test_celsius_format() {
        assert_eq!(celsius(10.0), "10°C");
        assert_eq!(celsius(2.5), "2.5°C");
    }

    #[test]
    fn test_with_label_style() {
        let y = LinearScale::new((480.0, 0.0));
        let style = LabelStyle {
            text_anchor: "end".to_string(),
            rotate: None,
            fill: "orange".to_string(),
            font_size: Some("0.75rem".to_string()),
        };
        let axis = Axis::left(&y, 10, celsius).with_label_style(style.clone());
        assert_eq!(axis.label_style, style);
    }
}
