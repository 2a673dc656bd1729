//! SVG output
//!
//! Serializes a `ChartFrame` into a standalone `<svg>` element. Axis markup
//! follows the usual chart-library layout: one `g.tick` per tick holding a
//! `line` and a `text`, plus a `path.domain` for the axis line.

use std::borrow::Cow;
use std::fmt::Write;

use crate::chart::axis::{Axis, AxisOrient, TICK_PADDING, TICK_SIZE};
use crate::chart::binder::Bar;
use crate::chart::ChartFrame;

/// Fill an SVG rect has before any fill is set
const INITIAL_FILL: &str = "black";

/// Escape text for use in attribute values and text nodes
///
/// Covers the five XML special characters, quotes included.
pub fn escape(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// Render a full chart
pub fn render_svg(frame: &ChartFrame) -> String {
    let layout = &frame.layout;
    let mut out = String::with_capacity(4096);

    // `write!` into a String cannot fail
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" style="border: 2px solid gray">"#,
        layout.width, layout.height
    );
    let _ = write!(
        out,
        r#"<g transform="translate({},{})">"#,
        layout.margin.left, layout.margin.top
    );

    out.push_str(r#"<g class="bars">"#);
    for bar in &frame.bars {
        render_bar(&mut out, bar);
    }
    out.push_str("</g>");

    let chart_height = layout.chart_height();
    match &frame.x_axis {
        Some(axis) => render_axis(&mut out, axis, Some((0.0, chart_height)), "x-axis"),
        None => {
            let _ = write!(
                out,
                r#"<g class="x-axis" transform="translate(0,{})"></g>"#,
                chart_height
            );
        }
    }
    match &frame.y_axis {
        Some(axis) => render_axis(&mut out, axis, None, "y-axis"),
        None => out.push_str(r#"<g class="y-axis"></g>"#),
    }

    out.push_str("</g></svg>");
    out
}

fn render_bar(out: &mut String, bar: &Bar) {
    let _ = write!(
        out,
        r#"<rect data-key="{}" x="{}" y="{}" width="{}" "#,
        bar.key, bar.x, bar.y, bar.width
    );

    match &bar.transition {
        None => {
            let _ = write!(
                out,
                r#"height="{}" fill="{}"></rect>"#,
                bar.height,
                escape(&bar.fill)
            );
        }
        Some(t) => {
            let _ = write!(
                out,
                r#"height="{from}" fill="{initial}"><animate attributeName="height" from="{from}" to="{to}" dur="{dur}ms" calcMode="spline" keyTimes="0;1" keySplines="0.645 0.045 0.355 1" fill="freeze"></animate><animate attributeName="fill" from="{initial}" to="{fill}" dur="{dur}ms" fill="freeze"></animate></rect>"#,
                from = t.height_from,
                to = bar.height,
                dur = t.duration_ms,
                initial = INITIAL_FILL,
                fill = escape(&bar.fill),
            );
        }
    }
}

fn render_axis(out: &mut String, axis: &Axis, translate: Option<(f64, f64)>, class: &str) {
    let _ = write!(out, r#"<g class="{}""#, class);
    if let Some((tx, ty)) = translate {
        let _ = write!(out, r#" transform="translate({},{})""#, tx, ty);
    }
    let _ = write!(
        out,
        r#" fill="none" font-size="10" font-family="sans-serif" text-anchor="{}">"#,
        match axis.orient {
            AxisOrient::Bottom => "middle",
            AxisOrient::Left => "end",
        }
    );

    let (r0, r1) = axis.range;
    let domain = match axis.orient {
        AxisOrient::Bottom => format!("M{},{}V0H{}V{}", r0, TICK_SIZE, r1, TICK_SIZE),
        AxisOrient::Left => format!("M{},{}H0V{}H{}", -TICK_SIZE, r0, r1, -TICK_SIZE),
    };
    let _ = write!(
        out,
        r#"<path class="domain" stroke="currentColor" d="{}"></path>"#,
        domain
    );

    let style = &axis.label_style;
    let mut label_attrs = format!(
        r#"fill="{}" text-anchor="{}""#,
        escape(&style.fill),
        escape(&style.text_anchor)
    );
    if let Some(size) = &style.font_size {
        let _ = write!(label_attrs, r#" font-size="{}""#, escape(size));
    }
    if let Some(degrees) = style.rotate {
        let _ = write!(label_attrs, r#" transform="rotate({})""#, degrees);
    }

    let gap = TICK_SIZE + TICK_PADDING;
    for tick in &axis.ticks {
        match axis.orient {
            AxisOrient::Bottom => {
                let _ = write!(
                    out,
                    r#"<g class="tick" opacity="1" transform="translate({},0)"><line stroke="currentColor" y2="{}"></line><text {} y="{}" dy="0.71em">{}</text></g>"#,
                    tick.offset,
                    TICK_SIZE,
                    label_attrs,
                    gap,
                    escape(&tick.label)
                );
            }
            AxisOrient::Left => {
                let _ = write!(
                    out,
                    r#"<g class="tick" opacity="1" transform="translate(0,{})"><line stroke="currentColor" x2="{}"></line><text {} x="{}" dy="0.32em">{}</text></g>"#,
                    tick.offset,
                    -TICK_SIZE,
                    label_attrs,
                    -gap,
                    escape(&tick.label)
                );
            }
        }
    }

    out.push_str("</g>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartBinder, ChartOptions};
    use crate::reading::Reading;

    fn rendered(data: &[Reading]) -> (ChartBinder, String) {
        let mut chart = ChartBinder::new(ChartOptions::default());
        chart.update(data);
        let svg = render_svg(&chart.frame());
        (chart, svg)
    }

    #[test]
    fn test_svg_frame_attributes() {
        let (_, svg) = rendered(&[]);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(r#"width="800" height="600""#));
        assert!(svg.contains("border: 2px solid gray"));
        assert!(svg.contains(r#"transform="translate(100,20)""#));
        assert!(!svg.contains("<rect"));
    }

    #[test]
    fn test_entering_bars_animate() {
        let (chart, svg) = rendered(&[Reading::new(10, 100), Reading::new(50, 200)]);
        assert_eq!(svg.matches("<rect").count(), 2);
        assert_eq!(svg.matches(r#"attributeName="height""#).count(), 2);
        assert!(svg.contains(r#"dur="1000ms""#));
        assert!(svg.contains(r#"to="orange""#));

        let settled = render_svg(&chart.settled_frame());
        assert!(!settled.contains("<animate"));
        assert!(settled.contains(r#"height="480" fill="orange""#));
    }

    #[test]
    fn test_axis_labels() {
        let (_, svg) = rendered(&[Reading::new(10, 100), Reading::new(50, 200)]);
        assert!(svg.contains(">50°C</text>"));
        assert!(svg.contains(">100</text>"));
        assert!(svg.contains(r#"transform="rotate(-40)""#));
        assert!(svg.contains(r#"font-size="0.75rem""#));
        assert!(svg.contains(r#"transform="translate(0,480)""#));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
        assert_eq!(escape("plain"), "plain");
        assert!(matches!(escape("21°C"), Cow::Borrowed(_)));
    }
}
