//! Feedback count chart rendered as inline SVG

use crate::feedback::FeedbackLabel;
use html_escape::encode_text;
use std::collections::BTreeMap;
use std::fmt::Write;

const WIDTH: f32 = 400.0;
const HEIGHT: f32 = 400.0;
const MARGIN_LEFT: f32 = 60.0;
const MARGIN_RIGHT: f32 = 20.0;
const MARGIN_TOP: f32 = 50.0;
const MARGIN_BOTTOM: f32 = 60.0;

/// Pastel bar colors, one per label
fn bar_color(label: FeedbackLabel) -> &'static str {
    match label {
        FeedbackLabel::Yes => "#a1c9f4",
        FeedbackLabel::No => "#ffb482",
    }
}

/// Round the axis maximum up so there are at most ~5 integer ticks
fn tick_step(max: usize) -> usize {
    match max {
        0..=5 => 1,
        6..=10 => 2,
        _ => {
            let raw = (max as f32 / 5.0).ceil() as usize;
            let magnitude = 10usize.pow((raw as f32).log10().floor() as u32);
            [1, 2, 5, 10]
                .iter()
                .map(|m| m * magnitude)
                .find(|step| *step >= raw)
                .unwrap_or(raw)
        }
    }
}

/// Bar chart of feedback counts with both categories always on the x axis
pub fn count_chart_svg(counts: &BTreeMap<FeedbackLabel, usize>) -> String {
    let max = FeedbackLabel::ALL
        .iter()
        .map(|l| counts.get(l).copied().unwrap_or(0))
        .max()
        .unwrap_or(0);
    let step = tick_step(max);
    let axis_max = (max.div_ceil(step) * step).max(step);

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_h;
    let slot = plot_w / FeedbackLabel::ALL.len() as f32;
    let bar_w = slot * 0.6;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" role="img" aria-label="Feedback Distribution">"#,
        w = WIDTH,
        h = HEIGHT,
    );
    let _ = write!(svg, r#"<rect width="{}" height="{}" fill="white"/>"#, WIDTH, HEIGHT);
    let _ = write!(
        svg,
        r#"<text x="{}" y="28" text-anchor="middle" font-size="16">Feedback Distribution</text>"#,
        WIDTH / 2.0
    );

    // Horizontal grid lines with count labels
    let mut tick = 0;
    while tick <= axis_max {
        let y = baseline - plot_h * tick as f32 / axis_max as f32;
        let _ = write!(
            svg,
            r##"<line x1="{x1}" y1="{y}" x2="{x2}" y2="{y}" stroke="#dddddd"/><text x="{tx}" y="{ty}" text-anchor="end" font-size="11">{tick}</text>"##,
            x1 = MARGIN_LEFT,
            x2 = WIDTH - MARGIN_RIGHT,
            y = y,
            tx = MARGIN_LEFT - 6.0,
            ty = y + 4.0,
            tick = tick,
        );
        tick += step;
    }

    for (i, label) in FeedbackLabel::ALL.iter().enumerate() {
        let count = counts.get(label).copied().unwrap_or(0);
        let bar_h = plot_h * count as f32 / axis_max as f32;
        let x = MARGIN_LEFT + slot * i as f32 + (slot - bar_w) / 2.0;
        let _ = write!(
            svg,
            r#"<rect class="bar" data-label="{label}" data-count="{count}" x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}"/>"#,
            label = label,
            count = count,
            x = x,
            y = baseline - bar_h,
            w = bar_w,
            h = bar_h,
            fill = bar_color(*label),
        );
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="12">{}</text>"#,
            x + bar_w / 2.0,
            baseline + 18.0,
            encode_text(label.as_str()),
        );
    }

    let _ = write!(
        svg,
        r##"<line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="#333333"/>"##,
        l = MARGIN_LEFT,
        r = WIDTH - MARGIN_RIGHT,
        b = baseline,
    );
    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="13">Feedback</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        HEIGHT - 15.0,
    );
    let _ = write!(
        svg,
        r#"<text x="18" y="{y}" text-anchor="middle" font-size="13" transform="rotate(-90 18 {y})">Count</text>"#,
        y = MARGIN_TOP + plot_h / 2.0,
    );
    svg.push_str("</svg>");
    svg
}
