//! Inline SVG line chart for the daily sales trend.

use crate::analytics::DailyTrend;
use crate::utils::format::eur;
use std::fmt::Write;

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 320.0;
const PAD_LEFT: f64 = 90.0;
const PAD_RIGHT: f64 = 20.0;
const PAD_TOP: f64 = 20.0;
const PAD_BOTTOM: f64 = 40.0;

const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#17becf",
];

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn series_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// One polyline per marketplace; every point carries a `<title>` tooltip.
pub fn render_trend_svg(trend: &DailyTrend) -> String {
    if trend.days.is_empty() {
        return String::new();
    }

    let plot_w = WIDTH - PAD_LEFT - PAD_RIGHT;
    let plot_h = HEIGHT - PAD_TOP - PAD_BOTTOM;
    let max = trend
        .series
        .iter()
        .flatten()
        .copied()
        .fold(0.0_f64, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };

    let x = |i: usize| {
        if trend.days.len() == 1 {
            PAD_LEFT + plot_w / 2.0
        } else {
            PAD_LEFT + plot_w * i as f64 / (trend.days.len() - 1) as f64
        }
    };
    let y = |v: f64| PAD_TOP + plot_h - plot_h * v.max(0.0) / max;

    let mut svg = String::new();
    // writing into a String cannot fail
    let _ = write!(
        svg,
        r#"<svg class="trend" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg" role="img">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = write!(
        svg,
        r##"<line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="#999"/><line x1="{l}" y1="{t}" x2="{l}" y2="{b}" stroke="#999"/>"##,
        l = PAD_LEFT,
        r = WIDTH - PAD_RIGHT,
        t = PAD_TOP,
        b = PAD_TOP + plot_h
    );
    for (label, value) in [(eur(max), max), (eur(max / 2.0), max / 2.0), (eur(0.0), 0.0)] {
        let _ = write!(
            svg,
            r#"<text x="{x}" y="{y:.1}" text-anchor="end" font-size="11">{label}</text>"#,
            x = PAD_LEFT - 6.0,
            y = y(value) + 4.0,
            label = escape(&label)
        );
    }
    let first = trend.days[0].format("%Y-%m-%d").to_string();
    let last = trend.days[trend.days.len() - 1].format("%Y-%m-%d").to_string();
    let _ = write!(
        svg,
        r#"<text x="{x0}" y="{yb}" font-size="11">{first}</text><text x="{x1}" y="{yb}" text-anchor="end" font-size="11">{last}</text>"#,
        x0 = PAD_LEFT,
        x1 = WIDTH - PAD_RIGHT,
        yb = HEIGHT - 12.0,
    );

    for (m, (name, values)) in trend.marketplaces.iter().zip(&trend.series).enumerate() {
        let color = series_color(m);
        let points: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:.1},{:.1}", x(i), y(*v)))
            .collect();
        let _ = write!(
            svg,
            r#"<polyline fill="none" stroke="{color}" stroke-width="2" points="{points}"/>"#,
            points = points.join(" ")
        );
        for (i, value) in values.iter().enumerate() {
            let _ = write!(
                svg,
                r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="3" fill="{color}"><title>{name} {day}: {amount}</title></circle>"#,
                cx = x(i),
                cy = y(*value),
                name = escape(name),
                day = trend.days[i].format("%Y-%m-%d"),
                amount = escape(&eur(*value))
            );
        }
    }
    svg.push_str("</svg>");
    svg
}
