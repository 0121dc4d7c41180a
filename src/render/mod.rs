//! SVG rendering of the choropleth map and bar charts.

pub mod bar;
pub mod map;
pub mod projection;
pub mod scale;

use serde::Deserialize;

pub use bar::{render_bar_chart, Bar, BarChart};
pub use map::render_choropleth;
pub use projection::Projection;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub map_width: u32,
    pub map_height: u32,
    pub bar_width: u32,
    pub bar_height: u32,
    pub projection: Projection,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            map_width: 1000,
            map_height: 600,
            bar_width: 1000,
            bar_height: 500,
            projection: Projection::NaturalEarth,
        }
    }
}

/// Escapes text for SVG and HTML output.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Short axis label: 1234567 -> "1.23M".
pub fn format_quantity(value: f64) -> String {
    let magnitude = value.abs();
    let (scaled, suffix) = if magnitude >= 1e12 {
        (value / 1e12, "T")
    } else if magnitude >= 1e9 {
        (value / 1e9, "B")
    } else if magnitude >= 1e6 {
        (value / 1e6, "M")
    } else if magnitude >= 1e3 {
        (value / 1e3, "k")
    } else {
        (value, "")
    };
    let text = format!("{scaled:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text}{suffix}")
}
