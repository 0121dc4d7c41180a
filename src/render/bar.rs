use plotters::prelude::*;
use plotters::style::FontTransform;
use serde::Serialize;

use super::format_quantity;

const BAR_COLOR: RGBColor = RGBColor(0x63, 0x6e, 0xfa);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// A categorical bar chart, bars drawn in the given order.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<Bar>,
}

impl BarChart {
    /// Value axis range; always includes zero and is never empty.
    pub fn value_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .bars
            .iter()
            .map(|b| b.value)
            .filter(|v| v.is_finite())
            .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if hi - lo <= 0.0 {
            return (0.0, 1.0);
        }
        let pad = (hi - lo) * 0.05;
        (if lo < 0.0 { lo - pad } else { lo }, if hi > 0.0 { hi + pad } else { hi })
    }
}

pub fn render_bar_chart(chart: &BarChart, width: u32, height: u32) -> anyhow::Result<String> {
    let slots = chart.bars.len().max(1);
    let (lo, hi) = chart.value_range();
    let labels: Vec<&str> = chart.bars.iter().map(|b| b.label.as_str()).collect();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut ctx = ChartBuilder::on(&root)
            .caption(&chart.title, ("sans-serif", 20).into_font())
            .margin(15)
            .x_label_area_size(130)
            .y_label_area_size(70)
            .build_cartesian_2d((0..slots).into_segmented(), lo..hi)?;

        let x_formatter = |v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) => labels.get(*i).map(|s| s.to_string()).unwrap_or_default(),
            _ => String::new(),
        };
        let y_formatter = |v: &f64| format_quantity(*v);
        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(slots)
            .x_label_formatter(&x_formatter)
            .x_label_style(
                ("sans-serif", 12)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .y_label_formatter(&y_formatter)
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .draw()?;

        ctx.draw_series(chart.bars.iter().enumerate().map(|(i, bar)| {
            let value = if bar.value.is_finite() { bar.value } else { 0.0 };
            let (y0, y1) = if value >= 0.0 { (0.0, value) } else { (value, 0.0) };
            let mut rect = Rectangle::new(
                [(SegmentValue::Exact(i), y0), (SegmentValue::Exact(i + 1), y1)],
                BAR_COLOR.filled(),
            );
            rect.set_margin(0, 0, 4, 4);
            rect
        }))?;

        root.present()?;
    }
    Ok(svg)
}
