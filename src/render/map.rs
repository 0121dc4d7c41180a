use std::ops::Range;

use geo::{Area, BoundingRect, Coord, LineString, MultiPolygon, Rect};
use plotters::prelude::*;

use super::scale::{ramp, ContinuousScale, NO_DATA};
use super::{escape, format_quantity, RenderOptions};
use crate::boundaries::CountryMaster;
use crate::yearly::YearlyJoinResult;

const LEGEND_WIDTH: u32 = 110;
const BACKGROUND: RGBColor = WHITE;

struct Shape {
    polygon: geo::Polygon<f64>,
    fill: RGBColor,
    // hover text
    label: String,
}

/// Draws the year's choropleth: countries with data on the Reds scale,
/// the rest in flat grey with no legend entry, view fitted to every country.
pub fn render_choropleth(
    result: &YearlyJoinResult,
    master: &CountryMaster,
    options: &RenderOptions,
) -> anyhow::Result<String> {
    let scale = result
        .value_range()
        .map(|(min, max)| ContinuousScale::new(min, max));

    let mut shapes = Vec::new();
    let mut projected = Vec::with_capacity(master.len());
    for (country, row) in master.countries().iter().zip(&result.rows) {
        debug_assert_eq!(country.code, row.code);
        let geometry = options.projection.project_geometry(&country.geometry);
        let fill = match (row.co2, scale) {
            (Some(value), Some(scale)) => scale.color(value),
            _ => NO_DATA,
        };
        let label = match row.co2 {
            Some(value) => format!("{}: {}", row.country, format_quantity(value)),
            None => format!("{}: no data", row.country),
        };
        shapes.extend(geometry.0.iter().cloned().map(|polygon| Shape {
            polygon,
            fill,
            label: label.clone(),
        }));
        projected.push(geometry);
    }
    // Largest first so enclaves stay visible on top of the country around them.
    shapes.sort_by(|a, b| b.polygon.unsigned_area().total_cmp(&a.polygon.unsigned_area()));

    let bounds = union_bounds(&projected);
    tracing::debug!(
        year = result.year,
        polygons = shapes.len(),
        coloured = result.has_data().count(),
        "rendering choropleth"
    );

    // One entry per `<polygon>` in draw order: exteriors are labelled, holes are not.
    let mut labels: Vec<Option<&str>> = Vec::new();
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.map_width, options.map_height))
            .into_drawing_area();
        root.fill(&BACKGROUND)?;
        let title = format!("CO₂ emissions by country in {}", result.year);
        let body = root.titled(&title, ("sans-serif", 22).into_font())?;
        let legend_width = LEGEND_WIDTH.min(options.map_width / 4);
        let (map_area, legend_area) =
            body.split_horizontally(options.map_width.saturating_sub(legend_width));

        let (x_range, y_range) = fit_view(bounds, map_area.dim_in_pixel());
        let mut chart = ChartBuilder::on(&map_area)
            .margin(5)
            .build_cartesian_2d(x_range, y_range)?;

        for shape in &shapes {
            chart.draw_series(std::iter::once(Polygon::new(
                ring_points(shape.polygon.exterior()),
                shape.fill.filled(),
            )))?;
            labels.push(Some(shape.label.as_str()));
            labels.extend(shape.polygon.interiors().iter().map(|_| None));
            chart.draw_series(
                shape
                    .polygon
                    .interiors()
                    .iter()
                    .map(|hole| Polygon::new(ring_points(hole), BACKGROUND.filled())),
            )?;
            chart.draw_series(std::iter::once(PathElement::new(
                ring_points(shape.polygon.exterior()),
                WHITE.stroke_width(1),
            )))?;
        }

        if let Some(scale) = scale {
            draw_color_bar(&legend_area, scale)?;
        }
        root.present()?;
    }
    Ok(label_polygons(&svg, &labels))
}

/// Gives the n-th `<polygon/>` of `svg` a `<title>` child from `labels[n]`.
fn label_polygons(svg: &str, labels: &[Option<&str>]) -> String {
    let mut out = String::with_capacity(svg.len() + labels.len() * 32);
    let mut labels = labels.iter();
    let mut rest = svg;
    while let Some(start) = rest.find("<polygon") {
        let Some(end) = rest[start..].find("/>").map(|i| start + i) else {
            break;
        };
        out.push_str(&rest[..end]);
        match labels.next() {
            Some(Some(label)) => {
                out.push_str("><title>");
                out.push_str(&escape(label));
                out.push_str("</title></polygon>");
            }
            _ => out.push_str("/>"),
        }
        rest = &rest[end + 2..];
    }
    out.push_str(rest);
    out
}

fn ring_points(ring: &LineString<f64>) -> Vec<(f64, f64)> {
    ring.coords().map(|c| (c.x, c.y)).collect()
}

/// Bounding box over all geometries, `None` when there are none.
pub fn union_bounds(geometries: &[MultiPolygon<f64>]) -> Option<Rect<f64>> {
    geometries
        .iter()
        .filter_map(|g| g.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
}

/// Axis ranges covering `bounds` with the pixel area's aspect ratio, plus a
/// small pad. Falls back to the whole world in projected units.
pub fn fit_view(bounds: Option<Rect<f64>>, (width, height): (u32, u32)) -> (Range<f64>, Range<f64>) {
    let bounds = bounds.unwrap_or_else(|| {
        Rect::new(
            Coord {
                x: -std::f64::consts::PI,
                y: -std::f64::consts::FRAC_PI_2,
            },
            Coord {
                x: std::f64::consts::PI,
                y: std::f64::consts::FRAC_PI_2,
            },
        )
    });
    let aspect = width.max(1) as f64 / height.max(1) as f64;
    let center = bounds.center();
    let mut dx = bounds.width().max(1e-6) * 1.04;
    let mut dy = bounds.height().max(1e-6) * 1.04;
    if dx / dy > aspect {
        dy = dx / aspect;
    } else {
        dx = dy * aspect;
    }
    (
        center.x - dx / 2.0..center.x + dx / 2.0,
        center.y - dy / 2.0..center.y + dy / 2.0,
    )
}

fn draw_color_bar<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    scale: ContinuousScale,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    const STEPS: i32 = 64;
    let (_, height) = area.dim_in_pixel();
    let (top, bottom) = (40, height as i32 - 40);
    let (left, right) = (15, 35);
    let span = (bottom - top).max(STEPS);
    let font = ("sans-serif", 13).into_font();

    area.draw(&Text::new("co2", (left, top - 22), font.clone()))?;
    for step in 0..STEPS {
        let y0 = top + span * step / STEPS;
        let y1 = top + span * (step + 1) / STEPS;
        let t = 1.0 - step as f64 / (STEPS - 1) as f64;
        area.draw(&Rectangle::new([(left, y0), (right, y1)], ramp(t).filled()))?;
    }
    area.draw(&Rectangle::new([(left, top), (right, top + span)], BLACK.stroke_width(1)))?;
    area.draw(&Text::new(format_quantity(scale.max), (right + 5, top - 6), font.clone()))?;
    area.draw(&Text::new(format_quantity(scale.min), (right + 5, top + span - 6), font))?;
    Ok(())
}
