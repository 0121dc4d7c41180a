//! HTML pages. Charts are inlined as SVG.

use std::fmt::Write;

use co2_records::YearRange;

use crate::dashboard::Artifacts;
use crate::ranking::TopN;
use crate::render::{escape, format_quantity};

const STYLE: &str = "\
body { font-family: sans-serif; margin: 0 2rem 2rem; color: #222; }
form { display: flex; gap: 2rem; align-items: center; margin: 1rem 0; }
svg { max-width: 100%; height: auto; }
table { border-collapse: collapse; }
th, td { padding: 0.2rem 0.8rem; border-bottom: 1px solid #ddd; text-align: left; }
td.num { text-align: right; }
.notice { padding: 0.8rem; background: #eef3fb; border-left: 4px solid #636efa; }
";

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>\n{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape(title)
    )
}

fn table(header: &[String], rows: &[Vec<String>], numeric: &[usize]) -> String {
    let mut html = String::from("<table>\n<tr>");
    for name in header {
        let _ = write!(html, "<th>{}</th>", escape(name));
    }
    html.push_str("</tr>\n");
    for row in rows {
        html.push_str("<tr>");
        for (i, cell) in row.iter().enumerate() {
            if numeric.contains(&i) {
                let _ = write!(html, "<td class=\"num\">{}</td>", escape(cell));
            } else {
                let _ = write!(html, "<td>{}</td>", escape(cell));
            }
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    html
}

/// The map, the top-N bars and the full ranking for one selection.
pub fn dashboard(artifacts: &Artifacts, years: Option<YearRange>) -> String {
    let year = artifacts.state.year;
    let top_n = artifacts.state.top_n.get();
    let range = years.unwrap_or(YearRange {
        min: year,
        max: year,
    });

    let mut body = String::new();
    body.push_str("<h1>🌍 CO₂ emissions by country</h1>\n");
    body.push_str("<p>Interactive map and bar chart built from the emissions data.</p>\n");
    let _ = write!(
        body,
        "<form method=\"get\" action=\"/\">\n\
         <label>Year <input type=\"range\" name=\"year\" min=\"{}\" max=\"{}\" value=\"{year}\" \
         onchange=\"this.form.submit()\"> <output>{year}</output></label>\n\
         <label>Countries in the bar chart <input type=\"number\" name=\"top_n\" min=\"{}\" \
         max=\"{}\" step=\"1\" value=\"{top_n}\" onchange=\"this.form.submit()\"></label>\n\
         <noscript><button type=\"submit\">Update</button></noscript>\n</form>\n",
        range.min,
        range.max,
        TopN::MIN,
        TopN::MAX,
    );

    let _ = write!(body, "<h2>🗺️ CO₂ emissions map in {year}</h2>\n");
    body.push_str(&artifacts.map_svg);
    let _ = write!(body, "\n<h2>📊 Top emitting countries in {year}</h2>\n");
    body.push_str(&artifacts.bar_svg);

    body.push_str("\n<h3>📄 Countries and emissions</h3>\n");
    if !range.contains(year) {
        let _ = write!(
            body,
            "<p class=\"notice\">{year} is outside the years in the data ({} to {}).</p>\n",
            range.min, range.max
        );
    } else if artifacts.ranking.is_empty() {
        let _ = write!(body, "<p class=\"notice\">No emissions data for {year}.</p>\n");
    } else {
        let rows: Vec<Vec<String>> = artifacts
            .ranking
            .iter()
            .map(|row| {
                vec![
                    row.country.clone(),
                    row.code.clone(),
                    row.co2.map(format_quantity).unwrap_or_default(),
                ]
            })
            .collect();
        let header = ["Country", "Code", "CO₂ emissions"].map(String::from);
        body.push_str(&table(&header, &rows, &[2]));
    }
    body.push_str("<p><a href=\"/upload\">Chart your own CSV file</a></p>\n");

    layout("CO₂ emissions by country", &body)
}

/// What the upload page needs once a file is present.
pub struct UploadView<'a> {
    pub file_name: &'a str,
    pub rows: usize,
    pub columns: &'a [String],
    pub preview: &'a [Vec<String>],
    pub x: &'a str,
    pub y: &'a str,
    pub chart_svg: &'a str,
}

const UPLOAD_FORM: &str = "<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\n\
<label>Upload a CSV file <input type=\"file\" name=\"file\" accept=\".csv\"></label>\n\
<button type=\"submit\">Upload</button>\n</form>\n";

fn select(name: &str, label: &str, columns: &[String], selected: &str) -> String {
    let mut html = format!("<label>{label} <select name=\"{name}\" onchange=\"this.form.submit()\">");
    for column in columns {
        let marker = if column == selected { " selected" } else { "" };
        let column = escape(column);
        let _ = write!(html, "<option value=\"{column}\"{marker}>{column}</option>");
    }
    html.push_str("</select></label>\n");
    html
}

pub fn upload(view: Option<UploadView<'_>>) -> String {
    let mut body = String::from("<h1>📊 Bar chart generator</h1>\n");
    body.push_str("<p>Upload a CSV file and choose the columns to chart.</p>\n");
    body.push_str(UPLOAD_FORM);

    match view {
        None => body.push_str("<p class=\"notice\">📥 Waiting for a CSV upload…</p>\n"),
        Some(view) => {
            let _ = write!(
                body,
                "<h2>Preview of {}</h2>\n<p>Rows: {}, columns: {}</p>\n",
                escape(view.file_name),
                view.rows,
                view.columns.len()
            );
            body.push_str(&table(view.columns, view.preview, &[]));
            body.push_str("<form method=\"get\" action=\"/upload\">\n");
            body.push_str(&select("x", "Column for the X axis", view.columns, view.x));
            body.push_str(&select("y", "Column for the Y axis", view.columns, view.y));
            body.push_str("<noscript><button type=\"submit\">Chart</button></noscript>\n</form>\n");
            body.push_str(view.chart_svg);
            body.push('\n');
        }
    }
    body.push_str("<p><a href=\"/\">Back to the emissions map</a></p>\n");

    layout("Bar chart generator", &body)
}
