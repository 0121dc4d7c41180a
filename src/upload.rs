//! Free-form CSV uploads charted as `y` by `x`.

use std::io::Cursor;

use anyhow::Context;
use polars::prelude::*;

use crate::error::DashboardError;
use crate::render::{Bar, BarChart};

pub const PREVIEW_ROWS: usize = 5;

/// A user-supplied CSV with no fixed schema.
#[derive(Debug, Clone)]
pub struct UploadedTable {
    pub file_name: String,
    frame: DataFrame,
}

impl UploadedTable {
    pub fn from_csv_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> anyhow::Result<Self> {
        let file_name = file_name.into();
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .with_context(|| format!("parsing uploaded file {file_name}"))?;
        tracing::info!(file = %file_name, shape = ?frame.shape(), "CSV uploaded");
        Ok(Self { file_name, frame })
    }

    pub fn columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// First rows as display strings, nulls as empty cells.
    pub fn preview(&self, rows: usize) -> anyhow::Result<Vec<Vec<String>>> {
        let head = self.frame.head(Some(rows));
        let columns = head
            .get_columns()
            .iter()
            .map(|column| text_values(column))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok((0..head.height())
            .map(|row| columns.iter().map(|values| values[row].clone()).collect())
            .collect())
    }

    /// Suggested selection: first column for `x`, first numeric column for `y`.
    pub fn default_axes(&self) -> Option<(String, String)> {
        let columns = self.frame.get_columns();
        let x = columns.first()?.name().to_string();
        let y = columns
            .iter()
            .find(|c| c.dtype().is_integer() || c.dtype().is_float())
            .unwrap_or(&columns[0])
            .name()
            .to_string();
        Some((x, y))
    }

    /// One bar per row. Cells of `y` that are not numbers are skipped, so an
    /// unsuitable choice gives a sparse or empty chart rather than an error.
    pub fn bar_chart(&self, x: &str, y: &str) -> Result<BarChart, DashboardError> {
        let x_column = self.column(x)?;
        let y_column = self.column(y)?;

        let labels = text_values(x_column)?;
        let values = y_column
            .cast(&DataType::Float64)
            .context("casting y column")?;
        let values = values.f64().context("reading y column")?;

        let bars = labels
            .into_iter()
            .zip(values)
            .filter_map(|(label, value)| Some(Bar { label, value: value? }))
            .collect();

        Ok(BarChart {
            title: format!("Bar chart: {y} by {x}"),
            x_label: x.to_string(),
            y_label: y.to_string(),
            bars,
        })
    }

    fn column(&self, name: &str) -> Result<&Column, DashboardError> {
        self.frame
            .column(name)
            .map_err(|_| DashboardError::UnknownUploadColumn(name.to_string()))
    }
}

fn text_values(column: &Column) -> anyhow::Result<Vec<String>> {
    let text = column.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
country,continent,co2
China,Asia,11.4
United States,North America,5.0
India,Asia,n/a
Germany,Europe,0.7
";

    fn table() -> UploadedTable {
        UploadedTable::from_csv_bytes("co2.csv", CSV.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_columns_follow_header() {
        let table = table();
        assert_eq!(table.columns(), vec!["country", "continent", "co2"]);
        assert_eq!(table.height(), 4);
    }

    #[test]
    fn test_preview() {
        let preview = table().preview(2).unwrap();
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0], vec!["China", "Asia", "11.4"]);
    }

    #[test]
    fn test_default_axes_pick_a_numeric_y() {
        let csv = "name,value\na,1\nb,2\n";
        let table = UploadedTable::from_csv_bytes("t.csv", csv.as_bytes().to_vec()).unwrap();
        assert_eq!(
            table.default_axes(),
            Some(("name".to_string(), "value".to_string()))
        );
    }

    #[test]
    fn test_bar_chart_skips_non_numeric_cells() {
        let chart = table().bar_chart("country", "co2").unwrap();
        assert_eq!(chart.title, "Bar chart: co2 by country");
        let labels: Vec<&str> = chart.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["China", "United States", "Germany"]);
    }

    #[test]
    fn test_text_y_column_gives_empty_chart() {
        let chart = table().bar_chart("country", "continent").unwrap();
        assert!(chart.bars.is_empty());
    }

    #[test]
    fn test_unknown_column() {
        let err = table().bar_chart("country", "nope").unwrap_err();
        assert!(matches!(err, DashboardError::UnknownUploadColumn(c) if c == "nope"));
    }
}
