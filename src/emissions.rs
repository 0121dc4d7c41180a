use std::collections::BTreeSet;
use std::io::Cursor;

use anyhow::Context;
use co2_records::{EmissionRecord, YearRange};
use polars::prelude::*;
use serde::Deserialize;

use crate::error::DashboardError;

/// Source column names of the emissions CSV.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub entity: String,
    pub code: String,
    pub year: String,
    /// Inferred when unset, but only if exactly one other column remains.
    pub value: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            entity: "Entity".to_string(),
            code: "Code".to_string(),
            year: "Year".to_string(),
            value: None,
        }
    }
}

/// A [`ColumnMapping`] checked against a concrete header.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumns {
    pub code: String,
    pub year: String,
    pub value: String,
}

impl ColumnMapping {
    pub fn resolve(&self, header: &[String]) -> Result<ResolvedColumns, DashboardError> {
        let require = |name: &str| {
            if header.iter().any(|h| h == name) {
                Ok(name.to_string())
            } else {
                Err(DashboardError::MissingColumn {
                    name: name.to_string(),
                    available: header.to_vec(),
                })
            }
        };

        let code = require(&self.code)?;
        let year = require(&self.year)?;
        let value = match &self.value {
            Some(value) => require(value)?,
            None => {
                let mut candidates: Vec<String> = header
                    .iter()
                    .filter(|h| ![&self.entity, &self.code, &self.year].contains(h))
                    .cloned()
                    .collect();
                if candidates.len() != 1 {
                    return Err(DashboardError::AmbiguousValueColumn(candidates));
                }
                candidates.remove(0)
            }
        };

        Ok(ResolvedColumns { code, year, value })
    }
}

/// Long-form emissions: `code` (String), `year` (Int64), `co2` (Float64).
///
/// Only rows with a three character code survive loading, which drops the
/// regional aggregates that carry no ISO3 code.
#[derive(Debug, Clone)]
pub struct EmissionTable {
    frame: DataFrame,
    years: Vec<i64>,
}

impl EmissionTable {
    pub fn from_frame(raw: DataFrame, mapping: &ColumnMapping) -> anyhow::Result<Self> {
        let header: Vec<String> = raw
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let columns = mapping.resolve(&header)?;
        tracing::debug!(?columns, "resolved emissions columns");

        let frame = raw
            .lazy()
            .select([
                col(columns.code.as_str())
                    .cast(DataType::String)
                    .str()
                    .to_uppercase()
                    .alias("code"),
                col(columns.year.as_str()).cast(DataType::Int64).alias("year"),
                col(columns.value.as_str())
                    .cast(DataType::Float64)
                    .alias("co2"),
            ])
            .filter(col("code").str().len_chars().eq(lit(3)))
            .collect()
            .context("normalising emissions table")?;

        Self::from_normalised(frame)
    }

    pub fn from_csv_bytes(bytes: Vec<u8>, mapping: &ColumnMapping) -> anyhow::Result<Self> {
        let raw = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .context("parsing emissions CSV")?;
        Self::from_frame(raw, mapping)
    }

    pub fn from_records(records: &[EmissionRecord]) -> anyhow::Result<Self> {
        let frame = df!(
            "code" => records.iter().map(|r| r.code.to_uppercase()).collect::<Vec<_>>(),
            "year" => records.iter().map(|r| r.year).collect::<Vec<_>>(),
            "co2" => records.iter().map(|r| r.co2).collect::<Vec<_>>(),
        )?;
        Self::from_normalised(frame)
    }

    fn from_normalised(frame: DataFrame) -> anyhow::Result<Self> {
        let years: BTreeSet<i64> = frame.column("year")?.i64()?.into_iter().flatten().collect();
        Ok(Self {
            frame,
            years: years.into_iter().collect(),
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> &[i64] {
        &self.years
    }

    pub fn year_range(&self) -> Option<YearRange> {
        Some(YearRange {
            min: *self.years.first()?,
            max: *self.years.last()?,
        })
    }

    /// `preferred` when the data has it, otherwise the median distinct year.
    pub fn default_year(&self, preferred: i64) -> Option<i64> {
        if self.years.binary_search(&preferred).is_ok() {
            return Some(preferred);
        }
        self.years.get(self.years.len() / 2).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Entity,Code,Year,Annual CO2 emissions
Africa,,1950,100.0
World,OWID_WRL,1950,9000.0
France,FRA,1950,50.0
France,FRA,1951,55.0
United States,usa,1950,100.0
Atlantis,XX,1950,1.0
";

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infers_single_value_column() {
        let resolved = ColumnMapping::default()
            .resolve(&header(&["Entity", "Code", "Year", "Annual CO2 emissions"]))
            .unwrap();
        assert_eq!(resolved.value, "Annual CO2 emissions");
        assert_eq!(resolved.code, "Code");
    }

    #[test]
    fn test_inference_refuses_several_candidates() {
        let err = ColumnMapping::default()
            .resolve(&header(&["Entity", "Code", "Year", "co2", "co2_per_capita"]))
            .unwrap_err();
        assert!(matches!(err, DashboardError::AmbiguousValueColumn(c) if c.len() == 2));

        let err = ColumnMapping::default()
            .resolve(&header(&["Entity", "Code", "Year"]))
            .unwrap_err();
        assert!(matches!(err, DashboardError::AmbiguousValueColumn(c) if c.is_empty()));
    }

    #[test]
    fn test_explicit_value_column_is_validated() {
        let mapping = ColumnMapping {
            value: Some("co2".to_string()),
            ..Default::default()
        };
        let names = header(&["Entity", "Code", "Year", "co2", "co2_per_capita"]);
        assert_eq!(mapping.resolve(&names).unwrap().value, "co2");

        let mapping = ColumnMapping {
            value: Some("missing".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            mapping.resolve(&names),
            Err(DashboardError::MissingColumn { name, .. }) if name == "missing"
        ));
    }

    #[test]
    fn test_missing_code_column() {
        let err = ColumnMapping::default()
            .resolve(&header(&["Entity", "Year", "co2"]))
            .unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumn { name, .. } if name == "Code"));
    }

    #[test]
    fn test_load_keeps_only_iso3_codes() {
        let table =
            EmissionTable::from_csv_bytes(CSV.as_bytes().to_vec(), &ColumnMapping::default())
                .unwrap();
        let mut codes: Vec<String> = table
            .frame()
            .column("code")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        codes.sort();
        assert_eq!(codes, vec!["FRA", "FRA", "USA"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_codes_are_uppercased() {
        let table =
            EmissionTable::from_csv_bytes(CSV.as_bytes().to_vec(), &ColumnMapping::default())
                .unwrap();
        let usa = table
            .frame()
            .clone()
            .lazy()
            .filter(col("code").eq(lit("USA")))
            .collect()
            .unwrap();
        assert_eq!(usa.height(), 1);
        assert_eq!(usa.column("year").unwrap().i64().unwrap().get(0), Some(1950));
        assert_eq!(usa.column("co2").unwrap().f64().unwrap().get(0), Some(100.0));
    }

    #[test]
    fn test_years_and_default_year() {
        let table = EmissionTable::from_records(&[
            EmissionRecord::new("USA", 1949, 1.0),
            EmissionRecord::new("USA", 1951, 1.0),
            EmissionRecord::new("FRA", 1953, 1.0),
            EmissionRecord::new("FRA", 1951, 1.0),
        ])
        .unwrap();
        assert_eq!(table.years(), &[1949, 1951, 1953]);
        assert_eq!(
            table.year_range(),
            Some(YearRange {
                min: 1949,
                max: 1953
            })
        );
        // 1950 is absent, so the median distinct year is used
        assert_eq!(table.default_year(1950), Some(1951));
        assert_eq!(table.default_year(1953), Some(1953));
    }

    #[test]
    fn test_empty_table_has_no_default_year() {
        let table = EmissionTable::from_records(&[]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.year_range(), None);
        assert_eq!(table.default_year(1950), None);
    }
}
