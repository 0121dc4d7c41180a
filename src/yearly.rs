use anyhow::Context;
use co2_records::CountryEmission;
use polars::prelude::*;
use serde::Serialize;

use crate::boundaries::CountryMaster;
use crate::emissions::EmissionTable;

/// Every master country exactly once, in master order, with its summed
/// emissions for one year (`None` when it has no record that year).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyJoinResult {
    pub year: i64,
    pub rows: Vec<CountryEmission>,
}

impl YearlyJoinResult {
    pub fn has_data(&self) -> impl Iterator<Item = &CountryEmission> {
        self.rows.iter().filter(|r| r.has_data())
    }

    pub fn no_data(&self) -> impl Iterator<Item = &CountryEmission> {
        self.rows.iter().filter(|r| !r.has_data())
    }

    /// Smallest and largest emissions among countries with data.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.has_data()
            .filter_map(|r| r.co2)
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Joins a year of emissions onto the country master.
///
/// Holds borrowed, read-only tables; building a year never mutates them.
pub struct CO2YearlyMapBuilder<'a> {
    master: &'a CountryMaster,
    emissions: &'a EmissionTable,
}

impl<'a> CO2YearlyMapBuilder<'a> {
    pub fn new(master: &'a CountryMaster, emissions: &'a EmissionTable) -> Self {
        Self { master, emissions }
    }

    /// Sums duplicate (code, year) rows, then left-joins onto the master.
    pub fn join_year(&self, year: i64) -> anyhow::Result<YearlyJoinResult> {
        let per_year = self
            .emissions
            .frame()
            .clone()
            .lazy()
            .filter(col("year").eq(lit(year)))
            .group_by([col("code")])
            .agg([col("co2").sum(), col("co2").len().alias("records")]);

        let joined = self
            .master
            .frame()
            .clone()
            .lazy()
            .with_row_index("position", None)
            .left_join(per_year, col("code"), col("code"))
            .sort(["position"], SortMultipleOptions::default())
            .collect()
            .with_context(|| format!("joining emissions for {year}"))?;

        let codes = joined.column("code")?.str()?;
        let countries = joined.column("country")?.str()?;
        let values = joined.column("co2")?.f64()?;
        let records = joined.column("records")?.cast(&DataType::UInt64)?;
        let folded: u64 = records
            .u64()?
            .into_iter()
            .flatten()
            .map(|n| n.saturating_sub(1))
            .sum();
        if folded > 0 {
            tracing::debug!(year, folded, "summed duplicate emission rows");
        }

        let rows = codes
            .into_iter()
            .zip(countries)
            .zip(values)
            .map(|((code, country), co2)| CountryEmission {
                code: code.unwrap_or_default().to_string(),
                country: country.unwrap_or_default().to_string(),
                co2,
            })
            .collect::<Vec<_>>();

        debug_assert_eq!(rows.len(), self.master.len());
        Ok(YearlyJoinResult { year, rows })
    }
}
