use serde::{Deserialize, Serialize};

/// One (country, year) observation from the emissions table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    // ISO3, upper-cased
    pub code: String,
    pub year: i64,
    // Absolute emissions for the year. Not checked for sign.
    pub co2: f64,
}

impl EmissionRecord {
    pub fn new(code: impl Into<String>, year: i64, co2: f64) -> Self {
        Self {
            code: code.into(),
            year,
            co2,
        }
    }
}

/// A master country joined with its emissions for one year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountryEmission {
    pub code: String,
    pub country: String,
    // None when the country has no record for the year
    pub co2: Option<f64>,
}

impl CountryEmission {
    pub fn has_data(&self) -> bool {
        self.co2.is_some()
    }
}

/// Inclusive span of years present in an emissions table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i64,
    pub max: i64,
}

impl YearRange {
    pub fn contains(&self, year: i64) -> bool {
        (self.min..=self.max).contains(&year)
    }
}
