use co2_records::CountryEmission;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::yearly::YearlyJoinResult;

/// Number of bars in the ranking chart, always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct TopN(usize);

impl TopN {
    pub const MIN: usize = 5;
    pub const MAX: usize = 30;

    pub fn new(n: usize) -> Result<Self, DashboardError> {
        if (Self::MIN..=Self::MAX).contains(&n) {
            Ok(Self(n))
        } else {
            Err(DashboardError::TopNOutOfRange {
                value: n,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for TopN {
    fn default() -> Self {
        Self(10)
    }
}

impl TryFrom<usize> for TopN {
    type Error = DashboardError;

    fn try_from(n: usize) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<TopN> for usize {
    fn from(n: TopN) -> Self {
        n.0
    }
}

/// Countries with data for the year, largest emitter first. Ties keep
/// master order.
pub fn ranked(result: &YearlyJoinResult) -> Vec<CountryEmission> {
    let mut rows: Vec<CountryEmission> = result.has_data().cloned().collect();
    rows.sort_by(|a, b| {
        let (a, b) = (a.co2.unwrap_or_default(), b.co2.unwrap_or_default());
        b.total_cmp(&a)
    });
    rows
}

/// The first `n` of [`ranked`].
pub fn top_n(result: &YearlyJoinResult, n: TopN) -> Vec<CountryEmission> {
    let mut rows = ranked(result);
    rows.truncate(n.get());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, co2: Option<f64>) -> CountryEmission {
        CountryEmission {
            code: code.to_string(),
            country: format!("Country {code}"),
            co2,
        }
    }

    fn result(rows: Vec<CountryEmission>) -> YearlyJoinResult {
        YearlyJoinResult { year: 1950, rows }
    }

    #[test]
    fn test_bounds() {
        assert!(TopN::new(4).is_err());
        assert_eq!(TopN::new(5).unwrap().get(), 5);
        assert_eq!(TopN::new(30).unwrap().get(), 30);
        assert!(matches!(
            TopN::new(31),
            Err(DashboardError::TopNOutOfRange { value: 31, .. })
        ));
        assert_eq!(TopN::default().get(), 10);
    }

    #[test]
    fn test_deserialize_validates() {
        let n: TopN = serde_json::from_str("12").unwrap();
        assert_eq!(n.get(), 12);
        assert!(serde_json::from_str::<TopN>("2").is_err());
    }

    #[test]
    fn test_top_n_skips_missing_and_sorts_descending() {
        let result = result(vec![
            row("FRA", Some(50.0)),
            row("XXX", None),
            row("USA", Some(100.0)),
            row("DEU", Some(70.0)),
        ]);
        let top = top_n(&result, TopN::new(5).unwrap());
        let codes: Vec<&str> = top.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["USA", "DEU", "FRA"]);
    }

    #[test]
    fn test_length_is_min_of_n_and_has_data() {
        let rows: Vec<CountryEmission> = (0..40)
            .map(|i| row(&format!("C{i:02}"), Some(i as f64)))
            .collect();
        let many = result(rows);
        for n in [5, 10, 30] {
            let top = top_n(&many, TopN::new(n).unwrap());
            assert_eq!(top.len(), n);
            assert!(top.windows(2).all(|w| w[0].co2 >= w[1].co2));
        }

        let small = result(vec![row("USA", Some(1.0)), row("XXX", None)]);
        assert_eq!(top_n(&small, TopN::default()).len(), 1);
    }

    #[test]
    fn test_ties_keep_master_order() {
        let result = result(vec![
            row("AAA", Some(5.0)),
            row("BBB", Some(9.0)),
            row("CCC", Some(5.0)),
        ]);
        let codes: Vec<String> = ranked(&result).into_iter().map(|r| r.code).collect();
        assert_eq!(codes, vec!["BBB", "AAA", "CCC"]);
    }

    #[test]
    fn test_empty_year_ranks_nothing() {
        let result = result(vec![row("USA", None), row("FRA", None)]);
        assert!(top_n(&result, TopN::default()).is_empty());
    }
}
