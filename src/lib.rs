//! Per-year CO₂ choropleth and top-N ranking over a country boundary master.
//!
//! Both datasets are loaded once (see [`getter::Getter`]), joined per year by
//! [`yearly::CO2YearlyMapBuilder`] and drawn to SVG by [`render`]. The
//! [`server`] module serves them as an interactive dashboard.

pub mod boundaries;
pub mod config;
pub mod dashboard;
pub mod emissions;
pub mod error;
pub mod getter;
pub mod ranking;
pub mod render;
pub mod server;
pub mod sources;
pub mod telemetry;
pub mod upload;
pub mod yearly;

pub use boundaries::{Country, CountryMaster};
pub use dashboard::{render, Artifacts, DashboardData, DashboardState};
pub use emissions::{ColumnMapping, EmissionTable};
pub use error::{DashboardError, DashboardResult};
pub use ranking::TopN;
pub use yearly::{CO2YearlyMapBuilder, YearlyJoinResult};
