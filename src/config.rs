use serde::Deserialize;

use crate::emissions::ColumnMapping;
use crate::render::RenderOptions;

/// Environment variable naming the settings file.
pub const CONFIG_PATH_VAR: &str = "CO2MAP_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "co2map.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub server: ServerSettings,
    pub dashboard: DashboardSettings,
    pub render: RenderOptions,
    pub log: LogSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Shapefile, GeoJSON or a zip of either. Local path or http(s) URL.
    pub boundaries: String,
    /// Emissions CSV. Local path or http(s) URL.
    pub emissions: String,
    /// Boundary attribute holding the ISO3 code.
    pub code_attribute: String,
    /// Boundary attribute holding the display name.
    pub name_attribute: String,
    pub columns: ColumnMapping,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            boundaries: "data/ne_50m_admin_0_countries.shp".to_string(),
            emissions: "data/annual-co2-emissions-per-country.csv".to_string(),
            code_attribute: "ISO_A3".to_string(),
            name_attribute: "NAME".to_string(),
            columns: ColumnMapping::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// Used when present in the data, otherwise the median year is used.
    pub default_year: i64,
    pub default_top_n: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            default_year: 1950,
            default_top_n: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Fallback filter when RUST_LOG is unset.
    pub filter: String,
    /// Writes a daily rolling log file here when set.
    pub directory: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub directory: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            directory: "out".to_string(),
        }
    }
}

impl Settings {
    /// Loads `.env`, then the settings file named by `CO2MAP_CONFIG` (optional),
    /// then `CO2MAP__SECTION__FIELD` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(&path)
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("CO2MAP")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}
