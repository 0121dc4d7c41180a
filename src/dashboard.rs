//! Dashboard state and the pure render from (state, data) to artifacts.

use anyhow::bail;
use co2_records::{CountryEmission, YearRange};
use serde::{Deserialize, Serialize};

use crate::boundaries::CountryMaster;
use crate::config::Settings;
use crate::emissions::EmissionTable;
use crate::getter::{attributes_dataframe, Getter};
use crate::ranking::{self, TopN};
use crate::render::{self, Bar, BarChart, RenderOptions};
use crate::yearly::{CO2YearlyMapBuilder, YearlyJoinResult};

/// Both datasets, loaded once at startup and shared read-only afterwards.
#[derive(Debug)]
pub struct DashboardData {
    pub master: CountryMaster,
    pub emissions: EmissionTable,
}

impl DashboardData {
    pub fn new(master: CountryMaster, emissions: EmissionTable) -> Self {
        Self { master, emissions }
    }

    /// Fetches both datasets through `getter` and normalises them.
    pub async fn load(getter: &dyn Getter, settings: &Settings) -> anyhow::Result<Self> {
        let (boundaries, raw) = tokio::try_join!(getter.boundaries(), getter.emissions())?;
        let master = CountryMaster::from_features(
            &boundaries,
            &settings.data.code_attribute,
            &settings.data.name_attribute,
        )?;
        if master.is_empty() {
            let attributes = attributes_dataframe(&boundaries)?;
            bail!(
                "no boundary feature has a `{}` attribute, available: {:?}",
                settings.data.code_attribute,
                attributes.get_column_names()
            );
        }
        let emissions = EmissionTable::from_frame(raw, &settings.data.columns)?;
        tracing::info!(
            countries = master.len(),
            records = emissions.len(),
            years = ?emissions.year_range(),
            "datasets loaded"
        );
        Ok(Self::new(master, emissions))
    }

    pub fn builder(&self) -> CO2YearlyMapBuilder<'_> {
        CO2YearlyMapBuilder::new(&self.master, &self.emissions)
    }

    pub fn year_range(&self) -> Option<YearRange> {
        self.emissions.year_range()
    }
}

/// What the user has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DashboardState {
    pub year: i64,
    pub top_n: TopN,
}

/// Everything a dashboard page shows for one state.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub state: DashboardState,
    pub joined: YearlyJoinResult,
    /// Every country with data, largest first.
    pub ranking: Vec<CountryEmission>,
    pub map_svg: String,
    pub bar_svg: String,
}

impl Artifacts {
    pub fn top(&self) -> &[CountryEmission] {
        let n = self.state.top_n.get().min(self.ranking.len());
        &self.ranking[..n]
    }
}

/// Joins the selected year, ranks it and draws both charts.
pub fn render(
    state: &DashboardState,
    data: &DashboardData,
    options: &RenderOptions,
) -> anyhow::Result<Artifacts> {
    let joined = data.builder().join_year(state.year)?;
    let ranking = ranking::ranked(&joined);
    let map_svg = render::render_choropleth(&joined, &data.master, options)?;

    let top = ranking::top_n(&joined, state.top_n);
    let bar_svg = render::render_bar_chart(
        &top_chart(state, &top),
        options.bar_width,
        options.bar_height,
    )?;

    Ok(Artifacts {
        state: *state,
        joined,
        ranking,
        map_svg,
        bar_svg,
    })
}

pub fn top_chart(state: &DashboardState, top: &[CountryEmission]) -> BarChart {
    BarChart {
        title: format!(
            "Top {} CO₂ emitting countries in {}",
            state.top_n.get(),
            state.year
        ),
        x_label: "Country".to_string(),
        y_label: "CO₂ emissions".to_string(),
        bars: top
            .iter()
            .map(|row| Bar {
                label: row.country.clone(),
                value: row.co2.unwrap_or_default(),
            })
            .collect(),
    }
}
