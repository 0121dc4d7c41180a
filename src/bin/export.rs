use std::path::Path;

use anyhow::{bail, Context};
use co2map::config::Settings;
use co2map::sources::DatasetFiles;
use co2map::{render, telemetry, DashboardData, DashboardState, TopN};
use geojson::{Feature, FeatureCollection, GeoJson};
use polars::prelude::*;

fn write_df(path: &Path, df: &mut DataFrame) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let _guard = telemetry::init(&settings.log);

    let files = DatasetFiles::from(&settings.data);
    let data = DashboardData::load(&files, &settings).await?;

    let year = match std::env::args().nth(1) {
        Some(arg) => arg.parse().with_context(|| format!("`{arg}` is not a year"))?,
        None => match data.emissions.default_year(settings.dashboard.default_year) {
            Some(year) => year,
            None => bail!("the emissions table is empty"),
        },
    };
    let state = DashboardState {
        year,
        top_n: TopN::new(settings.dashboard.default_top_n)?,
    };
    let artifacts = render(&state, &data, &settings.render)?;

    let out = Path::new(&settings.export.directory);
    std::fs::create_dir_all(out)?;

    // Joined table
    let rows = &artifacts.joined.rows;
    let mut joined = df!(
        "code" => rows.iter().map(|r| r.code.as_str()).collect::<Vec<_>>(),
        "country" => rows.iter().map(|r| r.country.as_str()).collect::<Vec<_>>(),
        "co2" => rows.iter().map(|r| r.co2).collect::<Vec<_>>(),
    )?;
    write_df(&out.join(format!("joined_{year}.csv")), &mut joined)?;

    // Charts
    std::fs::write(out.join(format!("map_{year}.svg")), &artifacts.map_svg)?;
    std::fs::write(out.join(format!("bar_{year}.svg")), &artifacts.bar_svg)?;

    // Master geometries with the year's emissions attached
    let mut features: Vec<Feature> = Vec::with_capacity(rows.len());
    for (feature, row) in data.master.geojson().features.iter().zip(rows) {
        let mut feature = feature.clone();
        feature.set_property("co2", row.co2);
        features.push(feature);
    }
    let geojson = GeoJson::from(features.into_iter().collect::<FeatureCollection>());
    std::fs::write(out.join(format!("co2_{year}.geojson")), geojson.to_string())?;

    tracing::info!(
        year,
        directory = %out.display(),
        with_data = artifacts.ranking.len(),
        without_data = artifacts.joined.no_data().count(),
        "exported"
    );
    Ok(())
}
