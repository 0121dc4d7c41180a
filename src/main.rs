use anyhow::Context;
use co2map::config::Settings;
use co2map::server::{self, AppState};
use co2map::sources::DatasetFiles;
use co2map::{telemetry, DashboardData};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let _guard = telemetry::init(&settings.log);

    let files = DatasetFiles::from(&settings.data);
    let data = DashboardData::load(&files, &settings)
        .await
        .context("loading datasets")?;

    let state = AppState::new(data, &settings);
    server::run_server(&settings.server, state).await
}
