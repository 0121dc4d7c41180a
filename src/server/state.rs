//! Application state for the dashboard server

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::config::{DashboardSettings, Settings};
use crate::dashboard::{self, Artifacts, DashboardData, DashboardState};
use crate::ranking::TopN;
use crate::render::RenderOptions;
use crate::upload::UploadedTable;

/// Dashboard server state
#[derive(Clone)]
pub struct AppState {
    /// Immutable datasets loaded at startup
    pub data: Arc<DashboardData>,
    pub render: Arc<RenderOptions>,
    pub defaults: DashboardSettings,
    /// Most recent render; reused while the selection does not change
    last: Arc<Mutex<Option<Arc<Artifacts>>>>,
    /// The session's uploaded CSV, if any
    pub upload: Arc<RwLock<Option<UploadedTable>>>,
    pub version: String,
}

impl AppState {
    pub fn new(data: DashboardData, settings: &Settings) -> Self {
        Self {
            data: Arc::new(data),
            render: Arc::new(settings.render.clone()),
            defaults: settings.dashboard.clone(),
            last: Arc::new(Mutex::new(None)),
            upload: Arc::new(RwLock::new(None)),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn default_year(&self) -> i64 {
        self.data
            .emissions
            .default_year(self.defaults.default_year)
            .unwrap_or(self.defaults.default_year)
    }

    pub fn default_top_n(&self) -> TopN {
        TopN::new(self.defaults.default_top_n).unwrap_or_default()
    }

    /// Artifacts for `state`, rendering only when it differs from the last one.
    pub async fn artifacts(&self, state: DashboardState) -> anyhow::Result<Arc<Artifacts>> {
        let mut last = self.last.lock().await;
        if let Some(artifacts) = last.as_ref().filter(|a| a.state == state) {
            tracing::debug!(?state, "reusing last render");
            return Ok(artifacts.clone());
        }

        let data = self.data.clone();
        let options = self.render.clone();
        let artifacts = tokio::task::spawn_blocking(move || {
            dashboard::render(&state, &data, &options)
        })
        .await??;
        tracing::debug!(?state, "rendered dashboard");

        let artifacts = Arc::new(artifacts);
        *last = Some(artifacts.clone());
        Ok(artifacts)
    }
}
