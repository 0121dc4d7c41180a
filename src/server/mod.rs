//! Dashboard HTTP server
//!
//! ## Endpoints
//! - GET /?year=&top_n= - Dashboard page
//! - GET /api/years - Years present in the data
//! - GET /api/years/:year?top_n= - Joined table, partitions and top-N
//! - GET /map.svg?year= - Choropleth
//! - GET /bar.svg?year=&top_n= - Top-N bar chart
//! - GET /geojson - Master geometries keyed by code
//! - GET /upload?x=&y= - Upload page and chart
//! - POST /upload - Upload a CSV (multipart field `file`)
//! - POST /upload/clear - Forget the uploaded CSV
//! - GET /health - Health check

pub mod page;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ServerSettings;
pub use state::AppState;

const UPLOAD_LIMIT: usize = 64 * 1024 * 1024;

/// Create the dashboard router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::dashboard))
        .route("/health", get(routes::health))
        .route("/api/years", get(routes::years))
        .route("/api/years/:year", get(routes::year))
        .route("/map.svg", get(routes::map_svg))
        .route("/bar.svg", get(routes::bar_svg))
        .route("/geojson", get(routes::geojson))
        .route(
            "/upload",
            get(routes::upload_page)
                .post(routes::upload_file)
                .layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/upload/clear", post(routes::clear_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the dashboard server until the process is stopped
pub async fn run_server(settings: &ServerSettings, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    let router = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("CO₂ dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;

    Ok(())
}
