//! Dashboard route handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use co2_records::CountryEmission;
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

use super::page::{self, UploadView};
use super::state::AppState;
use crate::dashboard::DashboardState;
use crate::error::{DashboardError, DashboardResult};
use crate::ranking::TopN;
use crate::render::render_bar_chart;
use crate::upload::{UploadedTable, PREVIEW_ROWS};

#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    pub year: Option<i64>,
    pub top_n: Option<usize>,
}

impl SelectionQuery {
    fn resolve(&self, state: &AppState) -> DashboardResult<DashboardState> {
        Ok(DashboardState {
            year: self.year.unwrap_or_else(|| state.default_year()),
            top_n: match self.top_n {
                Some(n) => TopN::new(n)?,
                None => state.default_top_n(),
            },
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub countries: usize,
    pub records: usize,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct YearsResponse {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub default: i64,
    pub years: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct YearResponse {
    pub year: i64,
    pub top_n: usize,
    /// Every master country, in master order
    pub rows: Vec<CountryEmission>,
    pub has_data: Vec<String>,
    pub no_data: Vec<String>,
    pub top: Vec<CountryEmission>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        countries: state.data.master.len(),
        records: state.data.emissions.len(),
        version: state.version.clone(),
    })
}

pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> DashboardResult<Html<String>> {
    let selection = query.resolve(&state)?;
    let artifacts = state.artifacts(selection).await?;
    Ok(Html(page::dashboard(&artifacts, state.data.year_range())))
}

pub async fn years(State(state): State<AppState>) -> Json<YearsResponse> {
    let range = state.data.year_range();
    Json(YearsResponse {
        min: range.map(|r| r.min),
        max: range.map(|r| r.max),
        default: state.default_year(),
        years: state.data.emissions.years().to_vec(),
    })
}

pub async fn year(
    State(state): State<AppState>,
    Path(year): Path<i64>,
    Query(query): Query<SelectionQuery>,
) -> DashboardResult<Json<YearResponse>> {
    let selection = SelectionQuery {
        year: Some(year),
        top_n: query.top_n,
    }
    .resolve(&state)?;
    let artifacts = state.artifacts(selection).await?;

    let codes = |rows: Vec<&CountryEmission>| -> Vec<String> {
        rows.into_iter().map(|r| r.code.clone()).collect()
    };
    Ok(Json(YearResponse {
        year,
        top_n: selection.top_n.get(),
        rows: artifacts.joined.rows.clone(),
        has_data: codes(artifacts.joined.has_data().collect()),
        no_data: codes(artifacts.joined.no_data().collect()),
        top: artifacts.top().to_vec(),
    }))
}

fn svg(body: String) -> Response {
    ([(header::CONTENT_TYPE, "image/svg+xml")], body).into_response()
}

pub async fn map_svg(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> DashboardResult<Response> {
    let artifacts = state.artifacts(query.resolve(&state)?).await?;
    Ok(svg(artifacts.map_svg.clone()))
}

pub async fn bar_svg(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> DashboardResult<Response> {
    let artifacts = state.artifacts(query.resolve(&state)?).await?;
    Ok(svg(artifacts.bar_svg.clone()))
}

pub async fn geojson(State(state): State<AppState>) -> Json<FeatureCollection> {
    Json(state.data.master.geojson().clone())
}

#[derive(Debug, Default, Deserialize)]
pub struct AxesQuery {
    pub x: Option<String>,
    pub y: Option<String>,
}

pub async fn upload_page(
    State(state): State<AppState>,
    Query(query): Query<AxesQuery>,
) -> DashboardResult<Html<String>> {
    let upload = state.upload.read().await;
    let Some(table) = upload.as_ref() else {
        return Ok(Html(page::upload(None)));
    };

    let columns = table.columns();
    let (default_x, default_y) = table.default_axes().unwrap_or_default();
    let x = query.x.unwrap_or(default_x);
    let y = query.y.unwrap_or(default_y);

    let chart = table.bar_chart(&x, &y)?;
    let chart_svg = render_bar_chart(&chart, state.render.bar_width, state.render.bar_height)?;
    let preview = table.preview(PREVIEW_ROWS)?;

    Ok(Html(page::upload(Some(UploadView {
        file_name: &table.file_name,
        rows: table.height(),
        columns: &columns,
        preview: &preview,
        x: &x,
        y: &y,
        chart_svg: &chart_svg,
    }))))
}

pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> DashboardResult<Redirect> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DashboardError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| DashboardError::BadRequest(e.to_string()))?;
        let table = UploadedTable::from_csv_bytes(file_name, bytes.to_vec())
            .map_err(|e| DashboardError::BadRequest(format!("{e:#}")))?;

        *state.upload.write().await = Some(table);
        return Ok(Redirect::to("/upload"));
    }

    Err(DashboardError::BadRequest("missing `file` field".to_string()))
}

pub async fn clear_upload(State(state): State<AppState>) -> DashboardResult<Redirect> {
    if state.upload.write().await.take().is_none() {
        return Err(DashboardError::NoUpload);
    }
    Ok(Redirect::to("/upload"))
}
