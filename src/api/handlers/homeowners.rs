//! Homeowner analytics handlers: listing, KPIs, rankings, and breakdowns.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{FilterQuery, MaybeEmpty, RadarQuery, RegionQuery};
use crate::app_state::AppState;
use crate::domain::Homeowner;
use crate::domain::aggregate::{Kpis, Radar, RegionOptions, SubRegionRevenue, Summary, TradeCount};
use crate::error::{ApiError, ErrorResponse};

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(inner)| inner)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

/// `GET /homeowners` — Every customer record.
#[utoipa::path(
    get,
    path = "/homeowners",
    tag = "Homeowners",
    summary = "List all homeowners",
    description = "Returns every record of the cached snapshot. Absent fields are null.",
    responses(
        (status = 200, description = "All records", body = Vec<Homeowner>),
    )
)]
pub async fn list_homeowners(State(state): State<AppState>) -> impl IntoResponse {
    let dataset = state.homeowner_service.list_all().await;
    Json(dataset.records()).into_response()
}

/// `GET /homeowners/kpis` — KPI card figures.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] if the query string is malformed.
#[utoipa::path(
    get,
    path = "/homeowners/kpis",
    tag = "Homeowners",
    summary = "KPI figures",
    description = "Customer count, mean RFMD score, spend and frequency, top trade and region over the filtered customers. An empty object when nothing matches.",
    params(FilterQuery),
    responses(
        (status = 200, description = "KPI object, or {} when empty", body = Kpis),
        (status = 400, description = "Malformed query", body = ErrorResponse),
    )
)]
pub async fn kpis(
    State(state): State<AppState>,
    params: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query(params)?;
    let kpis = state.homeowner_service.kpis(&params.filter()).await;
    Ok(Json(MaybeEmpty::from(kpis)))
}

/// `GET /homeowners/top10` — Highest-scoring customers.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] if the query string is malformed.
#[utoipa::path(
    get,
    path = "/homeowners/top10",
    tag = "Homeowners",
    summary = "Top 10 customers by RFMD score",
    description = "Filtered customers sorted by RFMD_score descending, equal scores in load order. \
        Each row is a Homeowner object plus every extra source column as an additional key \
        (names normalized, spaces as underscores), except the legacy `area` column.",
    params(FilterQuery),
    responses(
        (status = 200, description = "Up to ten Homeowner records, each with any extra source columns as additional keys", body = Vec<Homeowner>),
        (status = 400, description = "Malformed query", body = ErrorResponse),
    )
)]
pub async fn top10(
    State(state): State<AppState>,
    params: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query(params)?;
    Ok(Json(state.homeowner_service.top10(&params.filter()).await))
}

/// `GET /homeowners/radar` — Average R/F/M/D scores.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] if the query string is malformed.
#[utoipa::path(
    get,
    path = "/homeowners/radar",
    tag = "Homeowners",
    summary = "Radar chart scores",
    description = "Per-segment averages for a known segment, otherwise the mean of the per-segment averages.",
    params(RadarQuery),
    responses(
        (status = 200, description = "Four labels and four scores", body = Radar),
        (status = 400, description = "Malformed query", body = ErrorResponse),
    )
)]
pub async fn radar(
    State(state): State<AppState>,
    params: Result<Query<RadarQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query(params)?;
    let radar = state
        .homeowner_service
        .radar(params.segment.as_deref())
        .await;
    Ok(Json(radar))
}

/// `GET /homeowners/tradecounts` — Customers per trade.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] if the query string is malformed.
#[utoipa::path(
    get,
    path = "/homeowners/tradecounts",
    tag = "Homeowners",
    summary = "Trade counts by region",
    description = "Counts customers per trade after exact segment, region and sub-region filtering. `All`, `All Regions` and `All Sub-Regions` disable a filter.",
    params(FilterQuery),
    responses(
        (status = 200, description = "Trade counts, most frequent first", body = Vec<TradeCount>),
        (status = 400, description = "Malformed query", body = ErrorResponse),
    )
)]
pub async fn trade_counts(
    State(state): State<AppState>,
    params: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query(params)?;
    let counts = state
        .homeowner_service
        .trade_counts(&params.filter())
        .await;
    Ok(Json(counts))
}

/// `GET /homeowners/summary` — Summary box figures.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] if the query string is malformed.
#[utoipa::path(
    get,
    path = "/homeowners/summary",
    tag = "Homeowners",
    summary = "Summary figures",
    description = "KPI figures plus the best segment by mean RFMD score, the highest and lowest regions by total spend and the total RFMD score, over the filtered customers. An empty object when nothing matches.",
    params(FilterQuery),
    responses(
        (status = 200, description = "Summary object, or {} when empty", body = Summary),
        (status = 400, description = "Malformed query", body = ErrorResponse),
    )
)]
pub async fn summary(
    State(state): State<AppState>,
    params: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query(params)?;
    let summary = state.homeowner_service.summary(&params.filter()).await;
    Ok(Json(MaybeEmpty::from(summary)))
}

/// `GET /homeowners/segments` — Segment filter options.
#[utoipa::path(
    get,
    path = "/homeowners/segments",
    tag = "Homeowners",
    summary = "List segments",
    description = "Distinct segment labels in order of first appearance.",
    responses(
        (status = 200, description = "Segment labels", body = Vec<String>),
    )
)]
pub async fn segments(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.homeowner_service.segments().await)
}

/// `GET /homeowners/regions` — Region and sub-region filter options.
#[utoipa::path(
    get,
    path = "/homeowners/regions",
    tag = "Homeowners",
    summary = "List regions",
    description = "Every region with its sorted sub-regions.",
    responses(
        (status = 200, description = "Region options", body = Vec<RegionOptions>),
    )
)]
pub async fn regions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.homeowner_service.regions().await)
}

/// `GET /homeowners/subregion-revenue` — Revenue extremes by sub-region.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] if the query string is malformed.
#[utoipa::path(
    get,
    path = "/homeowners/subregion-revenue",
    tag = "Homeowners",
    summary = "Sub-region revenue extremes",
    description = "Highest and lowest total spend by sub-region, optionally within one segment and region. An empty object when no sub-region matches.",
    params(RegionQuery),
    responses(
        (status = 200, description = "Revenue extremes, or {} when empty", body = SubRegionRevenue),
        (status = 400, description = "Malformed query", body = ErrorResponse),
    )
)]
pub async fn sub_region_revenue(
    State(state): State<AppState>,
    params: Result<Query<RegionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query(params)?;
    let revenue = state
        .homeowner_service
        .sub_region_revenue(&params.filter())
        .await;
    Ok(Json(MaybeEmpty::from(revenue)))
}

/// Homeowner routes mounted under `/homeowners`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/homeowners", get(list_homeowners))
        .route("/homeowners/kpis", get(kpis))
        .route("/homeowners/top10", get(top10))
        .route("/homeowners/radar", get(radar))
        .route("/homeowners/tradecounts", get(trade_counts))
        .route("/homeowners/summary", get(summary))
        .route("/homeowners/segments", get(segments))
        .route("/homeowners/regions", get(regions))
        .route("/homeowners/subregion-revenue", get(sub_region_revenue))
}
