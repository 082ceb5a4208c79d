use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::{error::ApiError, response::ApiResponse},
    auth::AuthBearer,
    network::{catalog, render, NetworkStats, RegionCounts},
    session::{AppState, ScenarioReply, SessionStatus},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/cases", get(list_cases))
        .route("/load", post(load_case))
        .route("/query", post(process_query))
        .route("/scenario", post(modify_scenario))
        .route("/chat", post(chat))
        .route("/status", get(get_status))
        .route("/regions/:id", get(get_region))
        .with_state(state)
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn list_cases() -> Json<ApiResponse<Vec<&'static str>>> {
    Json(ApiResponse::success(catalog::CASES.to_vec()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoadCaseRequest {
    #[validate(length(min = 1))]
    pub case: String,
}

#[derive(Debug, Serialize)]
pub struct LoadCaseResponse {
    pub case: String,
    pub stats: NetworkStats,
}

pub async fn load_case(
    State(st): State<AppState>,
    _: AuthBearer,
    Json(req): Json<LoadCaseRequest>,
) -> Result<Json<ApiResponse<LoadCaseResponse>>, ApiError> {
    req.validate()?;
    let stats = st.session.load_case(&req.case).await?;
    Ok(Json(ApiResponse::success(LoadCaseResponse {
        case: req.case,
        stats,
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1))]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
}

pub async fn process_query(
    State(st): State<AppState>,
    _: AuthBearer,
    Json(req): Json<QueryRequest>,
) -> Result<Json<ApiResponse<QueryResponse>>, ApiError> {
    req.validate()?;
    let answer = st
        .session
        .process_query(&req.question)
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;
    Ok(Json(ApiResponse::success(QueryResponse { answer })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScenarioRequest {
    #[validate(length(min = 1))]
    pub instruction: String,
    /// Override the configured commit policy for this run.
    pub commit: Option<bool>,
}

pub async fn modify_scenario(
    State(st): State<AppState>,
    _: AuthBearer,
    Json(req): Json<ScenarioRequest>,
) -> Result<Json<ApiResponse<ScenarioReply>>, ApiError> {
    req.validate()?;
    let reply = st.session.modify_scenario(&req.instruction, req.commit).await;
    Ok(Json(ApiResponse::success(reply)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub stats: NetworkStats,
}

/// Keyword-routed chat entry point: mutation verbs go to the scenario
/// engine, everything else to the regional map-reduce.
pub async fn chat(
    State(st): State<AppState>,
    _: AuthBearer,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatResponse>>, ApiError> {
    req.validate()?;
    let response = st
        .session
        .handle(&req.message)
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;
    let stats = st.session.status().await.network;
    Ok(Json(ApiResponse::success(ChatResponse { response, stats })))
}

pub async fn get_status(
    State(st): State<AppState>,
    _: AuthBearer,
) -> Json<ApiResponse<SessionStatus>> {
    Json(ApiResponse::success(st.session.status().await))
}

#[derive(Debug, Serialize)]
pub struct RegionSummary {
    pub counts: RegionCounts,
    pub rendered: String,
}

pub async fn get_region(
    State(st): State<AppState>,
    _: AuthBearer,
    Path(region_id): Path<i64>,
) -> Result<Json<ApiResponse<RegionSummary>>, ApiError> {
    if region_id < 0 || region_id >= st.session.regions() as i64 {
        return Err(ApiError::NotFound(format!("region {region_id}")));
    }
    let view = st.session.region_view(region_id).await;
    Ok(Json(ApiResponse::success(RegionSummary {
        counts: view.counts(),
        rendered: render(&view),
    })))
}
