use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::Result,
    middleware::auth::Claims,
    services::interview_service::{InterviewFilter, ScheduleInterview, SubmitFeedback},
    AppState,
};

#[axum::debug_handler]
pub async fn schedule_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ScheduleInterview>,
) -> Result<impl IntoResponse> {
    let interview = state
        .interview_service
        .schedule(claims.user_id()?, claims.role(), payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "data": interview})),
    ))
}

#[axum::debug_handler]
pub async fn list_interviews(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<InterviewFilter>,
) -> Result<impl IntoResponse> {
    let interviews = state
        .interview_service
        .list(claims.user_id()?, claims.role(), filter)
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": interviews.len(),
        "data": interviews,
    })))
}

#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let interview = state
        .interview_service
        .get(id, claims.user_id()?, claims.role())
        .await?;
    let history = state.interview_service.reschedule_history(id).await?;
    Ok(Json(json!({
        "success": true,
        "data": interview,
        "reschedule_history": history,
    })))
}

#[axum::debug_handler]
pub async fn interview_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let token = state
        .interview_service
        .issue_token(id, claims.user_id()?)
        .await?;
    Ok(Json(json!({"success": true, "data": token})))
}

#[axum::debug_handler]
pub async fn submit_feedback(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitFeedback>,
) -> Result<impl IntoResponse> {
    let interview = state
        .interview_service
        .submit_feedback(id, claims.user_id()?, payload)
        .await?;
    Ok(Json(json!({"success": true, "data": interview})))
}

#[derive(Debug, Deserialize)]
pub struct ReschedulePayload {
    pub new_date: DateTime<Utc>,
    pub reason: Option<String>,
}

#[axum::debug_handler]
pub async fn reschedule_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReschedulePayload>,
) -> Result<impl IntoResponse> {
    let interview = state
        .interview_service
        .reschedule(id, claims.user_id()?, payload.new_date, payload.reason)
        .await?;
    Ok(Json(json!({"success": true, "data": interview})))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelPayload {
    pub reason: Option<String>,
}

#[axum::debug_handler]
pub async fn cancel_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CancelPayload>>,
) -> Result<impl IntoResponse> {
    let reason = payload.and_then(|Json(p)| p.reason);
    state
        .interview_service
        .cancel(id, claims.user_id()?, claims.role(), reason)
        .await?;
    Ok(Json(
        json!({"success": true, "message": "Interview cancelled"}),
    ))
}
