use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::Result, middleware::auth::Claims, services::application_service::CreateApplication,
    AppState,
};

#[axum::debug_handler]
pub async fn create_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateApplication>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .create(claims.user_id()?, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "data": application})),
    ))
}

#[axum::debug_handler]
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .list_mine(claims.user_id()?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": applications.len(),
        "data": applications,
    })))
}

#[axum::debug_handler]
pub async fn job_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .list_for_job(job_id, claims.user_id()?, claims.role())
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": applications.len(),
        "data": applications,
    })))
}

#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .get(id, claims.user_id()?, claims.role())
        .await?;
    Ok(Json(json!({"success": true, "data": application})))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: String,
}

#[axum::debug_handler]
pub async fn update_application_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .update_status(id, &payload.status, claims.user_id()?, claims.role())
        .await?;
    Ok(Json(json!({"success": true, "data": application})))
}

#[axum::debug_handler]
pub async fn delete_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .application_service
        .delete(id, claims.user_id()?, claims.role())
        .await?;
    Ok(Json(
        json!({"success": true, "message": "Application withdrawn"}),
    ))
}
