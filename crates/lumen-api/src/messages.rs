use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use lumen_types::api::{MessageFilter, NewMessage, PublicMessage};
use lumen_types::models::CurationUpdate;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

/// Anyone may leave a message; it stays hidden until curated.
pub async fn submit_message(
    State(state): State<AppState>,
    Json(req): Json<NewMessage>,
) -> Result<impl IntoResponse, ApiError> {
    let message = blocking(&state, move |repos| repos.messages.create(req)).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn public_messages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let messages = blocking(&state, |repos| repos.messages.find_public()).await?;
    let public: Vec<PublicMessage> = messages.into_iter().map(PublicMessage::from).collect();
    Ok(Json(public))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(filter): Query<MessageFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = blocking(&state, move |repos| repos.messages.find_all(&filter)).await?;
    Ok(Json(messages))
}

pub async fn pending_messages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let pending = blocking(&state, |repos| repos.messages.count_pending()).await?;
    Ok(Json(json!({ "pending": pending })))
}

pub async fn curate_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<CurationUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let message = blocking(&state, move |repos| repos.messages.curate(id, &update)).await?;
    Ok(Json(message))
}
