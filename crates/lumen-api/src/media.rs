use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use lumen_types::api::UpsertMedia;
use lumen_types::models::MediaType;

use crate::auth::AppState;
use crate::error::{ApiError, blocking, found};

pub async fn list_media(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let media = blocking(&state, |repos| repos.media.find_all()).await?;
    Ok(Json(media))
}

pub async fn upsert_media(
    State(state): State<AppState>,
    Json(req): Json<UpsertMedia>,
) -> Result<impl IntoResponse, ApiError> {
    let media = blocking(&state, move |repos| repos.media.upsert(req)).await?;
    Ok(Json(media))
}

/// Returns the removed reference so the caller can delete the stored asset.
pub async fn delete_media(
    State(state): State<AppState>,
    Path(media_type): Path<MediaType>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = blocking(&state, move |repos| repos.media.delete(media_type)).await?;
    Ok(Json(found(removed, "media", media_type)?))
}
