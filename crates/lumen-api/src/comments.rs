use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use lumen_types::api::{CommentFilter, CommentPatch, ContentQuery, NewComment};

use crate::auth::AppState;
use crate::error::{ApiError, blocking, found};

pub async fn submit_comment(
    State(state): State<AppState>,
    Json(req): Json<NewComment>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = blocking(&state, move |repos| repos.comments.create(req)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Published comments in the requested language, plus untagged ones.
pub async fn public_comments(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = blocking(&state, move |repos| {
        repos.comments.find_public(query.lang.as_deref())
    })
    .await?;
    Ok(Json(comments))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Query(filter): Query<CommentFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = blocking(&state, move |repos| repos.comments.find_all(&filter)).await?;
    Ok(Json(comments))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CommentPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = blocking(&state, move |repos| repos.comments.update(id, &patch)).await?;
    Ok(Json(found(comment, "comment", id)?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = blocking(&state, move |repos| repos.comments.delete(id)).await?;
    found(removed, "comment", id)?;
    Ok(StatusCode::NO_CONTENT)
}
