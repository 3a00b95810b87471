use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use lumen_types::api::{AppProjectPatch, NewAppProject};

use crate::auth::AppState;
use crate::error::{ApiError, blocking, found};

pub async fn list_projects(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let projects = blocking(&state, |repos| repos.projects.find_all()).await?;
    Ok(Json(projects))
}

pub async fn add_project(
    State(state): State<AppState>,
    Json(req): Json<NewAppProject>,
) -> Result<impl IntoResponse, ApiError> {
    let project = blocking(&state, move |repos| repos.projects.create(req)).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn replace_projects(
    State(state): State<AppState>,
    Json(req): Json<Vec<NewAppProject>>,
) -> Result<impl IntoResponse, ApiError> {
    let projects = blocking(&state, move |repos| repos.projects.replace_all(req)).await?;
    Ok(Json(projects))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<AppProjectPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let project = blocking(&state, move |repos| repos.projects.update(id, &patch)).await?;
    Ok(Json(found(project, "app project", id)?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = blocking(&state, move |repos| repos.projects.delete(id)).await?;
    found(removed, "app project", id)?;
    Ok(StatusCode::NO_CONTENT)
}
