use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use lumen_types::api::{NewOutreachContact, OutreachMessageRequest, OutreachPatch};

use crate::auth::AppState;
use crate::error::{ApiError, blocking, found};

pub async fn list_contacts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let contacts = blocking(&state, |repos| repos.outreach.find_all()).await?;
    Ok(Json(contacts))
}

pub async fn add_contact(
    State(state): State<AppState>,
    Json(req): Json<NewOutreachContact>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = blocking(&state, move |repos| repos.outreach.create(req)).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<OutreachPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = blocking(&state, move |repos| repos.outreach.update(id, &patch)).await?;
    Ok(Json(found(contact, "outreach contact", id)?))
}

pub async fn mark_sent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OutreachMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = blocking(&state, move |repos| repos.outreach.mark_sent(id, &req.message)).await?;
    Ok(Json(contact))
}

pub async fn mark_replied(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OutreachMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contact =
        blocking(&state, move |repos| repos.outreach.mark_replied(id, &req.message)).await?;
    Ok(Json(contact))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = blocking(&state, move |repos| repos.outreach.delete(id)).await?;
    found(removed, "outreach contact", id)?;
    Ok(StatusCode::NO_CONTENT)
}
