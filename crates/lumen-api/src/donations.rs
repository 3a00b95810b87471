use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use lumen_types::api::NewDonation;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

/// Record a completed payment. Called by the checkout flow once the
/// provider confirms it.
pub async fn record_donation(
    State(state): State<AppState>,
    Json(req): Json<NewDonation>,
) -> Result<impl IntoResponse, ApiError> {
    let donation = blocking(&state, move |repos| repos.donations.create(req)).await?;
    Ok((StatusCode::CREATED, Json(donation)))
}

pub async fn list_donations(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let donations = blocking(&state, |repos| repos.donations.find_all()).await?;
    Ok(Json(donations))
}

pub async fn donation_summary(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let summary = blocking(&state, |repos| repos.donations.summary()).await?;
    Ok(Json(summary))
}
