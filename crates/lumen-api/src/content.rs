use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use lumen_types::api::{Claims, ContentQuery, ContentResponse, UpdateContentRequest};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

/// Page text in the requested language. Always answers; storage trouble
/// falls back to the built-in copy.
pub async fn get_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Query(query): Query<ContentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = blocking(&state, move |repos| {
        Ok(repos.content.get_page(&page_id, query.lang.as_deref()))
    })
    .await?;
    Ok(Json(ContentResponse {
        page_id: page.page_id,
        lang: page.lang,
        content: page.text,
    }))
}

pub async fn list_pages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let pages = blocking(&state, |repos| repos.content.list_pages()).await?;
    Ok(Json(pages))
}

pub async fn update_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = blocking(&state, move |repos| {
        repos.content.update_content(
            &page_id,
            req.lang.as_deref(),
            &req.content,
            Some(&claims.username),
        )
    })
    .await?;
    Ok(Json(row))
}
