use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use lumen_db::{DbError, Repositories};

use crate::auth::AppState;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("invalid credentials")]
    Unauthorized,

    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Db(DbError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Db(DbError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Db(DbError::LimitExceeded { .. }) => StatusCode::CONFLICT,
            ApiError::Db(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Storage details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Run a repository call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Repositories) -> lumen_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state.repos))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

/// Turn a missing row into a 404.
pub(crate) fn found<T>(value: Option<T>, entity: &'static str, id: impl ToString) -> Result<T, ApiError> {
    value.ok_or_else(|| DbError::not_found(entity, id).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(ApiError::from(DbError::not_found("message", "x")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(DbError::validation("name is required")).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(DbError::LimitExceeded { entity: "app project", limit: 3 }).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::from(DbError::LockPoisoned).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
