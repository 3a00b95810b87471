//! HTTP surface over the persistence core: public submission and read
//! endpoints plus the JWT-guarded admin area.

pub mod auth;
pub mod comments;
pub mod content;
pub mod donations;
pub mod error;
pub mod media;
pub mod messages;
pub mod middleware;
pub mod outreach;
pub mod projects;
pub mod routes;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;
