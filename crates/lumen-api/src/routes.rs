use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{comments, content, donations, media, messages, outreach, projects};

/// Every endpoint. CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/messages", post(messages::submit_message))
        .route("/messages/public", get(messages::public_messages))
        .route("/donations", post(donations::record_donation))
        .route("/comments", post(comments::submit_comment))
        .route("/comments/public", get(comments::public_comments))
        .route("/content/{page_id}", get(content::get_page))
        .route("/media", get(media::list_media))
        .route("/projects", get(projects::list_projects));

    let admin_routes = Router::new()
        .route("/admin/messages", get(messages::list_messages))
        .route("/admin/messages/pending", get(messages::pending_messages))
        .route("/admin/messages/{id}", patch(messages::curate_message))
        .route("/admin/comments", get(comments::list_comments))
        .route(
            "/admin/comments/{id}",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/admin/donations", get(donations::list_donations))
        .route("/admin/donations/summary", get(donations::donation_summary))
        .route("/admin/content", get(content::list_pages))
        .route("/admin/content/{page_id}", put(content::update_page))
        .route("/admin/media", put(media::upsert_media))
        .route("/admin/media/{media_type}", axum::routing::delete(media::delete_media))
        .route(
            "/admin/projects",
            post(projects::add_project).put(projects::replace_projects),
        )
        .route(
            "/admin/projects/{id}",
            patch(projects::update_project).delete(projects::delete_project),
        )
        .route(
            "/admin/outreach",
            get(outreach::list_contacts).post(outreach::add_contact),
        )
        .route(
            "/admin/outreach/{id}",
            patch(outreach::update_contact).delete(outreach::delete_contact),
        )
        .route("/admin/outreach/{id}/sent", post(outreach::mark_sent))
        .route("/admin/outreach/{id}/replied", post(outreach::mark_replied))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
