pub mod auth;
pub mod brocats;
pub mod content;
pub mod error;
pub mod middleware;
pub mod serialize;
pub mod storage;
pub mod users;
pub mod validation;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::auth::AppState;
use crate::middleware::require_auth;

/// All Brocat routes. Uploaded files are served read-only under `/media`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/brocats", get(brocats::list_brocats))
        .route("/brocats/{id}", get(brocats::get_brocat))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/brocats", post(brocats::upload_brocat))
        .route("/account/password", put(auth::change_password))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .layer(DefaultBodyLimit::max(brocats::MAX_UPLOAD_BYTES))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/media", ServeDir::new(state.storage.dir()))
}

async fn health() -> &'static str {
    "ok"
}
