use axum::Router;

use crate::{error::ApiError, state::AppState};

pub mod affirmations;
pub mod auth;
pub mod health;
pub mod problems;
pub mod sessions;

/// Every API route, mounted under `/api`.
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(problems::router())
        .merge(affirmations::router())
        .merge(sessions::router());

    Router::new()
        .nest("/api", api)
        .fallback(|| async { ApiError::NotFound("Route not found".to_string()) })
}
