use axum::{routing::get, Router};

pub mod jobs;
pub mod risk;
pub mod system;
pub mod users;
pub mod webhooks;

/// Router for every endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .nest("/jobs", jobs::router())
        .nest("/risk", risk::router())
        .nest("/users", users::router())
        .nest("/webhooks", webhooks::router())
}
