use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use surety_infra::DepositNotice;

use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/deposit", post(handle_deposit))
}

/// Listener for on-chain deposits (e.g. an indexer webhook).
pub async fn handle_deposit(
    Extension(services): Extension<Arc<AppServices>>,
    Json(notice): Json<DepositNotice>,
) -> axum::response::Response {
    Json(services.lifecycle.acknowledge_deposit(notice)).into_response()
}
