use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use surety_core::WalletAddress;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/worker/:address", get(get_worker_risk))
        .route("/calculate/:address", post(calculate_worker_risk))
}

/// Public oracle read. Unknown workers get the neutral sentinel, not a 404.
pub async fn get_worker_risk(
    Extension(services): Extension<Arc<AppServices>>,
    Path(address): Path<String>,
) -> axum::response::Response {
    let worker = match WalletAddress::parse(address) {
        Ok(w) => w,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let report = services.lifecycle.engine().get_score(&worker).await;
    Json(dto::WorkerRiskResponse::new(worker.to_string(), report)).into_response()
}

/// Manual recompute trigger.
pub async fn calculate_worker_risk(
    Extension(services): Extension<Arc<AppServices>>,
    Path(address): Path<String>,
) -> axum::response::Response {
    let worker = match WalletAddress::parse(address) {
        Ok(w) => w,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.lifecycle.engine().update_score(&worker).await {
        Ok(score) => Json(dto::ScoreUpdateResponse {
            worker: worker.to_string(),
            new_score: score.value(),
        })
        .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
