use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;

/// Service banner.
pub async fn root(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": format!("{} Backend", services.project_name),
    }))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
