use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use surety_core::WalletAddress;
use surety_infra::RegisterUser;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_user))
        .route("/:address", get(get_user))
}

pub async fn register_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegisterUser>,
) -> axum::response::Response {
    match services.lifecycle.register_user(body).await {
        Ok(registered) => {
            let status = if registered.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(dto::UserResponse::from(&registered.user))).into_response()
        }
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(address): Path<String>,
) -> axum::response::Response {
    let address = match WalletAddress::parse(address) {
        Ok(a) => a,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.lifecycle.get_user(&address).await {
        Ok(user) => Json(dto::UserResponse::from(&user)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}
