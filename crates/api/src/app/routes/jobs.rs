use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use surety_core::{DomainError, JobId, WalletAddress};
use surety_infra::CompletionReport;
use surety_jobs::GeoPoint;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_job).get(list_jobs))
        .route("/:id", get(get_job))
        .route("/:id/start", post(start_job))
        .route("/:id/complete", post(complete_job))
}

fn parse_job_id(raw: &str) -> Result<JobId, axum::response::Response> {
    raw.parse::<JobId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"))
}

pub async fn create_job(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateJobRequest>,
) -> axum::response::Response {
    match services.lifecycle.create(body.into()).await {
        Ok(job) => (StatusCode::CREATED, Json(dto::JobResponse::from(&job))).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListJobsQuery>,
) -> axum::response::Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.lifecycle.list(&filter).await {
        Ok(jobs) => {
            let body: Vec<dto::JobResponse> = jobs.iter().map(dto::JobResponse::from).collect();
            Json(body).into_response()
        }
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_job_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.lifecycle.get(id).await {
        Ok(job) => Json(dto::JobResponse::from(&job)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

/// The worker may be named in a JSON body or as `?worker_address=`.
pub async fn start_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::StartJobRequest>,
    body: Option<Json<dto::StartJobRequest>>,
) -> axum::response::Response {
    let id = match parse_job_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let raw_worker = body
        .and_then(|Json(b)| b.worker_address)
        .or(query.worker_address);
    let Some(raw_worker) = raw_worker else {
        return errors::domain_error_to_response(DomainError::validation(
            "worker_address is required",
        ));
    };
    let worker = match WalletAddress::parse(raw_worker) {
        Ok(w) => w,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.lifecycle.start(id, worker).await {
        Ok(job) => Json(dto::JobResponse::from(&job)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

/// Oracle endpoint: verify the reported location, mark the job VERIFIED and
/// rescore the worker.
pub async fn complete_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::CompleteJobRequest>,
) -> axum::response::Response {
    let id = match parse_job_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let report = match WalletAddress::parse(body.worker_address).and_then(|worker_address| {
        let end_location = GeoPoint::new(body.end_location_lat, body.end_location_lng)?;
        Ok(CompletionReport {
            worker_address,
            end_location,
        })
    }) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.lifecycle.complete(id, report).await {
        Ok(outcome) => Json(dto::CompleteJobResponse::from(&outcome)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}
