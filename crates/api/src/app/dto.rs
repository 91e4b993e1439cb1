use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use surety_core::{DomainResult, WalletAddress};
use surety_infra::{CompletionOutcome, JobFilter};
use surety_jobs::{Job, JobStatus, NewJob, User};
use surety_risk::{RiskScore, ScoreReport};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub amount_eth: Decimal,
    pub employer_address: String,
    #[serde(default)]
    pub escrow_contract_address: Option<String>,
}

impl From<CreateJobRequest> for NewJob {
    fn from(req: CreateJobRequest) -> Self {
        NewJob {
            title: req.title,
            description: req.description,
            amount_eth: req.amount_eth,
            employer_address: req.employer_address,
            escrow_contract_address: req.escrow_contract_address,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    pub employer: Option<String>,
    pub worker: Option<String>,
    pub status: Option<String>,
}

impl ListJobsQuery {
    pub fn into_filter(self) -> DomainResult<JobFilter> {
        Ok(JobFilter {
            employer: self.employer.map(WalletAddress::parse).transpose()?,
            worker: self.worker.map(WalletAddress::parse).transpose()?,
            status: self
                .status
                .map(|s| s.parse::<JobStatus>())
                .transpose()?,
        })
    }
}

/// `worker_address` may arrive in the body or as a query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct StartJobRequest {
    pub worker_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteJobRequest {
    pub worker_address: String,
    pub end_location_lat: f64,
    pub end_location_lng: f64,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub amount_eth: Decimal,
    pub employer_address: String,
    pub worker_address: Option<String>,
    pub escrow_contract_address: Option<String>,
    pub status: JobStatus,
    pub start_location_lat: Option<f64>,
    pub start_location_lng: Option<f64>,
    pub end_location_lat: Option<f64>,
    pub end_location_lng: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<&Job> for JobResponse {
    fn from(job: &Job) -> Self {
        JobResponse {
            id: job.id.to_string(),
            title: job.title.clone(),
            description: job.description.clone(),
            amount_eth: job.amount_eth,
            employer_address: job.employer_address.to_string(),
            worker_address: job.worker_address.as_ref().map(|w| w.to_string()),
            escrow_contract_address: job.escrow_contract_address.clone(),
            status: job.status,
            start_location_lat: job.start_location.map(|p| p.lat),
            start_location_lng: job.start_location.map(|p| p.lng),
            end_location_lat: job.end_location.map(|p| p.lat),
            end_location_lng: job.end_location.map(|p| p.lng),
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompleteJobResponse {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_worker_score: Option<u8>,
    pub worker_stats_updated: bool,
}

impl From<&CompletionOutcome> for CompleteJobResponse {
    fn from(outcome: &CompletionOutcome) -> Self {
        CompleteJobResponse {
            status: "success",
            message: outcome.message(),
            new_worker_score: outcome.new_score().map(RiskScore::value),
            worker_stats_updated: outcome.worker_stats_updated(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub wallet_address: String,
    pub role: surety_jobs::Role,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub current_risk_score: u8,
    pub total_jobs_completed: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            wallet_address: user.wallet_address.to_string(),
            role: user.role,
            phone_number: user.phone_number.clone(),
            email: user.email.clone(),
            current_risk_score: user.current_risk_score.value(),
            total_jobs_completed: user.total_jobs_completed,
            created_at: user.created_at,
        }
    }
}

/// Oracle read shape. Always exactly these four fields.
#[derive(Debug, Serialize)]
pub struct WorkerRiskResponse {
    pub worker: String,
    pub score: u8,
    pub jobs_completed: u32,
    pub status: &'static str,
}

impl WorkerRiskResponse {
    pub fn new(worker: String, report: ScoreReport) -> Self {
        WorkerRiskResponse {
            worker,
            score: report.score.value(),
            jobs_completed: report.jobs_completed,
            status: report.status.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScoreUpdateResponse {
    pub worker: String,
    pub new_score: u8,
}
