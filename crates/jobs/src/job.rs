use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use surety_core::{DomainError, DomainResult, Entity, JobId, WalletAddress};

use crate::location::GeoPoint;

/// Job status lifecycle.
///
/// `Pending → InProgress → Verified` is the implemented path. `Completed`
/// (worker claims done, not yet verified), `Disputed` and `Cancelled` are
/// valid states a job can occupy, but no transition leads into them yet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Verified,
    Disputed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::Completed,
        JobStatus::Verified,
        JobStatus::Disputed,
        JobStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Verified => "VERIFIED",
            JobStatus::Disputed => "DISPUTED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Verified | JobStatus::Disputed | JobStatus::Cancelled
        )
    }

    /// Resolve the status reached by applying `transition` from `self`.
    pub fn apply(self, transition: Transition) -> DomainResult<JobStatus> {
        match (self, transition) {
            (JobStatus::Pending, Transition::Start) => Ok(JobStatus::InProgress),
            // Verification is instantaneous today: completion skips COMPLETED.
            (JobStatus::InProgress, Transition::Complete) => Ok(JobStatus::Verified),
            (
                JobStatus::Pending
                | JobStatus::InProgress
                | JobStatus::Completed
                | JobStatus::Verified
                | JobStatus::Disputed
                | JobStatus::Cancelled,
                transition,
            ) => Err(transition.rejected_from(self)),
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::validation(format!("unknown job status: {s}")))
    }
}

/// Lifecycle transitions a job can undergo.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    Start,
    Complete,
}

impl Transition {
    /// The only status this transition may be applied from.
    pub fn required(&self) -> JobStatus {
        match self {
            Transition::Start => JobStatus::Pending,
            Transition::Complete => JobStatus::InProgress,
        }
    }

    /// Error reported when this transition is attempted from `actual`.
    pub fn rejected_from(&self, actual: JobStatus) -> DomainError {
        DomainError::invalid_transition(format!(
            "job must be {} to {} (current status: {})",
            self.required().as_str(),
            self.verb(),
            actual.as_str()
        ))
    }

    fn verb(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Complete => "complete",
        }
    }
}

/// Command: create a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub description: Option<String>,
    pub amount_eth: Decimal,
    pub employer_address: String,
    pub escrow_contract_address: Option<String>,
}

/// A unit of work with a price, an employer and, once started, a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub description: Option<String>,
    pub amount_eth: Decimal,
    pub employer_address: WalletAddress,
    pub worker_address: Option<WalletAddress>,
    pub escrow_contract_address: Option<String>,
    pub status: JobStatus,
    pub start_location: Option<GeoPoint>,
    pub end_location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Job {
    type Id = JobId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Job {
    /// Validate a creation command and build the new `Pending` job.
    pub fn create(id: JobId, cmd: NewJob, created_at: DateTime<Utc>) -> DomainResult<Job> {
        if cmd.amount_eth <= Decimal::ZERO {
            return Err(DomainError::validation("amount_eth must be positive"));
        }
        let employer_address = WalletAddress::parse(cmd.employer_address)
            .map_err(|_| DomainError::validation("employer_address must not be empty"))?;

        Ok(Job {
            id,
            title: cmd.title,
            description: cmd.description,
            amount_eth: cmd.amount_eth,
            employer_address,
            worker_address: None,
            escrow_contract_address: cmd.escrow_contract_address,
            status: JobStatus::Pending,
            start_location: None,
            end_location: None,
            created_at,
        })
    }

    /// `Pending → InProgress`: assign the worker and record the start point.
    pub fn start(&self, worker: WalletAddress, at: GeoPoint) -> DomainResult<Job> {
        let status = self.status.apply(Transition::Start)?;
        Ok(Job {
            status,
            worker_address: Some(worker),
            start_location: Some(at),
            ..self.clone()
        })
    }

    /// `InProgress → Verified`: record the end point.
    ///
    /// Only the assigned worker may report completion.
    pub fn complete(&self, worker: &WalletAddress, at: GeoPoint) -> DomainResult<Job> {
        let status = self.status.apply(Transition::Complete)?;
        if self.worker_address.as_ref() != Some(worker) {
            return Err(DomainError::validation(format!(
                "worker {worker} is not assigned to job {}",
                self.id
            )));
        }
        Ok(Job {
            status,
            end_location: Some(at),
            ..self.clone()
        })
    }

    /// `worker_address` is set if and only if the job has left `Pending`.
    pub fn check_invariants(&self) -> DomainResult<()> {
        let pending = self.status == JobStatus::Pending;
        if pending == self.worker_address.is_some() {
            return Err(DomainError::validation(format!(
                "job {} in status {} has inconsistent worker assignment",
                self.id, self.status
            )));
        }
        Ok(())
    }
}
