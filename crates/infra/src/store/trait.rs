use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use surety_core::{JobId, WalletAddress};
use surety_jobs::{Job, JobStatus, User};
use surety_risk::RiskScore;

/// Store error.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    /// A persisted row could not be mapped back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        Self::Storage("in-memory store lock poisoned".to_string())
    }
}

/// Result of a conditional status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The persisted status matched and the new row was written.
    Applied,
    /// Another writer got there first; nothing was written.
    Conflict { actual: JobStatus },
    /// No job with that id exists.
    Missing,
}

/// Result of a score write conditioned on the job count it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreWrite {
    Written,
    /// The count moved since the score was computed; nothing was written.
    Stale { actual: u32 },
    Missing,
}

/// Row returned by [`UserStore::insert_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInsert {
    pub user: User,
    /// `false` when a row for the address already existed.
    pub created: bool,
}

/// Optional filters for listing jobs. Empty filter lists everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub employer: Option<WalletAddress>,
    pub worker: Option<WalletAddress>,
    pub status: Option<JobStatus>,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        self.employer
            .as_ref()
            .map_or(true, |e| &job.employer_address == e)
            && self
                .worker
                .as_ref()
                .map_or(true, |w| job.worker_address.as_ref() == Some(w))
            && self.status.map_or(true, |s| job.status == s)
    }
}

/// Persistence for job rows.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job. Fails with `AlreadyExists` on a duplicate id.
    async fn insert(&self, job: &Job) -> Result<(), StoreError>;

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Matching jobs, oldest first.
    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError>;

    /// Atomically replace the mutable columns of `next` (status, worker,
    /// locations) if and only if the persisted status is still `expected`.
    async fn compare_and_set(
        &self,
        expected: JobStatus,
        next: &Job,
    ) -> Result<CasOutcome, StoreError>;
}

/// Persistence for user rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, address: &WalletAddress) -> Result<Option<User>, StoreError>;

    /// Insert `user` unless a row for its address exists. Returns the stored
    /// row either way; an existing row is never modified.
    async fn insert_if_absent(&self, user: &User) -> Result<UserInsert, StoreError>;

    /// Add one completed job in a single atomic step. `None` if no such user.
    async fn increment_jobs_completed(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<u32>, StoreError>;

    /// Overwrite `current_risk_score` if `total_jobs_completed` still equals
    /// `based_on`. Compare and write are one atomic step.
    async fn set_risk_score(
        &self,
        address: &WalletAddress,
        based_on: u32,
        score: RiskScore,
    ) -> Result<ScoreWrite, StoreError>;
}

#[async_trait]
impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        (**self).insert(job).await
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        (**self).get(id).await
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        (**self).list(filter).await
    }

    async fn compare_and_set(
        &self,
        expected: JobStatus,
        next: &Job,
    ) -> Result<CasOutcome, StoreError> {
        (**self).compare_and_set(expected, next).await
    }
}

#[async_trait]
impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn get(&self, address: &WalletAddress) -> Result<Option<User>, StoreError> {
        (**self).get(address).await
    }

    async fn insert_if_absent(&self, user: &User) -> Result<UserInsert, StoreError> {
        (**self).insert_if_absent(user).await
    }

    async fn increment_jobs_completed(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<u32>, StoreError> {
        (**self).increment_jobs_completed(address).await
    }

    async fn set_risk_score(
        &self,
        address: &WalletAddress,
        based_on: u32,
        score: RiskScore,
    ) -> Result<ScoreWrite, StoreError> {
        (**self).set_risk_score(address, based_on, score).await
    }
}
