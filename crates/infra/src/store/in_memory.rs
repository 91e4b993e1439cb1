use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use surety_core::{Entity, JobId, WalletAddress};
use surety_jobs::{Job, JobStatus, User};
use surety_risk::RiskScore;

use super::r#trait::{CasOutcome, JobFilter, JobStore, ScoreWrite, StoreError, UserInsert, UserStore};

/// In-memory job store (dev/test).
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    inner: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let key = *Entity::id(job);
        if guard.contains_key(&key) {
            return Err(StoreError::AlreadyExists(format!("job {key}")));
        }
        guard.insert(key, job.clone());
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(guard.get(&id).cloned())
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut jobs: Vec<Job> = guard.values().filter(|j| filter.matches(j)).cloned().collect();
        // v7 ids are time-ordered; they break ties between equal timestamps.
        jobs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(jobs)
    }

    async fn compare_and_set(
        &self,
        expected: JobStatus,
        next: &Job,
    ) -> Result<CasOutcome, StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let Some(current) = guard.get_mut(&next.id) else {
            return Ok(CasOutcome::Missing);
        };
        if current.status != expected {
            return Ok(CasOutcome::Conflict {
                actual: current.status,
            });
        }
        current.status = next.status;
        current.worker_address = next.worker_address.clone();
        current.start_location = next.start_location;
        current.end_location = next.end_location;
        Ok(CasOutcome::Applied)
    }
}

/// In-memory user store (dev/test).
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<HashMap<WalletAddress, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, address: &WalletAddress) -> Result<Option<User>, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(guard.get(address).cloned())
    }

    async fn insert_if_absent(&self, user: &User) -> Result<UserInsert, StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let key = Entity::id(user).clone();
        if let Some(existing) = guard.get(&key) {
            return Ok(UserInsert {
                user: existing.clone(),
                created: false,
            });
        }
        guard.insert(key, user.clone());
        Ok(UserInsert {
            user: user.clone(),
            created: true,
        })
    }

    async fn increment_jobs_completed(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<u32>, StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::poisoned())?;
        Ok(guard.get_mut(address).map(User::record_completion))
    }

    async fn set_risk_score(
        &self,
        address: &WalletAddress,
        based_on: u32,
        score: RiskScore,
    ) -> Result<ScoreWrite, StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::poisoned())?;
        match guard.get_mut(address) {
            Some(user) if user.total_jobs_completed == based_on => {
                user.current_risk_score = score;
                Ok(ScoreWrite::Written)
            }
            Some(user) => Ok(ScoreWrite::Stale {
                actual: user.total_jobs_completed,
            }),
            None => Ok(ScoreWrite::Missing),
        }
    }
}
