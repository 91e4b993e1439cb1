//! Job lifecycle manager.
//!
//! Drives `Create → Start → Complete` over the stores. Every status change is
//! a compare-and-set on the expected prior status, so of two racing callers
//! exactly one transition is persisted and the other gets the same
//! invalid-transition error a stale caller would.
//!
//! Completion is the oracle operation: once the `VERIFIED` row is written it
//! stands. Bumping the worker's job count and recomputing their score come
//! after, and a failure there is reported as a [`PartialFailure`] on an
//! otherwise successful outcome.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Span, info, instrument, warn};

use surety_core::{DomainError, JobId, WalletAddress};
use surety_jobs::{
    AcceptAllVerifier, GeoPoint, Job, LocationVerdict, LocationVerifier, NewJob, Role,
    Transition, User,
};
use surety_risk::{CompletionCountModel, RiskScore, ScoringModel};

use crate::risk_engine::RiskEngine;
use crate::store::{CasOutcome, JobFilter, JobStore, StoreError, UserInsert, UserStore};

#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Worker's report that a job is done.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionReport {
    pub worker_address: WalletAddress,
    pub end_location: GeoPoint,
}

/// The secondary effect of completion that did not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFailure {
    pub worker: WalletAddress,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatsUpdate {
    Updated {
        jobs_completed: u32,
        new_score: RiskScore,
    },
    Failed(PartialFailure),
}

/// Result of a committed completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub job: Job,
    pub worker_stats: WorkerStatsUpdate,
}

impl CompletionOutcome {
    pub fn new_score(&self) -> Option<RiskScore> {
        match &self.worker_stats {
            WorkerStatsUpdate::Updated { new_score, .. } => Some(*new_score),
            WorkerStatsUpdate::Failed(_) => None,
        }
    }

    pub fn worker_stats_updated(&self) -> bool {
        matches!(self.worker_stats, WorkerStatsUpdate::Updated { .. })
    }

    pub fn message(&self) -> &'static str {
        if self.worker_stats_updated() {
            "Job verified"
        } else {
            "Job verified, but worker stats update failed"
        }
    }
}

/// Command: register (or look up) a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    pub wallet_address: String,
    pub role: Role,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// On-chain deposit seen by an off-chain listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositNotice {
    pub transaction_hash: String,
    pub amount: Decimal,
    pub sender: String,
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAck {
    pub received: bool,
    pub tx: String,
}

pub struct JobLifecycleManager<J, U, M = CompletionCountModel, V = AcceptAllVerifier> {
    jobs: J,
    users: U,
    engine: RiskEngine<U, M>,
    verifier: V,
}

impl<J, U, M> JobLifecycleManager<J, U, M, AcceptAllVerifier>
where
    J: JobStore,
    U: UserStore + Clone,
    M: ScoringModel,
{
    pub fn new(jobs: J, users: U, model: M) -> Self {
        Self {
            jobs,
            engine: RiskEngine::new(users.clone(), model),
            users,
            verifier: AcceptAllVerifier,
        }
    }
}

impl<J, U, M, V> JobLifecycleManager<J, U, M, V>
where
    J: JobStore,
    U: UserStore,
    M: ScoringModel,
    V: LocationVerifier,
{
    /// Swap the location check run before completion.
    pub fn with_verifier<V2: LocationVerifier>(self, verifier: V2) -> JobLifecycleManager<J, U, M, V2> {
        JobLifecycleManager {
            jobs: self.jobs,
            users: self.users,
            engine: self.engine,
            verifier,
        }
    }

    pub fn engine(&self) -> &RiskEngine<U, M> {
        &self.engine
    }

    #[instrument(skip(self, cmd), fields(employer = %cmd.employer_address, job_id), err)]
    pub async fn create(&self, cmd: NewJob) -> Result<Job, LifecycleError> {
        let job = Job::create(JobId::new(), cmd, Utc::now())?;
        Span::current().record("job_id", tracing::field::display(job.id));

        self.jobs.insert(&job).await?;

        // The job row stands; recording the employer is best effort.
        if let Err(err) = self.ensure_user(&job.employer_address, Role::Employer).await {
            warn!(error = %err, "could not record employer after create");
        }

        info!(amount_eth = %job.amount_eth, "job created");
        Ok(job)
    }

    pub async fn get(&self, id: JobId) -> Result<Job, LifecycleError> {
        self.jobs
            .get(id)
            .await?
            .ok_or_else(|| job_not_found(id).into())
    }

    pub async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, LifecycleError> {
        Ok(self.jobs.list(filter).await?)
    }

    /// `PENDING → IN_PROGRESS`. Succeeds at most once per job.
    #[instrument(skip(self), fields(job_id = %id, worker = %worker), err)]
    pub async fn start(&self, id: JobId, worker: WalletAddress) -> Result<Job, LifecycleError> {
        let current = self.get(id).await?;
        let next = current.start(worker, GeoPoint::PLACEHOLDER)?;
        self.commit(Transition::Start, &next).await?;

        // The transition is committed; a missing worker row degrades
        // completion later instead of failing this call.
        if let Some(worker) = next.worker_address.as_ref() {
            if let Err(err) = self.ensure_user(worker, Role::Worker).await {
                warn!(error = %err, "could not record worker after start");
            }
        }

        info!("job started");
        Ok(next)
    }

    /// `IN_PROGRESS → VERIFIED`, then the worker's count and score.
    #[instrument(
        skip(self, report),
        fields(job_id = %id, worker = %report.worker_address),
        err
    )]
    pub async fn complete(
        &self,
        id: JobId,
        report: CompletionReport,
    ) -> Result<CompletionOutcome, LifecycleError> {
        let current = self.get(id).await?;
        let next = current.complete(&report.worker_address, report.end_location)?;

        if let LocationVerdict::Rejected(reason) =
            self.verifier.verify(current.start_location, report.end_location)
        {
            return Err(DomainError::validation(format!("location rejected: {reason}")).into());
        }

        self.commit(Transition::Complete, &next).await?;
        info!("job verified");

        let worker_stats = self.record_completion(&report.worker_address).await;
        if let WorkerStatsUpdate::Failed(failure) = &worker_stats {
            warn!(reason = %failure.reason, "job verified but worker stats were not updated");
        }

        Ok(CompletionOutcome {
            job: next,
            worker_stats,
        })
    }

    /// Create a user if absent. Re-registering under another role is a
    /// conflict; otherwise the stored record is returned unchanged, with
    /// `created` unset.
    #[instrument(skip(self, cmd), fields(wallet = %cmd.wallet_address, role = %cmd.role), err)]
    pub async fn register_user(&self, cmd: RegisterUser) -> Result<UserInsert, LifecycleError> {
        let address = WalletAddress::parse(cmd.wallet_address)?;
        let candidate =
            User::new(address, cmd.role, Utc::now()).with_contact(cmd.phone_number, cmd.email);
        let stored = self.users.insert_if_absent(&candidate).await?;
        stored.user.ensure_role(cmd.role)?;
        Ok(stored)
    }

    pub async fn get_user(&self, address: &WalletAddress) -> Result<User, LifecycleError> {
        self.users
            .get(address)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {address}")).into())
    }

    /// Log an on-chain deposit. Funding does not drive a transition yet.
    #[instrument(skip(self, notice), fields(tx = %notice.transaction_hash, job_id = %notice.job_id))]
    pub fn acknowledge_deposit(&self, notice: DepositNotice) -> DepositAck {
        info!(amount = %notice.amount, sender = %notice.sender, "deposit received");
        DepositAck {
            received: true,
            tx: notice.transaction_hash,
        }
    }

    async fn commit(&self, transition: Transition, next: &Job) -> Result<(), LifecycleError> {
        match self.jobs.compare_and_set(transition.required(), next).await? {
            CasOutcome::Applied => Ok(()),
            CasOutcome::Conflict { actual } => Err(transition.rejected_from(actual).into()),
            CasOutcome::Missing => Err(job_not_found(next.id).into()),
        }
    }

    async fn ensure_user(
        &self,
        address: &WalletAddress,
        role: Role,
    ) -> Result<UserInsert, StoreError> {
        let user = User::new(address.clone(), role, Utc::now());
        self.users.insert_if_absent(&user).await
    }

    async fn record_completion(&self, worker: &WalletAddress) -> WorkerStatsUpdate {
        let failed = |reason: String| {
            WorkerStatsUpdate::Failed(PartialFailure {
                worker: worker.clone(),
                reason,
            })
        };

        let jobs_completed = match self.users.increment_jobs_completed(worker).await {
            Ok(Some(count)) => count,
            Ok(None) => return failed(format!("no user record for worker {worker}")),
            Err(err) => return failed(format!("job count update failed: {err}")),
        };

        match self.engine.update_score(worker).await {
            Ok(new_score) => WorkerStatsUpdate::Updated {
                jobs_completed,
                new_score,
            },
            Err(err) => failed(format!("score recompute failed: {err}")),
        }
    }
}

fn job_not_found(id: JobId) -> DomainError {
    DomainError::not_found(format!("job {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryJobStore, InMemoryUserStore};
    use std::sync::Arc;
    use surety_jobs::JobStatus;

    type Manager = JobLifecycleManager<Arc<InMemoryJobStore>, Arc<InMemoryUserStore>>;

    fn manager() -> (Manager, Arc<InMemoryJobStore>, Arc<InMemoryUserStore>) {
        let jobs = Arc::new(InMemoryJobStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let manager =
            JobLifecycleManager::new(jobs.clone(), users.clone(), CompletionCountModel::default());
        (manager, jobs, users)
    }

    fn wallet(s: &str) -> WalletAddress {
        WalletAddress::parse(s).unwrap()
    }

    fn new_job(employer: &str) -> NewJob {
        NewJob {
            title: "Paint the warehouse".to_string(),
            description: Some("Two coats".to_string()),
            amount_eth: Decimal::new(5, 2),
            employer_address: employer.to_string(),
            escrow_contract_address: None,
        }
    }

    fn report(worker: &str) -> CompletionReport {
        CompletionReport {
            worker_address: wallet(worker),
            end_location: GeoPoint::new(6.4541, 3.3947).unwrap(),
        }
    }

    #[tokio::test]
    async fn create_records_employer() {
        let (manager, _, users) = manager();
        let job = manager.create(new_job("E1")).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        let employer = users.get(&wallet("E1")).await.unwrap().unwrap();
        assert_eq!(employer.role, Role::Employer);
    }

    #[tokio::test]
    async fn create_rejects_invalid_amount_without_side_effects() {
        let (manager, jobs, users) = manager();
        let mut cmd = new_job("E1");
        cmd.amount_eth = Decimal::ZERO;
        let err = manager.create(cmd).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Domain(DomainError::Validation(_))));
        assert!(jobs.list(&JobFilter::default()).await.unwrap().is_empty());
        assert!(users.get(&wallet("E1")).await.unwrap().is_none());
    }

    struct RefusingInserts;

    #[async_trait::async_trait]
    impl JobStore for RefusingInserts {
        async fn insert(&self, _job: &Job) -> Result<(), StoreError> {
            Err(StoreError::Storage("disk full".to_string()))
        }

        async fn get(&self, _id: JobId) -> Result<Option<Job>, StoreError> {
            Ok(None)
        }

        async fn list(&self, _filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
            Ok(Vec::new())
        }

        async fn compare_and_set(
            &self,
            _expected: JobStatus,
            _next: &Job,
        ) -> Result<CasOutcome, StoreError> {
            Ok(CasOutcome::Missing)
        }
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_employer_behind() {
        let users = Arc::new(InMemoryUserStore::new());
        let manager =
            JobLifecycleManager::new(RefusingInserts, users.clone(), CompletionCountModel::default());

        let err = manager.create(new_job("E7")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Store(StoreError::Storage(_))));
        assert!(users.get(&wallet("E7")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn start_unknown_job_is_not_found() {
        let (manager, _, _) = manager();
        let err = manager.start(JobId::new(), wallet("W1")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn start_records_worker_role_only_when_first_seen() {
        let (manager, _, users) = manager();
        // E2 is already an employer; working a job must not rewrite that.
        let first = manager.create(new_job("E1")).await.unwrap();
        let second = manager.create(new_job("E2")).await.unwrap();
        manager.start(first.id, wallet("E2")).await.unwrap();
        manager.start(second.id, wallet("W9")).await.unwrap();

        assert_eq!(users.get(&wallet("E2")).await.unwrap().unwrap().role, Role::Employer);
        assert_eq!(users.get(&wallet("W9")).await.unwrap().unwrap().role, Role::Worker);
    }

    #[tokio::test]
    async fn complete_names_required_state_when_pending() {
        let (manager, _, _) = manager();
        let job = manager.create(new_job("E1")).await.unwrap();
        let err = manager.complete(job.id, report("W1")).await.unwrap_err();
        match err {
            LifecycleError::Domain(DomainError::InvalidTransition(msg)) => {
                assert!(msg.contains("IN_PROGRESS"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_by_other_worker_is_rejected_and_job_unchanged() {
        let (manager, jobs, _) = manager();
        let job = manager.create(new_job("E1")).await.unwrap();
        manager.start(job.id, wallet("W1")).await.unwrap();
        let err = manager.complete(job.id, report("W2")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Domain(DomainError::Validation(_))));
        assert_eq!(
            jobs.get(job.id).await.unwrap().unwrap().status,
            JobStatus::InProgress
        );
    }

    struct RejectAll;

    impl LocationVerifier for RejectAll {
        fn verify(&self, _start: Option<GeoPoint>, _end: GeoPoint) -> LocationVerdict {
            LocationVerdict::Rejected("outside geofence".to_string())
        }
    }

    #[tokio::test]
    async fn rejected_location_aborts_completion() {
        let (manager, jobs, users) = manager();
        let manager = manager.with_verifier(RejectAll);
        let job = manager.create(new_job("E1")).await.unwrap();
        manager.start(job.id, wallet("W1")).await.unwrap();

        let err = manager.complete(job.id, report("W1")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Domain(DomainError::Validation(msg)) if msg.contains("geofence")));
        assert_eq!(
            jobs.get(job.id).await.unwrap().unwrap().status,
            JobStatus::InProgress
        );
        assert_eq!(
            users.get(&wallet("W1")).await.unwrap().unwrap().total_jobs_completed,
            0
        );
    }

    #[tokio::test]
    async fn register_same_role_returns_existing_and_other_role_conflicts() {
        let (manager, _, _) = manager();
        let cmd = RegisterUser {
            wallet_address: "U1".to_string(),
            role: Role::Worker,
            phone_number: Some("+2348000000000".to_string()),
            email: None,
        };
        let first = manager.register_user(cmd.clone()).await.unwrap();
        assert!(first.created);
        let again = manager
            .register_user(RegisterUser {
                phone_number: None,
                ..cmd.clone()
            })
            .await
            .unwrap();
        assert!(!again.created);
        assert_eq!(first.user, again.user);

        let err = manager
            .register_user(RegisterUser {
                role: Role::Admin,
                ..cmd
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Domain(DomainError::Conflict(_))));
        assert_eq!(manager.get_user(&wallet("U1")).await.unwrap().role, Role::Worker);
    }

    #[tokio::test]
    async fn register_rejects_blank_wallet() {
        let (manager, _, _) = manager();
        let err = manager
            .register_user(RegisterUser {
                wallet_address: "  ".to_string(),
                role: Role::Worker,
                phone_number: None,
                email: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (manager, _, _) = manager();
        assert!(matches!(
            manager.get_user(&wallet("nobody")).await,
            Err(LifecycleError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[test]
    fn deposit_is_acknowledged_with_tx_hash() {
        let (manager, _, _) = manager();
        let ack = manager.acknowledge_deposit(DepositNotice {
            transaction_hash: "0xabc".to_string(),
            amount: Decimal::new(5, 2),
            sender: "0xsender".to_string(),
            job_id: "not-a-uuid".to_string(),
        });
        assert_eq!(
            ack,
            DepositAck {
                received: true,
                tx: "0xabc".to_string()
            }
        );
    }

    #[test]
    fn outcome_message_reflects_worker_stats() {
        let job = Job::create(JobId::new(), new_job("E1"), Utc::now()).unwrap();
        let failed = CompletionOutcome {
            job: job.clone(),
            worker_stats: WorkerStatsUpdate::Failed(PartialFailure {
                worker: wallet("W1"),
                reason: "no user record".to_string(),
            }),
        };
        assert!(!failed.worker_stats_updated());
        assert_eq!(failed.new_score(), None);
        assert_eq!(failed.message(), "Job verified, but worker stats update failed");

        let updated = CompletionOutcome {
            job,
            worker_stats: WorkerStatsUpdate::Updated {
                jobs_completed: 1,
                new_score: RiskScore::new(10).unwrap(),
            },
        };
        assert_eq!(updated.message(), "Job verified");
        assert_eq!(updated.new_score(), Some(RiskScore::new(10).unwrap()));
    }
}
