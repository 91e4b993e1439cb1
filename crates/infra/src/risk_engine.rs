//! Risk scoring engine: reads worker history from the user store, runs the
//! configured [`ScoringModel`] and persists the result.
//!
//! The engine only ever writes `current_risk_score`. It never creates users
//! and never touches jobs. Each write is conditioned on the job count the
//! score was derived from; a write refused because the count moved is
//! recomputed from the fresh history.

use tracing::{debug, info, instrument, warn};

use surety_core::WalletAddress;
use surety_risk::{CompletionCountModel, RiskScore, ScoreReport, ScoringModel, WorkerHistory};

use crate::store::{ScoreWrite, StoreError, UserStore};

/// Recompute attempts before giving up on a worker whose count keeps moving.
const MAX_SCORE_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone)]
pub struct RiskEngine<U, M = CompletionCountModel> {
    users: U,
    model: M,
}

impl<U> RiskEngine<U, CompletionCountModel>
where
    U: UserStore,
{
    /// Engine using the default completion-count model.
    pub fn with_default_model(users: U) -> Self {
        Self::new(users, CompletionCountModel::default())
    }
}

impl<U, M> RiskEngine<U, M>
where
    U: UserStore,
    M: ScoringModel,
{
    pub fn new(users: U, model: M) -> Self {
        Self { users, model }
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    /// History for a worker, `None` if the worker has no record.
    pub async fn history(
        &self,
        worker: &WalletAddress,
    ) -> Result<Option<WorkerHistory>, StoreError> {
        Ok(self.users.get(worker).await?.map(|u| u.history()))
    }

    /// Pure step: history in, score out.
    pub fn apply_model(&self, history: &WorkerHistory) -> RiskScore {
        self.model.score(history)
    }

    /// Score derived from the worker's current history. Unknown workers
    /// score [`RiskScore::MIN`].
    #[instrument(skip(self), fields(worker = %worker, model = self.model.name()), err)]
    pub async fn calculate(&self, worker: &WalletAddress) -> Result<RiskScore, StoreError> {
        let score = match self.history(worker).await? {
            Some(history) => self.apply_model(&history),
            None => RiskScore::MIN,
        };
        debug!(score = score.value(), "calculated risk score");
        Ok(score)
    }

    /// Recompute and persist the worker's score. Safe to repeat.
    ///
    /// For an unknown worker this returns [`RiskScore::MIN`] and writes
    /// nothing.
    #[instrument(skip(self), fields(worker = %worker, model = self.model.name()), err)]
    pub async fn update_score(&self, worker: &WalletAddress) -> Result<RiskScore, StoreError> {
        for attempt in 1..=MAX_SCORE_ATTEMPTS {
            let Some(history) = self.history(worker).await? else {
                debug!("no user record; score not persisted");
                return Ok(RiskScore::MIN);
            };
            let score = self.apply_model(&history);

            match self
                .users
                .set_risk_score(worker, history.jobs_completed, score)
                .await?
            {
                ScoreWrite::Written => {
                    info!(
                        score = score.value(),
                        jobs_completed = history.jobs_completed,
                        "risk score updated"
                    );
                    return Ok(score);
                }
                ScoreWrite::Stale { actual } => {
                    debug!(
                        attempt,
                        based_on = history.jobs_completed,
                        actual,
                        "job count moved; recomputing"
                    );
                }
                ScoreWrite::Missing => {
                    debug!("user record disappeared; score not persisted");
                    return Ok(RiskScore::MIN);
                }
            }
        }

        Err(StoreError::Storage(format!(
            "risk score for {worker} not persisted after {MAX_SCORE_ATTEMPTS} attempts"
        )))
    }

    /// Stored score for the oracle consumer. Unknown workers, and any store
    /// failure, yield the `(0, 0, unknown)` sentinel.
    #[instrument(skip(self), fields(worker = %worker))]
    pub async fn get_score(&self, worker: &WalletAddress) -> ScoreReport {
        match self.users.get(worker).await {
            Ok(Some(user)) => ScoreReport::active(user.current_risk_score, user.total_jobs_completed),
            Ok(None) => ScoreReport::unknown(),
            Err(err) => {
                warn!(error = %err, "score lookup failed; reporting unknown worker");
                ScoreReport::unknown()
            }
        }
    }
}
