//! Scoring models.

use serde::{Deserialize, Serialize};

use crate::score::RiskScore;

/// The part of a worker's stored history a model may look at.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerHistory {
    pub jobs_completed: u32,
}

impl WorkerHistory {
    pub fn new(jobs_completed: u32) -> Self {
        Self { jobs_completed }
    }
}

/// Trust model: a deterministic function of a worker's history.
///
/// Implementations must not perform IO and must return the same score for the
/// same history, so recomputing is always safe.
pub trait ScoringModel: Send + Sync + 'static {
    /// Stable name, recorded in logs next to every recomputed score.
    fn name(&self) -> &'static str;

    fn score(&self, history: &WorkerHistory) -> RiskScore;
}

impl<M: ScoringModel + ?Sized> ScoringModel for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn score(&self, history: &WorkerHistory) -> RiskScore {
        (**self).score(history)
    }
}

/// Placeholder trust model: a fixed number of points per completed job,
/// capped at [`RiskScore::MAX`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CompletionCountModel {
    pub points_per_job: u32,
}

impl CompletionCountModel {
    pub const DEFAULT_POINTS_PER_JOB: u32 = 10;

    pub fn new(points_per_job: u32) -> Self {
        Self { points_per_job }
    }
}

impl Default for CompletionCountModel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POINTS_PER_JOB)
    }
}

impl ScoringModel for CompletionCountModel {
    fn name(&self) -> &'static str {
        "completion_count"
    }

    fn score(&self, history: &WorkerHistory) -> RiskScore {
        let raw = (history.jobs_completed as u64).saturating_mul(self.points_per_job as u64);
        RiskScore::saturating(raw)
    }
}
