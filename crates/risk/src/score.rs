use serde::{Deserialize, Serialize};

use surety_core::{DomainError, DomainResult, ValueObject};

/// Worker risk score, 0–100 inclusive.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RiskScore(u8);

impl RiskScore {
    pub const MIN: RiskScore = RiskScore(0);
    pub const MAX: RiskScore = RiskScore(100);

    pub fn new(value: u8) -> DomainResult<Self> {
        if value > Self::MAX.0 {
            return Err(DomainError::validation(format!(
                "risk score must be between 0 and 100 (got {value})"
            )));
        }
        Ok(Self(value))
    }

    /// Clamp an arbitrary non-negative value into the score range.
    pub fn saturating(value: u64) -> Self {
        Self(value.min(Self::MAX.0 as u64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl ValueObject for RiskScore {}

impl TryFrom<u8> for RiskScore {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RiskScore> for u8 {
    fn from(value: RiskScore) -> Self {
        value.0
    }
}

impl core::fmt::Display for RiskScore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the scoring engine has any record of a worker.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Unknown,
    Active,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Unknown => "unknown",
            WorkerStatus::Active => "active",
        }
    }
}

/// Read-path answer for the oracle consumer. Always well-formed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: RiskScore,
    pub jobs_completed: u32,
    pub status: WorkerStatus,
}

impl ScoreReport {
    /// Sentinel for a worker with no record: `(0, 0, unknown)`.
    pub fn unknown() -> Self {
        Self {
            score: RiskScore::MIN,
            jobs_completed: 0,
            status: WorkerStatus::Unknown,
        }
    }

    pub fn active(score: RiskScore, jobs_completed: u32) -> Self {
        Self {
            score,
            jobs_completed,
            status: WorkerStatus::Active,
        }
    }
}
