//! `surety-risk`
//!
//! **Responsibility:** worker trust/risk scoring, as pure functions.
//!
//! - A [`ScoringModel`] turns a [`WorkerHistory`] into a [`RiskScore`].
//! - Reading history and persisting results are the caller's job (see the
//!   risk engine in `surety-infra`), so a model can be replaced without
//!   touching either side.
//! - This crate never initiates job lifecycle transitions.

pub mod model;
pub mod score;

pub use model::{CompletionCountModel, ScoringModel, WorkerHistory};
pub use score::{RiskScore, ScoreReport, WorkerStatus};
