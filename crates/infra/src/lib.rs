//! Infrastructure layer: stores, the lifecycle manager, the risk engine and
//! process settings.

pub mod config;
pub mod lifecycle;
pub mod risk_engine;
pub mod store;


pub use config::{ConfigError, Settings};
pub use lifecycle::{
    CompletionOutcome, CompletionReport, DepositAck, DepositNotice, JobLifecycleManager,
    LifecycleError, PartialFailure, RegisterUser, WorkerStatsUpdate,
};
pub use risk_engine::RiskEngine;
pub use store::{
    CasOutcome, InMemoryJobStore, InMemoryUserStore, JobFilter, JobStore, PostgresJobStore,
    PostgresUserStore, ScoreWrite, StoreError, UserInsert, UserStore,
};
