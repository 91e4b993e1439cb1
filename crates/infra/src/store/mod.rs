//! Row stores for `users` and `jobs`.
//!
//! ## Design
//!
//! - Point lookups by primary key (job id, wallet address)
//! - Filtered selects over jobs
//! - Status changes go through `JobStore::compare_and_set`, a single
//!   conditional update that only applies when the persisted status still
//!   equals the expected prior status
//! - Completed-job counts are incremented atomically inside the store
//! - Score writes are conditioned on the job count they were computed from
//!
//! ## Implementations
//!
//! - `InMemoryJobStore` / `InMemoryUserStore`: dev and tests
//! - `PostgresJobStore` / `PostgresUserStore`: durable, `sqlx` + PostgreSQL

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryJobStore, InMemoryUserStore};
pub use postgres::{PostgresJobStore, PostgresUserStore, migrate};
pub use r#trait::{
    CasOutcome, JobFilter, JobStore, ScoreWrite, StoreError, UserInsert, UserStore,
};
