//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `AlreadyExists` | Duplicate job id |
//! | Database (check constraint violation) | `23514` | `Storage` | Row rejected by a column check |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolClosed | N/A | `Storage` | Connection pool was closed |
//! | Other | N/A | `Storage` | Network errors, connection failures, etc. |
//!
//! Rows that decode but fail domain validation (unknown status, score out of
//! range) surface as `StoreError::Corrupt`.
//!
//! ## Atomic status changes
//!
//! `compare_and_set` is one `UPDATE ... WHERE id = $1 AND status = $2`.
//! PostgreSQL row locking serializes concurrent updates of the same row, so of
//! two racing writers expecting the same status exactly one sees a row
//! affected. A zero-row result is disambiguated with a follow-up `SELECT`.
//!
//! `set_risk_score` follows the same pattern, keyed on `total_jobs_completed`
//! instead of `status`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use surety_core::{JobId, WalletAddress};
use surety_jobs::{GeoPoint, Job, JobStatus, Role, User};
use surety_risk::RiskScore;

use super::r#trait::{CasOutcome, JobFilter, JobStore, ScoreWrite, StoreError, UserInsert, UserStore};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const JOB_COLUMNS: &str = r#"
    id, title, description, amount_eth, employer_address, worker_address,
    escrow_contract_address, status,
    start_location_lat, start_location_lng, end_location_lat, end_location_lng,
    created_at
"#;

const USER_COLUMNS: &str = r#"
    wallet_address, role, phone_number, email,
    current_risk_score, total_jobs_completed, created_at
"#;

/// Create the `users` and `jobs` tables if they do not exist.
#[instrument(skip(pool), err)]
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    Ok(())
}

/// Postgres-backed job store.
#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: Arc<PgPool>,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id), err)]
    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, title, description, amount_eth, employer_address, worker_address,
                escrow_contract_address, status,
                start_location_lat, start_location_lng, end_location_lat, end_location_lng,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(&job.title)
        .bind(job.description.as_deref())
        .bind(job.amount_eth)
        .bind(job.employer_address.as_str())
        .bind(job.worker_address.as_ref().map(WalletAddress::as_str))
        .bind(job.escrow_contract_address.as_deref())
        .bind(job.status.as_str())
        .bind(job.start_location.map(|p| p.lat))
        .bind(job.start_location.map(|p| p.lng))
        .bind(job.end_location.map(|p| p.lat))
        .bind(job.end_location.map(|p| p.lng))
        .bind(job.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_job", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id), err)]
    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_job", e))?;
        row.as_ref().map(job_from_row).transpose()
    }

    #[instrument(skip(self), fields(job_count), err)]
    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE ($1::text IS NULL OR employer_address = $1)
              AND ($2::text IS NULL OR worker_address = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(filter.employer.as_ref().map(WalletAddress::as_str))
        .bind(filter.worker.as_ref().map(WalletAddress::as_str))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_jobs", e))?;

        let jobs = rows.iter().map(job_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("job_count", jobs.len());
        Ok(jobs)
    }

    #[instrument(
        skip(self, next),
        fields(job_id = %next.id, expected = %expected, next_status = %next.status),
        err
    )]
    async fn compare_and_set(
        &self,
        expected: JobStatus,
        next: &Job,
    ) -> Result<CasOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $3,
                worker_address = $4,
                start_location_lat = $5,
                start_location_lng = $6,
                end_location_lat = $7,
                end_location_lng = $8
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(next.id.as_uuid())
        .bind(expected.as_str())
        .bind(next.status.as_str())
        .bind(next.worker_address.as_ref().map(WalletAddress::as_str))
        .bind(next.start_location.map(|p| p.lat))
        .bind(next.start_location.map(|p| p.lng))
        .bind(next.end_location.map(|p| p.lat))
        .bind(next.end_location.map(|p| p.lng))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("compare_and_set", e))?;

        if result.rows_affected() == 1 {
            return Ok(CasOutcome::Applied);
        }

        let actual: Option<String> = sqlx::query_scalar("SELECT status FROM jobs WHERE id = $1")
            .bind(next.id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("compare_and_set", e))?;

        match actual {
            Some(status) => Ok(CasOutcome::Conflict {
                actual: parse_status(&status)?,
            }),
            None => Ok(CasOutcome::Missing),
        }
    }
}

/// Postgres-backed user store.
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self), fields(wallet = %address), err)]
    async fn get(&self, address: &WalletAddress) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE wallet_address = $1"
        ))
        .bind(address.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(
        skip(self, user),
        fields(wallet = %user.wallet_address, role = %user.role, created),
        err
    )]
    async fn insert_if_absent(&self, user: &User) -> Result<UserInsert, StoreError> {
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO users (
                wallet_address, role, phone_number, email,
                current_risk_score, total_jobs_completed, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (wallet_address) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.wallet_address.as_str())
        .bind(user.role.as_str())
        .bind(user.phone_number.as_deref())
        .bind(user.email.as_deref())
        .bind(i16::from(user.current_risk_score.value()))
        .bind(i32::try_from(user.total_jobs_completed).unwrap_or(i32::MAX))
        .bind(user.created_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        let created = inserted.is_some();
        Span::current().record("created", created);

        let stored = match inserted {
            Some(row) => user_from_row(&row)?,
            None => self.get(&user.wallet_address).await?.ok_or_else(|| {
                StoreError::Storage(format!(
                    "user {} vanished after insert",
                    user.wallet_address
                ))
            })?,
        };
        Ok(UserInsert {
            user: stored,
            created,
        })
    }

    #[instrument(skip(self), fields(wallet = %address), err)]
    async fn increment_jobs_completed(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<u32>, StoreError> {
        let count: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET total_jobs_completed = total_jobs_completed + 1
            WHERE wallet_address = $1
            RETURNING total_jobs_completed
            "#,
        )
        .bind(address.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("increment_jobs_completed", e))?;

        count.map(decode_count).transpose()
    }

    #[instrument(
        skip(self),
        fields(wallet = %address, score = score.value()),
        err
    )]
    async fn set_risk_score(
        &self,
        address: &WalletAddress,
        based_on: u32,
        score: RiskScore,
    ) -> Result<ScoreWrite, StoreError> {
        let expected = i32::try_from(based_on).unwrap_or(i32::MAX);
        let result = sqlx::query(
            r#"
            UPDATE users
            SET current_risk_score = $2
            WHERE wallet_address = $1 AND total_jobs_completed = $3
            "#,
        )
        .bind(address.as_str())
        .bind(i16::from(score.value()))
        .bind(expected)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_risk_score", e))?;

        if result.rows_affected() == 1 {
            return Ok(ScoreWrite::Written);
        }

        let actual: Option<i32> =
            sqlx::query_scalar("SELECT total_jobs_completed FROM users WHERE wallet_address = $1")
                .bind(address.as_str())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("set_risk_score", e))?;

        match actual {
            Some(count) => Ok(ScoreWrite::Stale {
                actual: decode_count(count)?,
            }),
            None => Ok(ScoreWrite::Missing),
        }
    }
}

fn job_from_row(row: &PgRow) -> Result<Job, StoreError> {
    let id: uuid::Uuid = row.try_get("id").map_err(decode_error)?;
    let amount_eth: Decimal = row.try_get("amount_eth").map_err(decode_error)?;
    let employer: String = row.try_get("employer_address").map_err(decode_error)?;
    let worker: Option<String> = row.try_get("worker_address").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode_error)?;

    Ok(Job {
        id: JobId::from_uuid(id),
        title: row.try_get("title").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        amount_eth,
        employer_address: parse_wallet(employer)?,
        worker_address: worker.map(parse_wallet).transpose()?,
        escrow_contract_address: row
            .try_get("escrow_contract_address")
            .map_err(decode_error)?,
        status: parse_status(&status)?,
        start_location: location(row, "start_location_lat", "start_location_lng")?,
        end_location: location(row, "end_location_lat", "end_location_lng")?,
        created_at,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let wallet: String = row.try_get("wallet_address").map_err(decode_error)?;
    let role: String = row.try_get("role").map_err(decode_error)?;
    let score: i16 = row.try_get("current_risk_score").map_err(decode_error)?;
    let count: i32 = row.try_get("total_jobs_completed").map_err(decode_error)?;

    let score = u8::try_from(score)
        .map_err(|_| StoreError::Corrupt(format!("risk score out of range: {score}")))
        .and_then(|v| RiskScore::new(v).map_err(|e| StoreError::Corrupt(e.to_string())))?;

    Ok(User {
        wallet_address: parse_wallet(wallet)?,
        role: role
            .parse::<Role>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        phone_number: row.try_get("phone_number").map_err(decode_error)?,
        email: row.try_get("email").map_err(decode_error)?,
        current_risk_score: score,
        total_jobs_completed: decode_count(count)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn location(row: &PgRow, lat: &str, lng: &str) -> Result<Option<GeoPoint>, StoreError> {
    let lat: Option<f64> = row.try_get(lat).map_err(decode_error)?;
    let lng: Option<f64> = row.try_get(lng).map_err(decode_error)?;
    match (lat, lng) {
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(e.to_string())),
        (None, None) => Ok(None),
        _ => Err(StoreError::Corrupt(
            "location has only one coordinate".to_string(),
        )),
    }
}

fn parse_status(raw: &str) -> Result<JobStatus, StoreError> {
    raw.parse::<JobStatus>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn parse_wallet(raw: String) -> Result<WalletAddress, StoreError> {
    WalletAddress::parse(raw).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode_count(raw: i32) -> Result<u32, StoreError> {
    u32::try_from(raw).map_err(|_| StoreError::Corrupt(format!("negative job count: {raw}")))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::AlreadyExists(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}
