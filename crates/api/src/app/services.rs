use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use surety_infra::store::migrate;
use surety_infra::{
    InMemoryJobStore, InMemoryUserStore, JobLifecycleManager, JobStore, PostgresJobStore,
    PostgresUserStore, Settings, StoreError, UserStore,
};
use surety_risk::CompletionCountModel;

/// Lifecycle manager over type-erased stores, so either backend plugs in.
pub type Lifecycle = JobLifecycleManager<Arc<dyn JobStore>, Arc<dyn UserStore>>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migration(#[from] StoreError),
}

/// Everything handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub project_name: String,
    pub lifecycle: Lifecycle,
}

impl AppServices {
    pub fn new(project_name: impl Into<String>, jobs: Arc<dyn JobStore>, users: Arc<dyn UserStore>) -> Self {
        Self {
            project_name: project_name.into(),
            lifecycle: JobLifecycleManager::new(jobs, users, CompletionCountModel::default()),
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(project_name: impl Into<String>) -> Self {
        Self::new(
            project_name,
            Arc::new(InMemoryJobStore::new()),
            Arc::new(InMemoryUserStore::new()),
        )
    }
}

pub async fn build_services(settings: &Settings) -> Result<AppServices, StartupError> {
    let Some(url) = settings.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; using in-memory stores");
        return Ok(AppServices::in_memory(settings.project_name.clone()));
    };

    let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
    migrate(&pool).await?;
    tracing::info!("connected to postgres; schema ready");

    Ok(AppServices::new(
        settings.project_name.clone(),
        Arc::new(PostgresJobStore::new(pool.clone())),
        Arc::new(PostgresUserStore::new(pool)),
    ))
}
