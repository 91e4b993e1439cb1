use anyhow::Context;

use surety_infra::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("invalid settings")?;
    surety_observability::init_with(settings.log_format);

    let app = surety_api::app::build_app(&settings)
        .await
        .context("failed to wire services")?;

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!(
        project = %settings.project_name,
        persistent = settings.database_url.is_some(),
        "listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
