use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;
use tracing_subscriber::EnvFilter;

use skyguard::error::SkyGuardError;
use skyguard::router::router;
use skyguard::state::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("skyguard=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    info!(backend = %config.backend_base_url, "starting SkyGuard");

    let state = Arc::new(AppState::from_config(&config)?);
    let _scheduler = schedule_cache_sweep(Arc::clone(&state), &config.cache_sweep_cron).await?;

    let app = router(state, &config.static_dir);
    let listener = tokio::net::TcpListener::bind(config.bind_address.as_str()).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drops expired cache entries. Never calls the backend.
async fn schedule_cache_sweep(
    state: Arc<AppState>,
    cron: &str,
) -> Result<JobScheduler, SkyGuardError> {
    let scheduler = JobScheduler::new().await?;
    let job = Job::new_async(cron, move |_id, _scheduler| {
        let state = Arc::clone(&state);
        Box::pin(async move {
            state.dashboard.sweep_caches().await;
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    info!(cron, "cache sweep scheduled");
    Ok(scheduler)
}
