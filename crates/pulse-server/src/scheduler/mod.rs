//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring scrape, generate, and send jobs. The jobs tick on fixed
//! cron expressions; whether any given user acts on a tick is decided by
//! the pure scheduling gate in `pulse-core`.

mod newsletter;

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use pulse_ingest::{IngestConfig, ScraperSet};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<pulse_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_scrape_job(&scheduler, pool.clone(), Arc::clone(&config)).await?;
    newsletter::register_generate_job(&scheduler, pool.clone(), Arc::clone(&config)).await?;
    newsletter::register_send_job(&scheduler, pool, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the six-hourly scrape job (`0 15 */6 * * *`).
///
/// Refreshes every active source for every user. Per-source failures are
/// recorded on the source rows by the ingest pipeline and never abort the
/// run.
async fn register_scrape_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<pulse_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let cron =
        std::env::var("PULSE_SCRAPE_CRON").unwrap_or_else(|_| "0 15 */6 * * *".to_string());
    let pool = Arc::new(pool);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting scrape run");
            run_scrape_job(&pool, &config).await;
            tracing::info!("scheduler: scrape run complete");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered scrape job");
    Ok(())
}

async fn run_scrape_job(pool: &PgPool, config: &pulse_core::AppConfig) {
    let scrapers = match ScraperSet::from_config(&IngestConfig::from_app_config(config)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: scraper set construction failed");
            return;
        }
    };

    match pulse_ingest::run_all_sources(pool, &scrapers).await {
        Ok(summary) => {
            tracing::info!(
                sources = summary.sources_processed,
                inserted = summary.items_inserted,
                failures = summary.failures.len(),
                "scheduler: scrape summary"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: scrape run failed to start");
        }
    }
}
