//! Scheduled newsletter jobs: hourly generate and hourly send.
//!
//! Both jobs iterate all active users and consult the scheduling gate
//! independently; a user can be due for a send without being due for a
//! fresh generation. One user's failure never aborts the rest of the
//! batch; outcomes land in the log and (for generations) the activity
//! feed.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use pulse_compose::{ComposeError, GenTextClient};
use pulse_core::{is_due, DeliverySchedule};
use pulse_db::UserRow;
use pulse_deliver::{DeliverError, EmailClient};

/// Register the hourly draft-generation job (`0 0 * * * *`).
pub(super) async fn register_generate_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<pulse_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let cron =
        std::env::var("PULSE_GENERATE_CRON").unwrap_or_else(|_| "0 0 * * * *".to_string());
    let pool = Arc::new(pool);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting generate tick");
            run_generate_tick(&pool, &config).await;
            tracing::info!("scheduler: generate tick complete");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered generate job");
    Ok(())
}

/// Register the hourly send job (`0 30 * * * *`).
///
/// Offset to half past so a draft generated at the top of the same hour
/// is already in place when its send gate opens.
pub(super) async fn register_send_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<pulse_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let cron = std::env::var("PULSE_SEND_CRON").unwrap_or_else(|_| "0 30 * * * *".to_string());
    let pool = Arc::new(pool);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting send tick");
            run_send_tick(&pool, &config).await;
            tracing::info!("scheduler: send tick complete");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered send job");
    Ok(())
}

async fn run_generate_tick(pool: &PgPool, config: &pulse_core::AppConfig) {
    let client = match GenTextClient::from_app_config(config) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "scheduler: generation backend unavailable; skipping tick");
            return;
        }
    };

    let users = match pulse_db::list_active_users(pool).await {
        Ok(u) => u,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: generate tick failed to list users");
            return;
        }
    };

    let now = Utc::now();
    let mut generated = 0usize;

    for user in &users {
        let Some(schedule) = parse_schedule(user) else {
            continue;
        };
        if !is_due(schedule, now) {
            tracing::debug!(user_id = user.id, "scheduler: generate not due");
            continue;
        }

        match pulse_compose::generate_draft(pool, &client, user.id).await {
            Ok(draft) => {
                tracing::info!(user_id = user.id, draft_id = draft.id, "scheduler: draft generated");
                generated += 1;
            }
            Err(ComposeError::InsufficientContent { found, minimum }) => {
                tracing::info!(
                    user_id = user.id,
                    found,
                    minimum,
                    "scheduler: not enough content; skipping user"
                );
            }
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "scheduler: generation failed");
            }
        }
    }

    tracing::info!(users = users.len(), generated, "scheduler: generate tick summary");
}

async fn run_send_tick(pool: &PgPool, config: &pulse_core::AppConfig) {
    let client = match EmailClient::from_app_config(config) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "scheduler: email backend unavailable; skipping tick");
            return;
        }
    };

    let users = match pulse_db::list_active_users(pool).await {
        Ok(u) => u,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: send tick failed to list users");
            return;
        }
    };

    let now = Utc::now();
    let mut sent = 0usize;

    for user in &users {
        let Some(schedule) = parse_schedule(user) else {
            continue;
        };
        if !is_due(schedule, now) {
            tracing::debug!(user_id = user.id, "scheduler: send not due");
            continue;
        }

        match pulse_deliver::send_latest_draft(pool, &client, &config.email_sender, user.id).await
        {
            Ok(report) => {
                tracing::info!(
                    user_id = user.id,
                    draft_id = report.draft_id,
                    delivered = report.delivered,
                    "scheduler: newsletter sent"
                );
                sent += 1;
            }
            Err(DeliverError::NoDraft) => {
                tracing::info!(user_id = user.id, "scheduler: no unsent draft; skipping user");
            }
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "scheduler: send failed");
            }
        }
    }

    tracing::info!(users = users.len(), sent, "scheduler: send tick summary");
}

/// Parse a user's stored preferences; invalid rows are logged and skipped
/// rather than poisoning the batch.
fn parse_schedule(user: &UserRow) -> Option<DeliverySchedule> {
    match DeliverySchedule::parse(
        &user.delivery_frequency,
        &user.delivery_day,
        user.delivery_hour,
    ) {
        Ok(schedule) => Some(schedule),
        Err(reason) => {
            tracing::warn!(user_id = user.id, reason = %reason, "scheduler: invalid delivery preferences");
            None
        }
    }
}
