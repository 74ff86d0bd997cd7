//! Send orchestration: all-or-nothing draft delivery.

use serde_json::json;
use sqlx::PgPool;

use crate::client::EmailClient;
use crate::error::DeliverError;
use crate::render::render_email_html;

/// Outcome of a fully successful send.
#[derive(Debug, Clone, Copy)]
pub struct SendReport {
    pub draft_id: i64,
    pub delivered: usize,
}

/// Deliver the user's most recent unsent draft to every recipient.
///
/// The user-edited body wins over the AI body when present. Recipients are
/// attempted one by one; individual failures are logged and counted but do
/// not stop the loop. The draft transitions to `sent` only when every
/// recipient succeeded; otherwise it stays in `draft` status and the
/// whole call reports [`DeliverError::PartialFailure`], so the next
/// attempt resends to everyone.
///
/// # Errors
///
/// - [`DeliverError::NoDraft`] when no unsent draft exists.
/// - [`DeliverError::NoRecipients`] when nobody can receive it.
/// - [`DeliverError::PartialFailure`] when at least one recipient failed.
/// - [`DeliverError::Db`] when persistence fails.
pub async fn send_latest_draft(
    pool: &PgPool,
    client: &EmailClient,
    sender: &str,
    user_id: i64,
) -> Result<SendReport, DeliverError> {
    let draft = pulse_db::latest_unsent_draft(pool, user_id)
        .await?
        .ok_or(DeliverError::NoDraft)?;

    let recipients = pulse_db::recipient_emails(pool).await?;
    if recipients.is_empty() {
        return Err(DeliverError::NoRecipients);
    }

    let subject = draft.ai_title.clone();
    let html = render_email_html(&draft.ai_title, draft.delivery_body(), &draft.curated_items);

    let mut delivered = 0usize;
    let mut failed = 0usize;

    for recipient in &recipients {
        match client.send(sender, recipient, &subject, &html).await {
            Ok(message_id) => {
                tracing::debug!(recipient = %recipient, message_id = %message_id, "deliver: recipient ok");
                delivered += 1;
            }
            Err(e) => {
                tracing::warn!(recipient = %recipient, error = %e, "deliver: recipient failed");
                failed += 1;
            }
        }
    }

    tracing::info!(
        user_id,
        draft_id = draft.id,
        delivered,
        failed,
        "deliver: send pass complete"
    );

    if failed > 0 {
        // Draft deliberately left unsent; there is no per-recipient resume.
        return Err(DeliverError::PartialFailure {
            attempted: recipients.len(),
            failed,
        });
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let delivered_count = delivered as i32;
    pulse_db::mark_draft_sent(pool, draft.id, delivered_count).await?;

    pulse_db::insert_activity_event(
        pool,
        user_id,
        "draft_sent",
        "Newsletter sent",
        &format!("Sent \"{subject}\" to {delivered} subscribers"),
        json!({ "draft_id": draft.id, "recipients_count": delivered }),
    )
    .await?;

    Ok(SendReport {
        draft_id: draft.id,
        delivered,
    })
}
