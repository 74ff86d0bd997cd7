//! Delivery pipeline tests: sqlx test database + wiremock email API.

use pulse_db::{insert_draft, NewDraft};
use pulse_deliver::{send_latest_draft, DeliverError, EmailClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SENDER: &str = "Pulse <news@pulse.dev>";

async fn insert_user(pool: &sqlx::PgPool, email: &str, notifications: bool) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (email, email_notifications) VALUES ($1, $2) RETURNING id",
    )
    .bind(email)
    .bind(notifications)
    .fetch_one(pool)
    .await
    .expect("insert user")
}

async fn seed_draft(pool: &sqlx::PgPool, user_id: i64) -> i64 {
    insert_draft(
        pool,
        &NewDraft {
            user_id,
            ai_title: "The Weekly Pulse",
            ai_body: "## What's Hot\n- [thing](https://example.com/t)\nBye.",
            ai_intro: "intro",
            ai_closing: "Bye.",
            curated_items: json!([{ "title": "thing", "url": "https://example.com/t" }]),
            trending_items: json!([]),
            generation_ms: 900,
        },
    )
    .await
    .expect("insert draft")
    .id
}

fn accept_all() -> wiremock::Mock {
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg" })))
}

#[sqlx::test(migrations = "../../migrations")]
async fn full_success_marks_draft_sent(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    accept_all().expect(2).mount(&server).await;

    let owner = insert_user(&pool, "owner@example.com", true).await;
    insert_user(&pool, "reader@example.com", true).await;
    insert_user(&pool, "optout@example.com", false).await;
    let draft_id = seed_draft(&pool, owner).await;

    let client = EmailClient::with_base_url("key", 5, &server.uri()).expect("client");
    let report = send_latest_draft(&pool, &client, SENDER, owner)
        .await
        .expect("send");

    assert_eq!(report.draft_id, draft_id);
    assert_eq!(report.delivered, 2, "opted-out user is not a recipient");

    let draft = pulse_db::get_draft(&pool, owner, draft_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(draft.status, "sent");
    assert!(draft.sent_at.is_some());
    assert_eq!(draft.delivered_count, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn one_failed_recipient_leaves_draft_unsent(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    // The second recipient's address is rejected; the first succeeds.
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(json!({ "to": ["reader@example.com"] })))
        .respond_with(ResponseTemplate::new(422).set_body_string("blocked"))
        .mount(&server)
        .await;
    accept_all().mount(&server).await;

    let owner = insert_user(&pool, "owner@example.com", true).await;
    insert_user(&pool, "reader@example.com", true).await;
    let draft_id = seed_draft(&pool, owner).await;

    let client = EmailClient::with_base_url("key", 5, &server.uri()).expect("client");
    let err = send_latest_draft(&pool, &client, SENDER, owner)
        .await
        .expect_err("partial failure must propagate");
    assert!(matches!(
        err,
        DeliverError::PartialFailure {
            attempted: 2,
            failed: 1
        }
    ));

    let draft = pulse_db::get_draft(&pool, owner, draft_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(draft.status, "draft", "draft must stay unsent for a clean retry");
    assert!(draft.sent_at.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn user_edited_body_wins_over_ai_body(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    // Assert on the request body: the edited text must be in the HTML.
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(wiremock::matchers::body_string_contains("hand-rewritten"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg" })))
        .expect(1)
        .mount(&server)
        .await;

    let owner = insert_user(&pool, "owner@example.com", true).await;
    let draft_id = seed_draft(&pool, owner).await;
    pulse_db::update_draft_body(&pool, owner, draft_id, "This was hand-rewritten.", 45)
        .await
        .expect("edit body");

    let client = EmailClient::with_base_url("key", 5, &server.uri()).expect("client");
    send_latest_draft(&pool, &client, SENDER, owner)
        .await
        .expect("send");
}

#[sqlx::test(migrations = "../../migrations")]
async fn no_unsent_draft_is_reported(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let owner = insert_user(&pool, "owner@example.com", true).await;

    let client = EmailClient::with_base_url("key", 5, &server.uri()).expect("client");
    let err = send_latest_draft(&pool, &client, SENDER, owner)
        .await
        .expect_err("no draft");
    assert!(matches!(err, DeliverError::NoDraft));
}
