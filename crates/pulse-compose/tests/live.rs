//! End-to-end composition tests: sqlx test database + wiremock backend.

use chrono::{Duration, Utc};
use pulse_compose::{generate_draft, train_voice, ComposeError, GenTextClient};
use pulse_db::{create_source, insert_content_item, NewContentItem, NewSource};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATED_NEWSLETTER: &str = "\
# Creators Are Shipping Fast This Week\n\
\n\
The pace picked up again. Here is what mattered.\n\
Three launches, one deep dive, and a trend to watch.\n\
\n\
## What's Hot Right Now\n\
- [First post](https://example.com/1) made the rounds.\n\
\n\
## Worth Your Time\n\
- A slower read worth the minutes.\n\
\n\
## On The Radar\n\
- Something is brewing.\n\
\n\
Reply and tell me what you shipped.\n\
See you next week.\n";

async fn insert_test_user(pool: &sqlx::PgPool, email: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO users (email) VALUES ($1) RETURNING id")
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("insert user")
}

async fn seed_source(pool: &sqlx::PgPool, user_id: i64) -> i64 {
    create_source(
        pool,
        &NewSource {
            user_id,
            name: "Feed",
            source_type: "feed",
            locator: "https://example.com/feed.xml",
            max_items: 50,
            sort_mode: None,
            lookback_hours: None,
        },
    )
    .await
    .expect("create source")
    .id
}

async fn seed_item(
    pool: &sqlx::PgPool,
    user_id: i64,
    source_id: i64,
    external_id: &str,
    hours_ago: i64,
    likes: i64,
) {
    insert_content_item(
        pool,
        &NewContentItem {
            user_id,
            source_id,
            external_id,
            title: &format!("Item {external_id}"),
            content_text: "A body long enough to be summarised in the curated list.",
            url: &format!("https://example.com/{external_id}"),
            author: "author",
            published_at: Utc::now() - Duration::hours(hours_ago),
            engagement_likes: likes,
            engagement_shares: 0,
            engagement_comments: 0,
            engagement_views: 0,
            engagement_score: pulse_core::normalize_engagement(likes, 0, 0),
            media_urls: &[],
            hashtags: &[],
        },
    )
    .await
    .expect("insert item")
    .expect("item should be new");
}

fn chat_response(content: &str) -> serde_json::Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
}

async fn mock_backend(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(content)))
        .mount(server)
        .await;
}

fn backend_client(server: &MockServer) -> GenTextClient {
    GenTextClient::with_base_url("key", "test-model", 4000, 5, &server.uri()).expect("client")
}

/// Six primary items, two evergreen, one extra trending candidate;
/// composition with an untrained profile produces a full draft row.
#[sqlx::test(migrations = "../../migrations")]
async fn end_to_end_draft_from_untrained_profile(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mock_backend(&server, GENERATED_NEWSLETTER).await;

    let user_id = insert_test_user(&pool, "compose@example.com").await;
    let source_id = seed_source(&pool, user_id).await;

    for (index, likes) in [100_i64, 900, 50, 300, 20, 700].iter().enumerate() {
        seed_item(&pool, user_id, source_id, &format!("p-{index}"), 3 + index as i64, *likes).await;
    }
    seed_item(&pool, user_id, source_id, "e-1", 4 * 24, 400).await;
    seed_item(&pool, user_id, source_id, "e-2", 6 * 24, 80).await;
    seed_item(&pool, user_id, source_id, "t-1", 60, 999).await;

    let draft = generate_draft(&pool, &backend_client(&server), user_id)
        .await
        .expect("generate_draft");

    assert_eq!(draft.status, "draft");
    assert_eq!(draft.ai_title, "Creators Are Shipping Fast This Week");
    assert!(!draft.ai_body.is_empty());
    assert!(!draft.ai_intro.is_empty());
    assert!(!draft.ai_closing.is_empty());

    let curated = draft.curated_items.as_array().expect("curated array");
    assert!(curated.len() <= 10);
    assert!(curated.len() <= 6, "curated comes from the primary tier only");
    assert!(!curated.is_empty());
    assert!(curated[0]["engagement"]["likes"].is_number());

    let trends = draft.trending_items.as_array().expect("trends array");
    assert!(trends.len() <= 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn four_tiered_items_is_insufficient(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mock_backend(&server, GENERATED_NEWSLETTER).await;

    let user_id = insert_test_user(&pool, "thin@example.com").await;
    let source_id = seed_source(&pool, user_id).await;

    // Four items deep in the evergreen band: no primary/trending overlap,
    // so the tiered total is exactly 4.
    for index in 0..4 {
        seed_item(&pool, user_id, source_id, &format!("e-{index}"), 5 * 24, 10).await;
    }

    let err = generate_draft(&pool, &backend_client(&server), user_id)
        .await
        .expect_err("4 items must be rejected");
    assert!(matches!(
        err,
        ComposeError::InsufficientContent { found: 4, .. }
    ));

    // One more evergreen item clears the floor.
    seed_item(&pool, user_id, source_id, "e-4", 5 * 24, 10).await;
    generate_draft(&pool, &backend_client(&server), user_id)
        .await
        .expect("5 items must proceed");
}

#[sqlx::test(migrations = "../../migrations")]
async fn backend_failure_persists_nothing(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let user_id = insert_test_user(&pool, "failing@example.com").await;
    let source_id = seed_source(&pool, user_id).await;
    for index in 0..6 {
        seed_item(&pool, user_id, source_id, &format!("p-{index}"), 3, 100).await;
    }

    let err = generate_draft(&pool, &backend_client(&server), user_id)
        .await
        .expect_err("backend failure must propagate");
    assert!(matches!(err, ComposeError::GenerationFailed(_)));

    let drafts = pulse_db::list_drafts_for_user(&pool, user_id, 10)
        .await
        .expect("list drafts");
    assert!(drafts.is_empty(), "no partial draft may be persisted");
}

#[sqlx::test(migrations = "../../migrations")]
async fn training_stores_defaults_for_missing_fields(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    // tone is missing; vocabularyLevel is valid; the payload is wrapped in
    // prose to exercise balanced-block extraction.
    mock_backend(
        &server,
        "Here you go:\n{\"vocabularyLevel\": \"advanced\", \"useEmojis\": true}\nCheers!",
    )
    .await;

    let user_id = insert_test_user(&pool, "train@example.com").await;
    let samples = vec![
        "A first writing sample. It has two sentences.".to_string(),
        "Another sample with enough words to matter!".to_string(),
    ];

    let profile = train_voice(&pool, &backend_client(&server), user_id, &samples)
        .await
        .expect("train_voice");

    assert!(profile.trained);
    assert_eq!(profile.sample_count, 2);
    assert_eq!(
        profile.style_parameters.vocabulary_level,
        pulse_core::voice::VocabularyLevel::Advanced
    );
    assert_eq!(
        profile.style_parameters.tone,
        pulse_core::voice::Tone::Professional,
        "missing tone must default"
    );
    assert!(profile.style_parameters.use_emojis);

    let stored = pulse_db::get_voice_profile(&pool, user_id)
        .await
        .expect("get_voice_profile")
        .expect("profile stored");
    assert_eq!(stored.sample_count, 2);
    assert_eq!(stored.profile["trained"], json!(true));
}

#[sqlx::test(migrations = "../../migrations")]
async fn unparseable_analysis_leaves_profile_untouched(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mock_backend(&server, "I could not analyse that, sorry.").await;

    let user_id = insert_test_user(&pool, "nopayload@example.com").await;
    let samples = vec!["Sample text for the analyser.".to_string()];

    let err = train_voice(&pool, &backend_client(&server), user_id, &samples)
        .await
        .expect_err("prose-only response must fail");
    assert!(matches!(err, ComposeError::VoiceAnalysisFailed));

    assert!(pulse_db::get_voice_profile(&pool, user_id)
        .await
        .expect("get_voice_profile")
        .is_none());
}
