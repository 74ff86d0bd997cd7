//! Live ingestion tests: a wiremock feed behind a real (sqlx test) database.

use pulse_db::{count_items_for_user, create_source, get_source, NewSource};
use pulse_ingest::{run_source, run_user_sources, IngestConfig, ScraperSet};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Maker Notes</title>
    <item>
      <guid>mn-1</guid>
      <title>First post</title>
      <link>https://makernotes.example.com/1</link>
      <description>Body one.</description>
      <pubDate>Tue, 03 Jun 2025 09:30:00 GMT</pubDate>
    </item>
    <item>
      <guid>mn-2</guid>
      <title>Second post</title>
      <link>https://makernotes.example.com/2</link>
      <description>Body two.</description>
    </item>
  </channel>
</rss>"#;

fn test_scrapers() -> ScraperSet {
    ScraperSet::from_config(&IngestConfig {
        social_api_token: None,
        video_api_key: None,
        page_api_key: None,
        request_timeout_secs: 5,
        user_agent: "pulse-test/0.1".to_string(),
    })
    .expect("scraper set")
}

async fn insert_test_user(pool: &sqlx::PgPool, email: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO users (email) VALUES ($1) RETURNING id")
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("insert user")
}

async fn feed_source(pool: &sqlx::PgPool, user_id: i64, locator: &str) -> pulse_db::SourceRow {
    create_source(
        pool,
        &NewSource {
            user_id,
            name: "Maker Notes",
            source_type: "feed",
            locator,
            max_items: 10,
            sort_mode: None,
            lookback_hours: None,
        },
    )
    .await
    .expect("create source")
}

#[sqlx::test(migrations = "../../migrations")]
async fn feed_source_ingests_and_dedups_across_runs(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_RSS))
        .mount(&server)
        .await;

    let user_id = insert_test_user(&pool, "ingest@example.com").await;
    let source = feed_source(&pool, user_id, &format!("{}/feed.xml", server.uri())).await;
    let scrapers = test_scrapers();

    let first = run_source(&pool, &scrapers, &source)
        .await
        .expect("first run");
    assert_eq!(first.items_fetched, 2);
    assert_eq!(first.items_inserted, 2);
    assert_eq!(first.duplicates_skipped, 0);

    // Second run fetches the same feed; the unique index swallows both rows.
    let second = run_source(&pool, &scrapers, &source)
        .await
        .expect("second run");
    assert_eq!(second.items_inserted, 0);
    assert_eq!(second.duplicates_skipped, 2);

    assert_eq!(count_items_for_user(&pool, user_id).await.unwrap(), 2);

    let reloaded = get_source(&pool, user_id, source.id)
        .await
        .expect("get_source")
        .expect("source exists");
    assert_eq!(reloaded.last_run_status, "succeeded");
    assert_eq!(reloaded.items_last_run, 0);
    assert_eq!(reloaded.total_items, 2);
    assert!(reloaded.last_run_at.is_some());
    assert!(reloaded.last_error.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn scrape_failure_is_recorded_without_blocking_siblings(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_RSS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bad.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let user_id = insert_test_user(&pool, "mixed@example.com").await;
    let bad = feed_source(&pool, user_id, &format!("{}/bad.xml", server.uri())).await;
    let good = feed_source(&pool, user_id, &format!("{}/good.xml", server.uri())).await;
    let scrapers = test_scrapers();

    let summary = run_user_sources(&pool, &scrapers, user_id)
        .await
        .expect("run_user_sources");

    assert_eq!(summary.sources_processed, 2);
    assert_eq!(summary.items_inserted, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, bad.id);

    let bad_row = get_source(&pool, user_id, bad.id).await.unwrap().unwrap();
    assert_eq!(bad_row.last_run_status, "failed");
    assert!(bad_row.last_error.is_some());

    let good_row = get_source(&pool, user_id, good.id).await.unwrap().unwrap();
    assert_eq!(good_row.last_run_status, "succeeded");
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_credential_fails_only_that_source(pool: sqlx::PgPool) {
    let user_id = insert_test_user(&pool, "nocreds@example.com").await;
    create_source(
        &pool,
        &NewSource {
            user_id,
            name: "Timeline",
            source_type: "social",
            locator: "@maker",
            max_items: 20,
            sort_mode: None,
            lookback_hours: None,
        },
    )
    .await
    .expect("create source");

    let scrapers = test_scrapers();
    let summary = run_user_sources(&pool, &scrapers, user_id)
        .await
        .expect("run_user_sources");

    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].1.contains("PULSE_SOCIAL_API_TOKEN"));
}
