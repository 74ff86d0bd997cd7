//! Operator CLI: run the scrape/generate/send pipelines by hand and apply
//! migrations, outside the scheduled jobs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pulse_compose::GenTextClient;
use pulse_deliver::EmailClient;
use pulse_ingest::{IngestConfig, ScraperSet};

#[derive(Debug, Parser)]
#[command(name = "pulse-cli")]
#[command(about = "Pulse newsletter pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations.
    Migrate,
    /// Scrape active sources : one user's or everyone's.
    Scrape {
        #[arg(long)]
        user: Option<i64>,
    },
    /// Generate a newsletter draft for one user.
    Generate {
        #[arg(long)]
        user: i64,
    },
    /// Send the most recent unsent draft for one user.
    Send {
        #[arg(long)]
        user: i64,
    },
    /// Train a user's voice profile from a samples file.
    ///
    /// The file holds writing samples separated by blank lines.
    Train {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        samples: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = pulse_core::load_app_config()?;
    let pool = pulse_db::connect_pool(
        &config.database_url,
        pulse_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match cli.command {
        Commands::Migrate => {
            pulse_db::run_migrations(&pool).await?;
            println!("migrations applied");
        }
        Commands::Scrape { user } => {
            let scrapers = ScraperSet::from_config(&IngestConfig::from_app_config(&config))?;
            let summary = match user {
                Some(user_id) => pulse_ingest::run_user_sources(&pool, &scrapers, user_id).await?,
                None => pulse_ingest::run_all_sources(&pool, &scrapers).await?,
            };
            println!(
                "scraped {} sources: {} new items, {} failures",
                summary.sources_processed,
                summary.items_inserted,
                summary.failures.len()
            );
            for (source_id, error) in &summary.failures {
                println!("  source {source_id} failed: {error}");
            }
        }
        Commands::Generate { user } => {
            let client = GenTextClient::from_app_config(&config)?;
            let draft = pulse_compose::generate_draft(&pool, &client, user).await?;
            println!(
                "draft {} created: \"{}\" ({} ms)",
                draft.id, draft.ai_title, draft.generation_ms
            );
        }
        Commands::Send { user } => {
            let client = EmailClient::from_app_config(&config)?;
            let report =
                pulse_deliver::send_latest_draft(&pool, &client, &config.email_sender, user)
                    .await?;
            println!(
                "draft {} sent to {} recipients",
                report.draft_id, report.delivered
            );
        }
        Commands::Train { user, samples } => {
            let raw = std::fs::read_to_string(&samples)?;
            let parsed = split_samples(&raw);
            anyhow::ensure!(!parsed.is_empty(), "no samples found in {}", samples.display());

            let client = GenTextClient::from_app_config(&config)?;
            let profile = pulse_compose::train_voice(&pool, &client, user, &parsed).await?;
            println!(
                "voice profile trained from {} samples (tone: {:?})",
                profile.sample_count, profile.style_parameters.tone
            );
        }
    }

    Ok(())
}

/// Split a samples file into individual samples on blank lines.
fn split_samples(raw: &str) -> Vec<String> {
    raw.split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
