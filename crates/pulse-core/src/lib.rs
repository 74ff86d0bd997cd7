//! Core domain types and pure logic for the newsletter pipeline.
//!
//! Everything here is deliberately free of I/O: engagement scoring, the
//! scheduling gate, and the voice-profile model are pure functions over
//! explicit inputs so the pipeline crates can be tested without a database
//! or a network.

pub mod app_config;
pub mod config;
pub mod engagement;
pub mod schedule;
pub mod types;
pub mod voice;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use engagement::normalize_engagement;
pub use schedule::{is_due, DeliveryFrequency, DeliverySchedule};
pub use types::SourceType;
pub use voice::{StyleParameters, TrainingExample, Vocabulary, VoiceProfile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
