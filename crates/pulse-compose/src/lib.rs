//! Newsletter composition pipeline.
//!
//! Categorizes a user's content pool into three priority tiers, briefs a
//! generative-text backend in the user's learned voice, parses the result,
//! and persists the draft. Also owns voice-profile training, which shares
//! the same backend.

pub mod brief;
pub mod categorize;
pub mod client;
pub mod draft_text;
pub mod error;
pub mod pipeline;
pub mod train;

pub use categorize::{categorize, Tiers, MIN_TIERED_ITEMS};
pub use client::GenTextClient;
pub use draft_text::{parse_generated, ParsedDraft};
pub use error::ComposeError;
pub use pipeline::generate_draft;
pub use train::train_voice;
