//! Newsletter delivery pipeline.
//!
//! Renders the most recent unsent draft and sends it to every recipient
//! through a transactional email API. A draft is only marked `sent` when
//! *zero* recipients failed; any failure leaves the draft unsent so the
//! next attempt resends to everyone.

pub mod client;
pub mod error;
pub mod pipeline;
pub mod render;

pub use client::EmailClient;
pub use error::DeliverError;
pub use pipeline::{send_latest_draft, SendReport};
pub use render::render_email_html;
