use pulse_scraper::{FeedClient, ForumClient, PageClient, ScrapeError, SocialClient, VideoClient};

/// Settings for building the scraper clients.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub social_api_token: Option<String>,
    pub video_api_key: Option<String>,
    pub page_api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl IngestConfig {
    #[must_use]
    pub fn from_app_config(config: &pulse_core::AppConfig) -> Self {
        Self {
            social_api_token: config.social_api_token.clone(),
            video_api_key: config.video_api_key.clone(),
            page_api_key: config.page_api_key.clone(),
            request_timeout_secs: config.scraper_request_timeout_secs,
            user_agent: config.scraper_user_agent.clone(),
        }
    }
}

/// One client per source type. Clients that need credentials are only
/// present when the credential is configured; sources of that type fail
/// with a recorded error instead of taking the whole run down.
pub struct ScraperSet {
    pub feed: FeedClient,
    pub forum: ForumClient,
    pub social: Option<SocialClient>,
    pub video: Option<VideoClient>,
    pub page: Option<PageClient>,
}

impl ScraperSet {
    /// Build the full client set from config.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if any underlying HTTP client cannot
    /// be constructed.
    pub fn from_config(config: &IngestConfig) -> Result<Self, ScrapeError> {
        let timeout = config.request_timeout_secs;
        let ua = &config.user_agent;

        Ok(Self {
            feed: FeedClient::new(timeout, ua)?,
            forum: ForumClient::new(timeout, ua)?,
            social: config
                .social_api_token
                .as_deref()
                .map(|token| SocialClient::new(token, timeout, ua))
                .transpose()?,
            video: config
                .video_api_key
                .as_deref()
                .map(|key| VideoClient::new(key, timeout, ua))
                .transpose()?,
            page: config
                .page_api_key
                .as_deref()
                .map(|key| PageClient::new(key, timeout, ua))
                .transpose()?,
        })
    }
}

/// Result of scraping a single source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceScrapeResult {
    pub items_fetched: usize,
    pub items_inserted: usize,
    pub duplicates_skipped: usize,
}

/// Aggregate result of a multi-source run.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub sources_processed: usize,
    pub items_inserted: usize,
    pub failures: Vec<(i64, String)>,
}
