use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Chat-completions endpoint for newsletter generation and style analysis.
    pub generation_base_url: String,
    pub generation_api_key: Option<String>,
    pub generation_model: String,
    pub generation_timeout_secs: u64,
    pub generation_max_tokens: u32,
    /// Transactional email API used by the delivery pipeline.
    pub email_base_url: String,
    pub email_api_key: Option<String>,
    pub email_sender: String,
    pub social_api_token: Option<String>,
    pub video_api_key: Option<String>,
    pub page_api_key: Option<String>,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("generation_base_url", &self.generation_base_url)
            .field(
                "generation_api_key",
                &self.generation_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("generation_model", &self.generation_model)
            .field("generation_timeout_secs", &self.generation_timeout_secs)
            .field("generation_max_tokens", &self.generation_max_tokens)
            .field("email_base_url", &self.email_base_url)
            .field(
                "email_api_key",
                &self.email_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("email_sender", &self.email_sender)
            .field(
                "social_api_token",
                &self.social_api_token.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "video_api_key",
                &self.video_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "page_api_key",
                &self.page_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .finish()
    }
}
