//! Application configuration structures.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::MarkupSelectors;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listing source and HTTP client settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Attempt-level retry behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Cycle timing
    #[serde(default)]
    pub poll: PollConfig,

    /// Message delivery settings
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// CSS selectors describing the listing and detail markup
    #[serde(default)]
    pub markup: MarkupSelectors,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override file values with the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Override values from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.notifier.bot_token = token;
        }
        if let Some(chat_id) = lookup("CHANNEL_ID") {
            self.notifier.chat_id = chat_id;
        }
        if let Some(proxy) = lookup("PROXY_URL") {
            self.source.proxy = Some(proxy);
        }
        if let Some(listing) = lookup("LISTING_URL") {
            self.source.listing_url = listing;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.listing_url.trim().is_empty() {
            return Err(AppError::validation("source.listing_url is empty"));
        }
        url::Url::parse(&self.source.listing_url)
            .map_err(|e| AppError::validation(format!("source.listing_url: {e}")))?;
        if let Some(proxy) = &self.source.proxy {
            url::Url::parse(proxy)
                .map_err(|e| AppError::validation(format!("source.proxy: {e}")))?;
        }
        if self.source.canonical_host.trim().is_empty() {
            return Err(AppError::validation("source.canonical_host is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.fetch.max_retries == 0 {
            return Err(AppError::validation("fetch.max_retries must be > 0"));
        }
        if self.poll.interval_secs == 0 {
            return Err(AppError::validation("poll.interval_secs must be > 0"));
        }
        if self.poll.failure_delay_secs == 0 {
            return Err(AppError::validation("poll.failure_delay_secs must be > 0"));
        }
        if self.poll.snapshot_interval_secs == 0 {
            return Err(AppError::validation(
                "poll.snapshot_interval_secs must be > 0",
            ));
        }
        if self.notifier.template.trim().is_empty() {
            return Err(AppError::validation("notifier.template is empty"));
        }
        self.markup.validate()?;
        Ok(())
    }
}

/// Listing source and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Catalog page sorted newest-first
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,

    /// Host used when building canonical detail links
    #[serde(default = "defaults::canonical_host")]
    pub canonical_host: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Optional forward proxy for every outbound page request
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listing_url: defaults::listing_url(),
            canonical_host: defaults::canonical_host(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            proxy: None,
        }
    }
}

/// Attempt-level retry settings shared by listing and detail fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Total attempts per fetch, including the first one
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Fixed pause between attempts in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,
}

impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
        }
    }
}

/// Cycle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Pause after a completed cycle
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Pause after the listing could not be fetched
    #[serde(default = "defaults::failure_delay")]
    pub failure_delay_secs: u64,

    /// How often the request-state snapshot is logged
    #[serde(default = "defaults::snapshot_interval")]
    pub snapshot_interval_secs: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn failure_delay(&self) -> Duration {
        Duration::from_secs(self.failure_delay_secs)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            failure_delay_secs: defaults::failure_delay(),
            snapshot_interval_secs: defaults::snapshot_interval(),
        }
    }
}

/// Message delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Bot API root, without the `/bot<token>` suffix
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Bot token, usually supplied through `TELEGRAM_BOT_TOKEN`
    #[serde(default)]
    pub bot_token: String,

    /// Target chat or channel, usually supplied through `CHANNEL_ID`
    #[serde(default)]
    pub chat_id: String,

    /// Message template, see `EnrichedItem::format`
    #[serde(default = "defaults::template")]
    pub template: String,

    /// Log messages instead of sending them
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            bot_token: String::new(),
            chat_id: String::new(),
            template: defaults::template(),
            dry_run: false,
        }
    }
}

mod defaults {
    // Source defaults
    pub fn listing_url() -> String {
        "https://www.amazon.in/s?i=instant-video&rh=n%3A15457882031%2Cp_n_feature_three_browse-bin%3A15629640031%257C15629649031%257C15629664031%257C15629699031%257C15629700031&s=date-desc-rank".into()
    }
    pub fn canonical_host() -> String {
        crate::utils::url::CANONICAL_HOST.into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Fetch defaults
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        2_000
    }

    // Poll defaults
    pub fn interval() -> u64 {
        5
    }
    pub fn failure_delay() -> u64 {
        5
    }
    pub fn snapshot_interval() -> u64 {
        10
    }

    // Notifier defaults
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn template() -> String {
        "🎬 *New Movie:* {name} ({year})\n🔗 [Watch on Prime Video]({link})\n🎧 *Audio:* {audio}\n🖼 [Poster]({poster})".into()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.source.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_retries() {
        let mut config = Config::default();
        config.fetch.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut config = Config::default();
        config.poll.interval_secs = 0;
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));

        let mut config = Config::default();
        config.poll.failure_delay_secs = 0;
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));

        let mut config = Config::default();
        config.poll.snapshot_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_proxy() {
        let mut config = Config::default();
        config.source.proxy = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_match_retry_contract() {
        let config = Config::default();
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.poll.snapshot_interval(), Duration::from_secs(10));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[source]\nlisting_url = \"https://example.com/list\"\n\n[fetch]\nretry_delay_ms = 10"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.source.listing_url, "https://example.com/list");
        assert_eq!(config.fetch.retry_delay_ms, 10);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.poll.interval_secs, 5);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result = Config::load("/definitely/not/here.toml");
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn overrides_ignore_blank_values() {
        let vars: HashMap<&str, &str> = [
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("CHANNEL_ID", "@releases"),
            ("PROXY_URL", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.notifier.bot_token, "123:abc");
        assert_eq!(config.notifier.chat_id, "@releases");
        assert!(config.source.proxy.is_none());
    }
}
