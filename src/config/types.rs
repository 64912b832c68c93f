use crate::title::ArticleId;
use serde::Deserialize;

/// Placeholder substituted with a language code in `api.url-template`
pub const LANG_PLACEHOLDER: &str = "{lang}";

/// Main configuration structure for Wikiweave
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub api: ApiConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub store: StoreConfig,
    #[serde(rename = "language", default)]
    pub languages: Vec<LanguageEntry>,
}

impl Config {
    /// Language codes in configuration order
    pub fn tracked_languages(&self) -> Vec<String> {
        self.languages.iter().map(|l| l.code.clone()).collect()
    }

    /// Looks up the per-language settings for a code
    pub fn language(&self, code: &str) -> Option<&LanguageEntry> {
        self.languages.iter().find(|l| l.code == code)
    }

    /// Parses the configured seeds into identifiers
    ///
    /// Validation guarantees these parse, so callers after `load_config` can
    /// treat an error here as a bug in hand-built configs.
    pub fn seed_ids(&self) -> crate::TitleResult<Vec<ArticleId>> {
        self.crawler
            .seeds
            .iter()
            .map(|s| ArticleId::parse(s))
            .collect()
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of articles processed concurrently
    pub workers: u32,

    /// Maximum number of frontier entries pulled per round
    #[serde(rename = "batch-size")]
    pub batch_size: u32,

    /// Starting identifiers (`lang||title`) crawled before the first round
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Remote content API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Endpoint template; `{lang}` is replaced by the language code
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// Per-call timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Global ceiling on API calls per second, shared by all workers
    #[serde(rename = "calls-per-second", default = "default_calls_per_second")]
    pub calls_per_second: u32,
}

impl ApiConfig {
    /// Endpoint URL for one language
    pub fn endpoint(&self, lang: &str) -> String {
        self.url_template.replace(LANG_PLACEHOLDER, lang)
    }
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_calls_per_second() -> u32 {
    16
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Persistent store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// How long a connection waits on a locked database before giving up
    #[serde(rename = "busy-timeout-ms", default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Per-language lookup tables
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageEntry {
    /// Wiki language code (e.g., "en")
    pub code: String,

    /// Localized heading of the "See also" section
    #[serde(rename = "see-also")]
    pub see_also: String,

    /// Substrings marking a disambiguation page, matched against lowercased targets
    #[serde(default)]
    pub disambiguation: Vec<String>,
}
