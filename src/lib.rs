//! Wikiweave: a multilingual encyclopedia link-graph crawler
//!
//! This crate walks a MediaWiki content API breadth-first, extracts typed links
//! (see-also, in-text, external, category, template, cross-language) and stores
//! the resulting graph together with the raw article text in SQLite.

pub mod api;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod title;

use std::fmt;
use thiserror::Error;

/// Main error type for Wikiweave operations
#[derive(Debug, Error)]
pub enum WeaveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("API error [{code}]: {info}")]
    RemoteApi { code: String, info: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Title error: {0}")]
    Title(#[from] TitleError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::ArticleState,
        to: state::ArticleState,
    },
}

impl WeaveError {
    /// Classifies this error for logging and retry decisions
    ///
    /// Every kind is recoverable at the article level: the article is left
    /// without a text record and shows up again in a later frontier batch.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::NetworkTimeout,
            Self::Http { source, .. } if source.is_timeout() => ErrorKind::NetworkTimeout,
            Self::Reqwest(source) if source.is_timeout() => ErrorKind::NetworkTimeout,
            Self::Http { .. } | Self::HttpStatus { .. } | Self::Reqwest(_) => ErrorKind::Transport,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::RemoteApi { .. } => ErrorKind::RemoteApi,
            Self::Storage(e) if e.is_transient() => ErrorKind::TransientTransaction,
            _ => ErrorKind::Internal,
        }
    }
}

/// Failure classification used in structured log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Store-level serialization or lock conflict
    TransientTransaction,
    NetworkTimeout,
    Transport,
    /// An expected field was absent or the body did not decode
    MalformedResponse,
    /// The API answered with an error code other than missing/invalid title
    RemoteApi,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransientTransaction => "transient_transaction",
            Self::NetworkTimeout => "network_timeout",
            Self::Transport => "transport",
            Self::MalformedResponse => "malformed_response",
            Self::RemoteApi => "remote_api",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid language entry: {0}")]
    InvalidLanguage(String),
}

/// Article identifier errors
#[derive(Debug, Error)]
pub enum TitleError {
    #[error("Missing '{separator}' separator in identifier: {raw}")]
    MissingSeparator { raw: String, separator: &'static str },

    #[error("Empty language code in identifier: {0}")]
    EmptyLanguage(String),

    #[error("Empty title in identifier: {0}")]
    EmptyTitle(String),
}

/// Result type alias for Wikiweave operations
pub type Result<T> = std::result::Result<T, WeaveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for identifier parsing
pub type TitleResult<T> = std::result::Result<T, TitleError>;

// Re-export commonly used types
pub use config::Config;
pub use state::ArticleState;
pub use storage::{EdgeKind, SqliteStorage, Storage};
pub use title::ArticleId;
