//! Content API client
//!
//! This module handles all HTTP traffic for the crawler:
//! - Building the HTTP client with the crawler's user agent
//! - Pacing every call through the shared rate limiter
//! - Classifying failures (timeout, transport, API error codes)
//! - Typed wrappers for each `action=parse` request the crawler makes

use crate::api::limiter::RateLimiter;
use crate::api::response::{
    missing, ApiReply, ArticlePage, ErrorBody, LangLinksPage, ParseBody, MISSING_CODES, NS_MAIN,
};
use crate::config::{ApiConfig, Config, UserAgentConfig};
use crate::{Result, WeaveError};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const FETCH_PROPS: &str = "wikitext|sections|categories|templates";

/// Builds an HTTP client with proper configuration
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited client for the per-language content API
///
/// Cloning is cheap; clones share the HTTP connection pool and the limiter.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    api: ApiConfig,
    limiter: Arc<RateLimiter>,
}

impl ApiClient {
    /// Creates a client with its own limiter at the configured ceiling
    pub fn new(config: &Config) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.api.calls_per_second));
        Self::with_limiter(config, limiter)
    }

    /// Creates a client that paces its calls through `limiter`
    pub fn with_limiter(config: &Config, limiter: Arc<RateLimiter>) -> Result<Self> {
        let http = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.api.timeout_secs),
        )?;
        Ok(Self {
            http,
            api: config.api.clone(),
            limiter,
        })
    }

    /// Issues one call against the `lang` endpoint
    ///
    /// `format=json` is always added. Keys and values are percent-encoded,
    /// so a space goes out as `%20`.
    /// A `missingtitle`/`invalidtitle` error code is returned as
    /// [`ApiReply::Missing`]; any other API error code is
    /// [`WeaveError::RemoteApi`].
    pub async fn call(&self, lang: &str, action: &str, params: &[(&str, &str)]) -> Result<ApiReply> {
        let mut url = Url::parse(&self.api.endpoint(lang))?;
        url.set_query(Some(&encode_query(action, params)));

        self.limiter.acquire().await;
        tracing::trace!(url = %url, "api call");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeaveError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify(url.as_str(), e))?;
        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| WeaveError::MalformedResponse(format!("{url}: {e}")))?;

        if let Some(error) = payload.get("error") {
            let error: ErrorBody = serde_json::from_value(error.clone())
                .map_err(|e| WeaveError::MalformedResponse(e.to_string()))?;
            let code = error.code.unwrap_or_else(|| "unknown_error".to_string());
            if MISSING_CODES.contains(&code.as_str()) {
                return Ok(ApiReply::Missing { code });
            }
            return Err(WeaveError::RemoteApi {
                code,
                info: error.info.unwrap_or_default(),
            });
        }

        Ok(ApiReply::Found(payload))
    }

    /// `action=parse` on `title` with redirects followed
    async fn parse(
        &self,
        lang: &str,
        title: &str,
        prop: &str,
        section: Option<u32>,
    ) -> Result<Option<ParseBody>> {
        let section = section.map(|s| s.to_string());
        let mut params = vec![("prop", prop), ("page", title), ("redirects", "1")];
        if let Some(section) = section.as_deref() {
            params.push(("section", section));
        }

        match self.call(lang, "parse", &params).await? {
            ApiReply::Found(payload) => ParseBody::from_payload(payload).map(Some),
            ApiReply::Missing { .. } => Ok(None),
        }
    }

    /// Parses a call that must find the page
    ///
    /// Used for follow-up calls on a page already fetched; a missing reply
    /// there means the reply is inconsistent.
    async fn parse_existing(
        &self,
        lang: &str,
        title: &str,
        prop: &str,
        section: Option<u32>,
    ) -> Result<ParseBody> {
        self.parse(lang, title, prop, section)
            .await?
            .ok_or_else(|| missing("title"))
    }

    /// Fetches wikitext, sections, categories and templates
    ///
    /// Returns `None` if the page is missing or its title invalid.
    pub async fn fetch_article(&self, lang: &str, title: &str) -> Result<Option<ArticlePage>> {
        match self.parse(lang, title, FETCH_PROPS, None).await? {
            Some(body) => ArticlePage::from_body(body).map(Some),
            None => Ok(None),
        }
    }

    /// Main-namespace link targets of the page or of one section
    pub async fn internal_links(
        &self,
        lang: &str,
        title: &str,
        section: Option<u32>,
    ) -> Result<Vec<String>> {
        let mut body = self.parse_existing(lang, title, "links", section).await?;
        let links = body.links.take().ok_or_else(|| missing("links"))?;
        Ok(ParseBody::names_in(links, NS_MAIN))
    }

    /// External link URLs of the page or of one section
    pub async fn external_links(
        &self,
        lang: &str,
        title: &str,
        section: Option<u32>,
    ) -> Result<Vec<String>> {
        let mut body = self
            .parse_existing(lang, title, "externallinks", section)
            .await?;
        body.externallinks
            .take()
            .ok_or_else(|| missing("externallinks"))
    }

    /// Language links of the page
    ///
    /// Returns `None` if the page is missing or its title invalid.
    pub async fn lang_links(&self, lang: &str, title: &str) -> Result<Option<LangLinksPage>> {
        match self.parse(lang, title, "langlinks", None).await? {
            Some(body) => LangLinksPage::from_body(body).map(Some),
            None => Ok(None),
        }
    }

    /// Canonical title `title` redirects to
    ///
    /// Returns `None` if the page is missing or its title invalid.
    pub async fn redirect_target(&self, lang: &str, title: &str) -> Result<Option<String>> {
        match self.parse(lang, title, "revid", None).await? {
            Some(mut body) => body.take_title().map(Some),
            None => Ok(None),
        }
    }
}

fn encode_query(action: &str, params: &[(&str, &str)]) -> String {
    [("action", action), ("format", "json")]
        .iter()
        .chain(params)
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn classify(url: &str, error: reqwest::Error) -> WeaveError {
    if error.is_timeout() {
        WeaveError::Timeout {
            url: url.to_string(),
        }
    } else {
        WeaveError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
