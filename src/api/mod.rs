//! Remote content API access
//!
//! # Components
//!
//! - `ApiClient`: issues `action=parse` calls and decodes them into typed pages
//! - `RateLimiter`: the single call-rate ceiling shared by every caller
//! - `ApiReply`: distinguishes a found page from a missing or invalid title

mod client;
mod limiter;
mod response;

pub use client::{build_http_client, ApiClient};
pub use limiter::RateLimiter;
pub use response::{
    ApiReply, ArticlePage, LangLinksPage, Section, MISSING_CODES, NS_MAIN, NS_TEMPLATE,
};
