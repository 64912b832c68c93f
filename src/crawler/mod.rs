//! Crawler module for article fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Title resolution across redirects and languages
//! - Link extraction and disambiguation filtering
//! - The per-article fetch / extract / persist pipeline
//! - Overall crawl coordination with a bounded worker pool

mod article;
mod coordinator;
mod extractor;
mod resolver;

pub use article::{ArticleCrawler, ArticleOutcome};
pub use coordinator::{run_crawl, Coordinator, RoundSummary};
pub use extractor::{
    extract_links, see_also_section, ExtractedLinks, LanguageProfile, LanguageProfiles,
};
pub use resolver::TitleResolver;
