//! Link extraction and disambiguation filtering
//!
//! This module turns one fetched article into typed link targets:
//! - See-also targets from the localized "See also" section
//! - In-text targets: every main-namespace link minus the see-also set
//! - External, category and template targets as reported
//!
//! Raw targets that look like disambiguation pages are dropped here, before
//! any resolution call is spent on them.

use crate::api::ArticlePage;
use crate::config::Config;
use crate::title::{self, ArticleId};
use std::collections::{HashMap, HashSet};

/// Lookup tables for one language
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    /// Heading of the "See also" section
    pub see_also: String,
    /// Disambiguation markers, lowercased
    pub markers: Vec<String>,
}

/// Per-language lookup tables, keyed by language code
#[derive(Debug, Clone, Default)]
pub struct LanguageProfiles {
    order: Vec<String>,
    profiles: HashMap<String, LanguageProfile>,
}

impl LanguageProfiles {
    pub fn from_config(config: &Config) -> Self {
        let mut profiles = Self::default();
        for entry in &config.languages {
            profiles.insert(&entry.code, &entry.see_also, &entry.disambiguation);
        }
        profiles
    }

    /// Adds a language; a repeated code replaces the earlier tables
    pub fn insert(&mut self, code: &str, see_also: &str, markers: &[String]) {
        if !self.profiles.contains_key(code) {
            self.order.push(code.to_string());
        }
        self.profiles.insert(
            code.to_string(),
            LanguageProfile {
                see_also: see_also.to_string(),
                markers: markers.iter().map(|m| m.to_lowercase()).collect(),
            },
        );
    }

    /// Tracked language codes in configuration order
    pub fn languages(&self) -> &[String] {
        &self.order
    }

    pub fn is_tracked(&self, lang: &str) -> bool {
        self.profiles.contains_key(lang)
    }

    pub fn get(&self, lang: &str) -> Option<&LanguageProfile> {
        self.profiles.get(lang)
    }

    /// Returns true if `target` contains one of `lang`'s markers, ignoring case
    pub fn is_disambiguation(&self, lang: &str, target: &str) -> bool {
        let Some(profile) = self.profiles.get(lang) else {
            return false;
        };
        let lowered = target.to_lowercase();
        profile.markers.iter().any(|m| lowered.contains(m.as_str()))
    }

    /// Checks a serialized identifier against the markers of its own language
    pub fn is_disambiguation_key(&self, key: &str) -> bool {
        match title::language_of(key) {
            Some(lang) => self.is_disambiguation(lang, key),
            None => false,
        }
    }
}

/// Index of the article's see-also section, if it has one
pub fn see_also_section(page: &ArticlePage, lang: &str, profiles: &LanguageProfiles) -> Option<u32> {
    let profile = profiles.get(lang)?;
    page.section_index(&profile.see_also)
}

/// Typed link targets of one article, before resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLinks {
    pub see_also: Vec<String>,
    pub in_text: Vec<String>,
    pub external: Vec<String>,
    pub categories: Vec<String>,
    pub templates: Vec<String>,
}

impl ExtractedLinks {
    /// Number of raw targets across all kinds
    pub fn len(&self) -> usize {
        self.see_also.len()
            + self.in_text.len()
            + self.external.len()
            + self.categories.len()
            + self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partitions an article's links into typed targets
///
/// `see_also` are the links of the see-also section, `all_links` every
/// main-namespace link of the page and `external` the page's external URLs.
/// In-text targets are `all_links` minus any link byte-identical to a
/// see-also link. Each list keeps first-seen order without repeats, and
/// disambiguation targets in the article's language are dropped.
pub fn extract_links(
    id: &ArticleId,
    page: &ArticlePage,
    see_also: Vec<String>,
    all_links: Vec<String>,
    external: Vec<String>,
    profiles: &LanguageProfiles,
) -> ExtractedLinks {
    let lang = id.lang();
    let see_also = dedup(see_also);
    let see_also_set: HashSet<&str> = see_also.iter().map(String::as_str).collect();

    let in_text = dedup(
        all_links
            .into_iter()
            .filter(|l| !see_also_set.contains(l.as_str())),
    );

    let keep = |target: &String| !profiles.is_disambiguation(lang, target);

    ExtractedLinks {
        in_text: in_text.into_iter().filter(keep).collect(),
        see_also: see_also.iter().filter(|t| keep(t)).cloned().collect(),
        external: dedup(external).into_iter().filter(keep).collect(),
        categories: page.categories.iter().filter(|t| keep(t)).cloned().collect(),
        templates: page.templates.iter().filter(|t| keep(t)).cloned().collect(),
    }
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
