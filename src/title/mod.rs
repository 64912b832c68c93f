//! Canonical article identifiers
//!
//! Every persisted entity is keyed by a `(language, title)` pair serialized as
//! `lang||title`. Titles are kept exactly as the API returns them: comparison is
//! case-sensitive and no normalization is applied here. Canonicalization (redirect
//! following) happens in the resolver, not in this module.

use crate::{TitleError, TitleResult};
use std::fmt;
use std::str::FromStr;

/// Separator between language code and title in a serialized identifier
pub const SEPARATOR: &str = "||";

/// A `(language, title)` pair identifying one article on one wiki
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticleId {
    lang: String,
    title: String,
}

impl ArticleId {
    /// Creates an identifier from its parts
    pub fn new(lang: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            title: title.into(),
        }
    }

    /// Parses a serialized `lang||title` identifier
    ///
    /// Only the first separator splits; titles may themselves contain `||`.
    ///
    /// # Example
    ///
    /// ```
    /// use wikiweave::title::ArticleId;
    ///
    /// let id = ArticleId::parse("en||Machine learning").unwrap();
    /// assert_eq!(id.lang(), "en");
    /// assert_eq!(id.title(), "Machine learning");
    /// ```
    pub fn parse(raw: &str) -> TitleResult<Self> {
        let (lang, title) =
            raw.split_once(SEPARATOR)
                .ok_or_else(|| TitleError::MissingSeparator {
                    raw: raw.to_string(),
                    separator: SEPARATOR,
                })?;

        if lang.is_empty() {
            return Err(TitleError::EmptyLanguage(raw.to_string()));
        }
        if title.is_empty() {
            return Err(TitleError::EmptyTitle(raw.to_string()));
        }

        Ok(Self::new(lang, title))
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the serialized storage key
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Returns a sibling identifier in the same language
    pub fn with_title(&self, title: impl Into<String>) -> Self {
        Self::new(self.lang.clone(), title)
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.lang, SEPARATOR, self.title)
    }
}

impl FromStr for ArticleId {
    type Err = TitleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returns the language prefix of a serialized identifier, if it has one
///
/// Used where stored targets may be raw URLs (external edges) rather than
/// identifiers.
pub fn language_of(raw: &str) -> Option<&str> {
    raw.split_once(SEPARATOR)
        .map(|(lang, _)| lang)
        .filter(|lang| !lang.is_empty())
}
