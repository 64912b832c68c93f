//! Typed views over `action=parse` replies
//!
//! The API uses the legacy JSON layout where text values live under a `*` key.
//! Every field is optional at the wire level; accessors turn an absent field
//! into `WeaveError::MalformedResponse` naming what was missing.

use crate::{Result, WeaveError};
use serde::Deserialize;
use serde_json::Value;

/// Main article namespace
pub const NS_MAIN: i64 = 0;

/// Template namespace
pub const NS_TEMPLATE: i64 = 10;

/// Error codes meaning the page does not exist
pub const MISSING_CODES: &[&str] = &["missingtitle", "invalidtitle"];

/// Outcome of one API call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply {
    /// The call succeeded; holds the whole decoded payload
    Found(Value),
    /// The API reported the page as missing or its title as invalid
    Missing { code: String },
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ParseBody {
    pub title: Option<String>,
    pub wikitext: Option<StarText>,
    pub sections: Option<Vec<SectionEntry>>,
    pub categories: Option<Vec<StarEntry>>,
    pub templates: Option<Vec<StarEntry>>,
    pub links: Option<Vec<StarEntry>>,
    pub externallinks: Option<Vec<String>>,
    pub langlinks: Option<Vec<LangLinkEntry>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StarText {
    #[serde(rename = "*")]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SectionEntry {
    pub line: String,
    pub index: String,
}

/// A category, template or link entry
#[derive(Debug, Deserialize)]
pub(crate) struct StarEntry {
    #[serde(default)]
    pub ns: Option<i64>,
    #[serde(rename = "*", default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LangLinkEntry {
    pub lang: String,
    #[serde(rename = "*")]
    pub title: String,
}

pub(crate) fn missing(field: &str) -> WeaveError {
    WeaveError::MalformedResponse(format!("missing parse.{field}"))
}

impl ParseBody {
    /// Decodes the `parse` object of a successful payload
    pub fn from_payload(payload: Value) -> Result<Self> {
        let parse = match payload {
            Value::Object(mut map) => map.remove("parse").ok_or_else(|| missing("*"))?,
            _ => return Err(WeaveError::MalformedResponse("payload is not an object".into())),
        };
        serde_json::from_value(parse).map_err(|e| WeaveError::MalformedResponse(e.to_string()))
    }

    pub fn take_title(&mut self) -> Result<String> {
        self.title.take().ok_or_else(|| missing("title"))
    }

    /// Names in namespace `ns` from a link or template list
    pub fn names_in(entries: Vec<StarEntry>, ns: i64) -> Vec<String> {
        entries
            .into_iter()
            .filter(|e| e.ns == Some(ns))
            .filter_map(|e| e.name)
            .collect()
    }
}

/// One numbered section heading of an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub line: String,
    pub index: u32,
}

/// Article content returned by the fetch call
#[derive(Debug, Clone)]
pub struct ArticlePage {
    /// Canonical title after redirects
    pub title: String,
    /// Raw wikitext source
    pub wikitext: String,
    /// Numbered sections; transcluded sections are left out
    pub sections: Vec<Section>,
    pub categories: Vec<String>,
    /// Template names, template namespace only
    pub templates: Vec<String>,
}

impl ArticlePage {
    pub(crate) fn from_body(mut body: ParseBody) -> Result<Self> {
        let title = body.take_title()?;
        let wikitext = body.wikitext.take().ok_or_else(|| missing("wikitext"))?.text;

        let sections = body
            .sections
            .take()
            .ok_or_else(|| missing("sections"))?
            .into_iter()
            .filter_map(|s| {
                if s.index.is_empty() || !s.index.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                s.index.parse().ok().map(|index| Section {
                    line: s.line,
                    index,
                })
            })
            .collect();

        let categories = body
            .categories
            .take()
            .ok_or_else(|| missing("categories"))?
            .into_iter()
            .filter_map(|c| c.name)
            .collect();

        let templates = ParseBody::names_in(
            body.templates.take().ok_or_else(|| missing("templates"))?,
            NS_TEMPLATE,
        );

        Ok(Self {
            title,
            wikitext,
            sections,
            categories,
            templates,
        })
    }

    /// Index of the section headed `label`
    ///
    /// When several sections share a heading the last one wins.
    pub fn section_index(&self, label: &str) -> Option<u32> {
        self.sections
            .iter()
            .rev()
            .find(|s| s.line == label)
            .map(|s| s.index)
    }
}

/// Language links reported for a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangLinksPage {
    /// Canonical title after redirects
    pub title: String,
    /// `(language, title)` pairs in API order
    pub links: Vec<(String, String)>,
}

impl LangLinksPage {
    pub(crate) fn from_body(mut body: ParseBody) -> Result<Self> {
        let title = body.take_title()?;
        let links = body
            .langlinks
            .take()
            .ok_or_else(|| missing("langlinks"))?
            .into_iter()
            .map(|l| (l.lang, l.title))
            .collect();
        Ok(Self { title, links })
    }
}
