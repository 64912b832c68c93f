//! Title resolution across redirects and languages
//!
//! `lang_links` maps an identifier to its equivalence record: its own
//! canonical form followed by the canonical forms of its equivalents in every
//! other tracked language. Records are cached in the store forever once
//! written, and every lookup (hit or miss) records `lang` edges from the
//! queried identifier to its equivalents.

use crate::api::ApiClient;
use crate::crawler::extractor::LanguageProfiles;
use crate::storage::{Edge, EdgeKind, Storage, WriteSet};
use crate::title::{self, ArticleId};
use crate::Result;
use std::sync::Arc;

/// Canonicalizes identifiers through the content API and the equivalence cache
#[derive(Debug, Clone)]
pub struct TitleResolver {
    api: ApiClient,
    profiles: Arc<LanguageProfiles>,
}

impl TitleResolver {
    pub fn new(api: ApiClient, profiles: Arc<LanguageProfiles>) -> Self {
        Self { api, profiles }
    }

    /// Follows redirects for `title` in `lang`
    ///
    /// Returns `None` if the page is missing or the title invalid.
    pub async fn resolve_redirect(&self, lang: &str, title: &str) -> Result<Option<ArticleId>> {
        let canonical = self.api.redirect_target(lang, title).await?;
        Ok(canonical.map(|t| ArticleId::new(lang, t)))
    }

    /// Returns the equivalence record for `id`, fetching and caching it on a miss
    ///
    /// Pending records in `writes` are consulted before the store, and new
    /// records and `lang` edges are queued into `writes`. A missing page gets
    /// an empty record so it is not fetched again.
    pub async fn lang_links<S: Storage + ?Sized>(
        &self,
        id: &ArticleId,
        store: &mut S,
        writes: &mut WriteSet,
    ) -> Result<Vec<String>> {
        let key = id.key();

        let cached = match writes.equivalence(&key) {
            Some(members) => Some(members.to_vec()),
            None => store.get_equivalence(&key)?,
        };
        if let Some(members) = cached {
            for member in &members {
                if title::language_of(member) != Some(id.lang()) {
                    self.add_lang_edge(&key, member, writes);
                }
            }
            return Ok(members);
        }

        let page = match self.api.lang_links(id.lang(), id.title()).await? {
            Some(page) => page,
            None => {
                tracing::debug!(article = %id, "no language links, page missing");
                writes.add_equivalence(key, Vec::new());
                return Ok(Vec::new());
            }
        };

        let mut resolved = Vec::new();
        for (lang, title) in &page.links {
            if lang == id.lang() || !self.profiles.is_tracked(lang) {
                continue;
            }
            match self.resolve_redirect(lang, title).await? {
                Some(target) => resolved.push(target.key()),
                None => {
                    tracing::debug!(article = %id, lang = %lang, title = %title, "language link does not resolve")
                }
            }
        }

        for member in &resolved {
            self.add_lang_edge(&key, member, writes);
        }

        let mut members = Vec::with_capacity(resolved.len() + 1);
        members.push(id.with_title(page.title).key());
        members.extend(resolved);

        writes.add_equivalence(key, members.clone());
        Ok(members)
    }

    fn add_lang_edge(&self, from: &str, to: &str, writes: &mut WriteSet) {
        if self.profiles.is_disambiguation_key(to) {
            return;
        }
        writes.add_edge(Edge::new(from, to, EdgeKind::Lang));
    }
}
