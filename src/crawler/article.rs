//! Processing of a single article
//!
//! One call to [`ArticleCrawler::crawl`] takes an identifier through
//! fetch, extraction and persistence. All writes are buffered in a
//! [`WriteSet`] and committed in one transaction at the end, so a failed
//! attempt leaves nothing behind and the article stays in the frontier.

use crate::api::ApiClient;
use crate::crawler::extractor::{extract_links, see_also_section, LanguageProfiles};
use crate::crawler::resolver::TitleResolver;
use crate::state::{ArticleProgress, ArticleState};
use crate::storage::{Edge, EdgeKind, Storage, WriteSet};
use crate::title::ArticleId;
use crate::{ErrorKind, Result};
use std::sync::Arc;

/// How one crawl attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOutcome {
    /// Links and text were committed
    Done,
    /// The page does not exist; inbound edges were purged
    Missing,
    /// Nothing was committed
    Failed(ErrorKind),
}

/// Runs the per-article pipeline against the API and a store
#[derive(Debug, Clone)]
pub struct ArticleCrawler {
    api: ApiClient,
    resolver: TitleResolver,
    profiles: Arc<LanguageProfiles>,
}

impl ArticleCrawler {
    pub fn new(api: ApiClient, profiles: Arc<LanguageProfiles>) -> Self {
        let resolver = TitleResolver::new(api.clone(), Arc::clone(&profiles));
        Self {
            api,
            resolver,
            profiles,
        }
    }

    /// Crawls one article; errors are logged and reported as `Failed`
    pub async fn crawl<S: Storage + ?Sized>(&self, id: &ArticleId, store: &mut S) -> ArticleOutcome {
        let mut progress = ArticleProgress::start(id.clone());

        match self.process(&mut progress, store).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let state = progress.state();
                progress.fail();
                tracing::warn!(
                    article = %id,
                    kind = %e.kind(),
                    state = %state,
                    error = %e,
                    "article failed"
                );
                ArticleOutcome::Failed(e.kind())
            }
        }
    }

    async fn process<S: Storage + ?Sized>(
        &self,
        progress: &mut ArticleProgress,
        store: &mut S,
    ) -> Result<ArticleOutcome> {
        let raw = progress.id().clone();
        let lang = raw.lang();

        let page = match self.api.fetch_article(lang, raw.title()).await? {
            Some(page) => page,
            None => {
                progress.advance(ArticleState::MissingPage)?;
                let purged = store.purge_inbound(&raw.key())?;
                tracing::info!(article = %raw, purged, "page missing, inbound edges purged");
                progress.advance(ArticleState::Done)?;
                return Ok(ArticleOutcome::Missing);
            }
        };
        progress.advance(ArticleState::Parsed)?;

        let article = raw.with_title(page.title.as_str());
        let title = article.title();
        progress.advance(ArticleState::Extracting)?;

        let see_also = match see_also_section(&page, lang, &self.profiles) {
            Some(index) => self.api.internal_links(lang, title, Some(index)).await?,
            None => Vec::new(),
        };
        let external = self.api.external_links(lang, title, None).await?;

        let mut writes = WriteSet::new();
        self.resolver.lang_links(&article, store, &mut writes).await?;

        let all_links = self.api.internal_links(lang, title, None).await?;
        let links = extract_links(&article, &page, see_also, all_links, external, &self.profiles);
        tracing::debug!(article = %article, targets = links.len(), "links extracted");

        let from = article.key();
        for target in &links.see_also {
            self.link_resolved(&article, target, EdgeKind::SeeAlso, store, &mut writes)
                .await?;
        }
        for url in &links.external {
            writes.add_edge(Edge::new(from.as_str(), url.as_str(), EdgeKind::External));
        }
        for target in &links.in_text {
            self.link_resolved(&article, target, EdgeKind::InText, store, &mut writes)
                .await?;
        }
        for name in &links.categories {
            writes.add_edge(Edge::new(
                from.as_str(),
                article.with_title(name.as_str()).key(),
                EdgeKind::Category,
            ));
        }
        for name in &links.templates {
            writes.add_edge(Edge::new(
                from.as_str(),
                article.with_title(name.as_str()).key(),
                EdgeKind::Template,
            ));
        }
        writes.set_text(from.as_str(), page.wikitext);

        progress.advance(ArticleState::Persisting)?;
        store.commit(&writes)?;
        progress.advance(ArticleState::Done)?;

        tracing::debug!(article = %article, edges = writes.edges().len(), "article committed");
        Ok(ArticleOutcome::Done)
    }

    /// Links `from` to every member of the target's equivalence record
    ///
    /// A missing target has an empty record and yields no edge.
    async fn link_resolved<S: Storage + ?Sized>(
        &self,
        from: &ArticleId,
        target: &str,
        kind: EdgeKind,
        store: &mut S,
        writes: &mut WriteSet,
    ) -> Result<()> {
        let target = from.with_title(target);
        let members = self.resolver.lang_links(&target, store, writes).await?;

        let from = from.key();
        for member in members {
            if member == from || self.profiles.is_disambiguation_key(&member) {
                continue;
            }
            writes.add_edge(Edge::new(from.as_str(), member, kind));
        }
        Ok(())
    }
}
