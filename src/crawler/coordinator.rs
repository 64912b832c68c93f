//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop:
//! - Bootstrapping storage and recording the run
//! - Crawling configured seeds that have no text yet
//! - Pulling frontier batches and dispatching them to a bounded worker pool
//! - Handling Ctrl-C between and during rounds

use crate::api::ApiClient;
use crate::config::Config;
use crate::crawler::article::{ArticleCrawler, ArticleOutcome};
use crate::crawler::extractor::LanguageProfiles;
use crate::storage::{RunStatus, SqliteStorage, Storage};
use crate::title::ArticleId;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Counts of outcomes for one batch of articles
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub attempted: u64,
    pub done: u64,
    pub missing: u64,
    pub failed: u64,
}

impl RoundSummary {
    fn record(&mut self, outcome: ArticleOutcome) {
        self.attempted += 1;
        match outcome {
            ArticleOutcome::Done => self.done += 1,
            ArticleOutcome::Missing => self.missing += 1,
            ArticleOutcome::Failed(_) => self.failed += 1,
        }
    }

    fn absorb(&mut self, other: RoundSummary) {
        self.attempted += other.attempted;
        self.done += other.done;
        self.missing += other.missing;
        self.failed += other.failed;
    }
}

/// Main crawler coordinator structure
///
/// The coordinator keeps one connection for frontier queries and run
/// bookkeeping. Each article gets a fresh connection inside its worker task.
pub struct Coordinator {
    config: Arc<Config>,
    crawler: ArticleCrawler,
    storage: SqliteStorage,
    database_path: PathBuf,
    busy_timeout: Duration,
    run_id: i64,
    seeded: bool,
}

impl Coordinator {
    /// Creates a coordinator, bootstrapping the schema and starting a run
    pub fn new(config: Config, config_hash: &str) -> Result<Self> {
        let database_path = PathBuf::from(&config.store.database_path);
        let busy_timeout = Duration::from_millis(config.store.busy_timeout_ms);

        let mut storage = SqliteStorage::bootstrap(&database_path, busy_timeout)?;
        if let Some(previous) = storage.get_latest_run()? {
            if previous.status == RunStatus::Running {
                tracing::warn!(run = previous.id, "previous run did not finish cleanly");
            }
        }
        let run_id = storage.create_run(config_hash)?;

        let api = ApiClient::new(&config)?;
        let profiles = Arc::new(LanguageProfiles::from_config(&config));
        tracing::info!(languages = %profiles.languages().join(", "), "language profiles loaded");
        let crawler = ArticleCrawler::new(api, profiles);

        tracing::info!(run = run_id, database = %database_path.display(), "run started");

        Ok(Self {
            config: Arc::new(config),
            crawler,
            storage,
            database_path,
            busy_timeout,
            run_id,
            seeded: false,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// The coordinator's own connection
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Seeds that have not been crawled yet
    pub fn pending_seeds(&self) -> Result<Vec<ArticleId>> {
        let mut pending = Vec::new();
        for seed in self.config.seed_ids()? {
            if !self.storage.has_text(&seed.key())? {
                pending.push(seed);
            }
        }
        Ok(pending)
    }

    /// Pulls the next frontier batch
    ///
    /// Stored targets that do not parse as identifiers are skipped.
    pub fn next_batch(&self) -> Result<Vec<ArticleId>> {
        let raw = self
            .storage
            .next_frontier_batch(self.config.crawler.batch_size as usize)?;

        Ok(raw
            .into_iter()
            .filter_map(|key| match ArticleId::parse(&key) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(target_id = %key, error = %e, "skipping unparseable frontier entry");
                    None
                }
            })
            .collect())
    }

    /// Crawls a batch with at most `crawler.workers` articles in flight
    ///
    /// Returns once every article has finished. Dropping the returned future
    /// aborts the in-flight articles; none of them commits partially.
    pub async fn crawl_batch(&self, ids: Vec<ArticleId>) -> RoundSummary {
        let semaphore = Arc::new(Semaphore::new(self.config.crawler.workers as usize));
        let mut tasks = JoinSet::new();
        let mut summary = RoundSummary::default();

        for id in ids {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let crawler = self.crawler.clone();
            let path = self.database_path.clone();
            let busy_timeout = self.busy_timeout;

            tasks.spawn(async move {
                let _permit = permit;
                crawl_with_connection(&crawler, &id, path, busy_timeout).await
            });
        }

        while let Some(result) = tasks.join_next().await {
            record_join(&mut summary, result);
        }
        summary
    }

    /// Crawls one frontier batch
    ///
    /// The first round of a run also crawls pending seeds. Returns `None`
    /// when there was nothing to crawl.
    pub async fn run_round(&mut self) -> Result<Option<RoundSummary>> {
        let mut ids = Vec::new();
        if !self.seeded {
            ids = self.pending_seeds()?;
            if !ids.is_empty() {
                tracing::info!(seeds = ids.len(), "crawling seeds");
            }
            self.seeded = true;
        }
        for id in self.next_batch()? {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Ok(None);
        }

        let summary = self.crawl_batch(ids).await;
        self.storage.record_round(self.run_id, summary.attempted)?;
        Ok(Some(summary))
    }

    /// Runs rounds until the frontier is empty, `max_rounds` is reached or Ctrl-C
    pub async fn run(&mut self, max_rounds: Option<u64>) -> Result<RunStatus> {
        match self.run_rounds(max_rounds).await {
            Ok((status, totals)) => {
                self.storage.finish_run(self.run_id, status)?;
                tracing::info!(
                    run = self.run_id,
                    status = status.to_db_string(),
                    articles = totals.attempted,
                    done = totals.done,
                    missing = totals.missing,
                    failed = totals.failed,
                    "run finished"
                );
                Ok(status)
            }
            Err(e) => {
                tracing::error!(run = self.run_id, error = %e, "run aborted");
                if let Err(finish_err) = self.storage.finish_run(self.run_id, RunStatus::Failed) {
                    tracing::error!(error = %finish_err, "could not mark run failed");
                }
                Err(e)
            }
        }
    }

    async fn run_rounds(&mut self, max_rounds: Option<u64>) -> Result<(RunStatus, RoundSummary)> {
        let mut totals = RoundSummary::default();
        let mut round = 0u64;

        loop {
            if max_rounds.is_some_and(|max| round >= max) {
                tracing::info!(rounds = round, "round limit reached");
                return Ok((RunStatus::Completed, totals));
            }

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            let summary = tokio::select! {
                result = self.run_round() => result?,
                _ = &mut ctrl_c => {
                    tracing::warn!("interrupt received, dropping in-flight articles");
                    return Ok((RunStatus::Interrupted, totals));
                }
            };

            let Some(summary) = summary else {
                tracing::info!(rounds = round, "frontier exhausted");
                return Ok((RunStatus::Completed, totals));
            };

            round += 1;
            totals.absorb(summary);
            let frontier = self.storage.count_frontier()?;
            tracing::info!(
                round,
                attempted = summary.attempted,
                done = summary.done,
                missing = summary.missing,
                failed = summary.failed,
                frontier,
                "round finished"
            );
        }
    }
}

async fn crawl_with_connection(
    crawler: &ArticleCrawler,
    id: &ArticleId,
    path: PathBuf,
    busy_timeout: Duration,
) -> ArticleOutcome {
    let mut storage = match SqliteStorage::open(&path, busy_timeout) {
        Ok(storage) => storage,
        Err(e) => {
            let e = crate::WeaveError::from(e);
            tracing::warn!(article = %id, kind = %e.kind(), error = %e, "could not open store");
            return ArticleOutcome::Failed(e.kind());
        }
    };
    crawler.crawl(id, &mut storage).await
}

fn record_join(
    summary: &mut RoundSummary,
    result: std::result::Result<ArticleOutcome, tokio::task::JoinError>,
) {
    match result {
        Ok(outcome) => summary.record(outcome),
        Err(e) => {
            tracing::error!(error = %e, "article task panicked");
            summary.record(ArticleOutcome::Failed(crate::ErrorKind::Internal));
        }
    }
}

/// Runs a crawl until the frontier is exhausted or it is interrupted
///
/// # Example
///
/// ```no_run
/// use wikiweave::config::load_config_with_hash;
/// use wikiweave::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("wikiweave.toml"))?;
/// run_crawl(config, &hash, None).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: &str, max_rounds: Option<u64>) -> Result<RunStatus> {
    let mut coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run(max_rounds).await
}
