//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the per-language content API and
//! run the full crawl cycle end-to-end against an on-disk database.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wikiweave::api::ApiClient;
use wikiweave::config::{parse_config, Config};
use wikiweave::crawler::{ArticleCrawler, ArticleOutcome, Coordinator, LanguageProfiles};
use wikiweave::storage::{Edge, EdgeKind, RunStatus, SqliteStorage, Storage, WriteSet};
use wikiweave::{ArticleId, ErrorKind};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockBuilder, MockServer, Request, ResponseTemplate};

/// Matches requests that do not carry the given query parameter
struct WithoutParam(&'static str);

impl Match for WithoutParam {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == self.0)
    }
}

/// A mock wiki serving `action=parse` replies per language
struct MockWiki {
    server: MockServer,
}

impl MockWiki {
    async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn url_template(&self) -> String {
        format!("{}/{{lang}}/api.php", self.server.uri())
    }

    fn request(lang: &str, page: &str, prop: &str) -> MockBuilder {
        Mock::given(method("GET"))
            .and(path(format!("/{}/api.php", lang)))
            .and(query_param("action", "parse"))
            .and(query_param("format", "json"))
            .and(query_param("page", page))
            .and(query_param("prop", prop))
    }

    fn reply(body: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(body)
    }

    /// Mounts the article fetch reply
    async fn article(
        &self,
        lang: &str,
        title: &str,
        wikitext: &str,
        sections: &[(&str, &str)],
        categories: &[&str],
        templates: &[&str],
    ) {
        let sections: Vec<Value> = sections
            .iter()
            .map(|(line, index)| json!({"toclevel": 1, "line": line, "index": index}))
            .collect();
        let categories: Vec<Value> = categories
            .iter()
            .map(|c| json!({"sortkey": "", "*": c}))
            .collect();
        let templates: Vec<Value> = templates
            .iter()
            .map(|t| json!({"ns": 10, "exists": "", "*": t}))
            .collect();

        Self::request(lang, title, "wikitext|sections|categories|templates")
            .respond_with(Self::reply(json!({
                "parse": {
                    "title": title,
                    "wikitext": {"*": wikitext},
                    "sections": sections,
                    "categories": categories,
                    "templates": templates
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mounts the links reply for a whole page or one section
    async fn links(&self, lang: &str, title: &str, section: Option<&str>, names: &[&str]) {
        let links: Vec<Value> = names
            .iter()
            .map(|n| json!({"ns": 0, "exists": "", "*": n}))
            .collect();
        let builder = Self::request(lang, title, "links");
        let builder = match section {
            Some(section) => builder.and(query_param("section", section)),
            None => builder.and(WithoutParam("section")),
        };
        builder
            .respond_with(Self::reply(json!({"parse": {"title": title, "links": links}})))
            .mount(&self.server)
            .await;
    }

    async fn external_links(&self, lang: &str, title: &str, urls: &[&str]) {
        Self::request(lang, title, "externallinks")
            .and(WithoutParam("section"))
            .respond_with(Self::reply(
                json!({"parse": {"title": title, "externallinks": urls}}),
            ))
            .mount(&self.server)
            .await;
    }

    /// Mounts the language links reply; `expected` bounds how often it may be hit
    async fn lang_links(
        &self,
        lang: &str,
        title: &str,
        canonical: &str,
        links: &[(&str, &str)],
        expected: Option<u64>,
    ) {
        let links: Vec<Value> = links
            .iter()
            .map(|(l, t)| json!({"lang": l, "*": t}))
            .collect();
        let mock = Self::request(lang, title, "langlinks").respond_with(Self::reply(
            json!({"parse": {"title": canonical, "langlinks": links}}),
        ));
        let mock = match expected {
            Some(n) => mock.expect(n),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    async fn redirect(&self, lang: &str, title: &str, canonical: &str) {
        Self::request(lang, title, "revid")
            .respond_with(Self::reply(
                json!({"parse": {"title": canonical, "pageid": 1, "revid": 42}}),
            ))
            .mount(&self.server)
            .await;
    }

    /// Every parse call for `title` reports a missing page
    async fn missing(&self, lang: &str, title: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/api.php", lang)))
            .and(query_param("page", title))
            .respond_with(Self::reply(json!({
                "error": {"code": "missingtitle", "info": "The page you specified doesn't exist."}
            })))
            .mount(&self.server)
            .await;
    }

    /// A plain article with whole-page links and nothing else
    async fn simple_article(&self, lang: &str, title: &str, links: &[&str]) {
        self.article(lang, title, &format!("{} text", title), &[], &[], &[])
            .await;
        self.links(lang, title, None, links).await;
        self.external_links(lang, title, &[]).await;
    }
}

fn create_test_config(dir: &TempDir, url_template: &str, seeds: &[&str]) -> Config {
    let seeds = seeds
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ");
    let db_path = dir.path().join("graph.db");

    parse_config(&format!(
        r#"
[crawler]
workers = 4
batch-size = 16
seeds = [{}]

[api]
url-template = "{}"
timeout-secs = 5
calls-per-second = 1000

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[store]
database-path = "{}"

[[language]]
code = "en"
see-also = "See also"
disambiguation = ["(disambiguation)"]

[[language]]
code = "ru"
see-also = "См. также"
disambiguation = ["(значения)"]
"#,
        seeds,
        url_template,
        db_path.display()
    ))
    .expect("test config should be valid")
}

fn create_crawler(config: &Config) -> ArticleCrawler {
    let api = ApiClient::new(config).unwrap();
    ArticleCrawler::new(api, Arc::new(LanguageProfiles::from_config(config)))
}

fn outgoing(storage: &SqliteStorage, id: &str) -> HashMap<String, EdgeKind> {
    storage
        .get_outgoing_edges(id)
        .unwrap()
        .into_iter()
        .map(|e| (e.to_id, e.kind))
        .collect()
}

#[tokio::test]
async fn test_seeds_are_linked_across_languages() {
    let wiki = MockWiki::start().await;

    // en||Machine learning
    wiki.article(
        "en",
        "Machine learning",
        "ML text",
        &[("History", "1"), ("Notes", "T-1"), ("See also", "4")],
        &["Artificial intelligence"],
        &["Template:Reflist"],
    )
    .await;
    wiki.links("en", "Machine learning", Some("4"), &["Deep learning"])
        .await;
    wiki.links(
        "en",
        "Machine learning",
        None,
        &["Deep learning", "Statistics"],
    )
    .await;
    wiki.external_links("en", "Machine learning", &["https://example.org/ml"])
        .await;
    wiki.lang_links(
        "en",
        "Machine learning",
        "Machine learning",
        &[("de", "Maschinelles Lernen"), ("ru", "Машинное обучение")],
        Some(1),
    )
    .await;

    // ru||Машинное обучение
    wiki.article("ru", "Машинное обучение", "МО текст", &[], &[], &[])
        .await;
    wiki.links("ru", "Машинное обучение", None, &["Статистика"])
        .await;
    wiki.external_links("ru", "Машинное обучение", &[]).await;
    wiki.lang_links(
        "ru",
        "Машинное обучение",
        "Машинное обучение",
        &[("en", "Machine learning")],
        Some(1),
    )
    .await;

    // Targets
    wiki.lang_links("en", "Deep learning", "Deep learning", &[], None)
        .await;
    wiki.lang_links(
        "en",
        "Statistics",
        "Statistics",
        &[("ru", "Статистика")],
        None,
    )
    .await;
    wiki.lang_links(
        "ru",
        "Статистика",
        "Статистика",
        &[("en", "Statistics")],
        None,
    )
    .await;

    wiki.redirect("en", "Machine learning", "Machine learning").await;
    wiki.redirect("ru", "Машинное обучение", "Машинное обучение")
        .await;
    wiki.redirect("en", "Statistics", "Statistics").await;
    wiki.redirect("ru", "Статистика", "Статистика").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(
        &dir,
        &wiki.url_template(),
        &["en||Machine learning", "ru||Машинное обучение"],
    );
    let mut coordinator = Coordinator::new(config, "hash").expect("Failed to create coordinator");

    let status = coordinator.run(Some(1)).await.expect("Crawl failed");
    assert_eq!(status, RunStatus::Completed);

    let storage = coordinator.storage();

    // Both seeds visited exactly once
    assert_eq!(storage.count_texts().unwrap(), 2);
    assert_eq!(
        storage.get_text("en||Machine learning").unwrap().as_deref(),
        Some("ML text")
    );
    assert_eq!(
        storage.get_text("ru||Машинное обучение").unwrap().as_deref(),
        Some("МО текст")
    );

    // Lang edges in both directions
    let en = outgoing(storage, "en||Machine learning");
    let ru = outgoing(storage, "ru||Машинное обучение");
    assert_eq!(en.get("ru||Машинное обучение"), Some(&EdgeKind::Lang));
    assert_eq!(ru.get("en||Machine learning"), Some(&EdgeKind::Lang));

    // Typed edges of the English seed
    assert_eq!(en.get("en||Deep learning"), Some(&EdgeKind::SeeAlso));
    assert_eq!(en.get("en||Statistics"), Some(&EdgeKind::InText));
    assert_eq!(en.get("ru||Статистика"), Some(&EdgeKind::InText));
    assert_eq!(en.get("https://example.org/ml"), Some(&EdgeKind::External));
    assert_eq!(
        en.get("en||Artificial intelligence"),
        Some(&EdgeKind::Category)
    );
    assert_eq!(en.get("en||Template:Reflist"), Some(&EdgeKind::Template));
    assert!(!en.keys().any(|k| k.starts_with("de||")));

    // Equivalence records are symmetric
    assert_eq!(
        storage.get_equivalence("en||Statistics").unwrap(),
        Some(vec!["en||Statistics".to_string(), "ru||Статистика".to_string()])
    );
    assert_eq!(
        storage.get_equivalence("ru||Статистика").unwrap(),
        Some(vec!["ru||Статистика".to_string(), "en||Statistics".to_string()])
    );

    // Unvisited targets form the frontier
    let mut frontier = storage.next_frontier_batch(100).unwrap();
    frontier.sort();
    assert_eq!(
        frontier,
        vec!["en||Deep learning", "en||Statistics", "ru||Статистика"]
    );

    let run = storage.get_run(coordinator.run_id()).unwrap();
    assert_eq!(run.rounds, 1);
    assert_eq!(run.articles, 2);
}

#[tokio::test]
async fn test_missing_page_purges_inbound_edges() {
    let wiki = MockWiki::start().await;
    wiki.missing("en", "Gone").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &wiki.url_template(), &[]);
    let db_path = dir.path().join("graph.db");

    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        storage
            .upsert_edge(&Edge::new("en||A", "en||Gone", EdgeKind::InText))
            .unwrap();
        storage
            .upsert_edge(&Edge::new("en||B", "en||Gone", EdgeKind::SeeAlso))
            .unwrap();
        storage.upsert_text("en||A", "a").unwrap();
        storage.upsert_text("en||B", "b").unwrap();
    }

    let mut coordinator = Coordinator::new(config, "hash").unwrap();
    let status = coordinator.run(None).await.unwrap();
    assert_eq!(status, RunStatus::Completed);

    let storage = coordinator.storage();
    assert!(storage.get_incoming_edges("en||Gone").unwrap().is_empty());
    assert!(!storage.has_text("en||Gone").unwrap());
    assert!(storage.next_frontier_batch(10).unwrap().is_empty());

    let run = storage.get_run(coordinator.run_id()).unwrap();
    assert_eq!(run.rounds, 1);
}

#[tokio::test]
async fn test_missing_page_returns_to_frontier_when_linked_again() {
    let wiki = MockWiki::start().await;
    wiki.missing("en", "Gone").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &wiki.url_template(), &[]);
    let db_path = dir.path().join("graph.db");

    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        storage
            .upsert_edge(&Edge::new("en||A", "en||Gone", EdgeKind::InText))
            .unwrap();
        storage.upsert_text("en||A", "a").unwrap();
    }

    let mut first = Coordinator::new(config.clone(), "hash").unwrap();
    first.run(None).await.unwrap();
    assert!(first.storage().next_frontier_batch(10).unwrap().is_empty());

    // Another article written after the purge links the missing title again
    {
        let mut storage = SqliteStorage::open(&db_path, Duration::from_secs(5)).unwrap();
        let mut writes = WriteSet::new();
        writes.add_edge(Edge::new("en||B", "en||Gone", EdgeKind::InText));
        writes.set_text("en||B", "b");
        storage.commit(&writes).unwrap();

        assert_eq!(storage.next_frontier_batch(10).unwrap(), vec!["en||Gone"]);
    }

    // The next run fetches it again and purges the new edge
    let mut second = Coordinator::new(config, "hash").unwrap();
    assert_eq!(second.run(None).await.unwrap(), RunStatus::Completed);

    let storage = second.storage();
    assert!(storage.get_incoming_edges("en||Gone").unwrap().is_empty());
    assert!(storage.next_frontier_batch(10).unwrap().is_empty());
    assert!(storage.has_text("en||B").unwrap());
    assert_eq!(storage.get_run(second.run_id()).unwrap().articles, 1);
}

#[tokio::test]
async fn test_concurrent_crawls_of_one_article_write_once() {
    let wiki = MockWiki::start().await;
    wiki.simple_article("en", "Alpha", &["Beta"]).await;
    wiki.lang_links("en", "Alpha", "Alpha", &[], None).await;
    wiki.lang_links("en", "Beta", "Beta", &[], None).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &wiki.url_template(), &[]);
    let db_path = dir.path().join("graph.db");
    SqliteStorage::new(&db_path).unwrap();

    let crawler = create_crawler(&config);
    let id = ArticleId::new("en", "Alpha");

    let mut handles = Vec::new();
    for _ in 0..6 {
        let crawler = crawler.clone();
        let id = id.clone();
        let db_path = db_path.clone();
        handles.push(tokio::spawn(async move {
            let mut storage = SqliteStorage::open(&db_path, Duration::from_secs(5)).unwrap();
            crawler.crawl(&id, &mut storage).await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), ArticleOutcome::Done);
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_texts().unwrap(), 1);
    assert_eq!(
        storage.get_text("en||Alpha").unwrap().as_deref(),
        Some("Alpha text")
    );
    let edges = storage.get_outgoing_edges("en||Alpha").unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].to_id, "en||Beta");
    assert_eq!(edges[0].kind, EdgeKind::InText);
    assert_eq!(storage.count_equivalences().unwrap(), 2);
}

#[tokio::test]
async fn test_timeout_fails_article_and_keeps_it_in_frontier() {
    let wiki = MockWiki::start().await;
    MockWiki::request("en", "Slow", "wikitext|sections|categories|templates")
        .respond_with(
            MockWiki::reply(json!({"parse": {"title": "Slow"}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&wiki.server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, &wiki.url_template(), &[]);
    config.api.timeout_secs = 1;
    let db_path = dir.path().join("graph.db");

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    storage
        .upsert_edge(&Edge::new("en||Root", "en||Slow", EdgeKind::SeeAlso))
        .unwrap();

    let crawler = create_crawler(&config);
    let outcome = crawler
        .crawl(&ArticleId::new("en", "Slow"), &mut storage)
        .await;

    assert_eq!(outcome, ArticleOutcome::Failed(ErrorKind::NetworkTimeout));
    assert!(!storage.has_text("en||Slow").unwrap());
    assert_eq!(storage.next_frontier_batch(10).unwrap(), vec!["en||Slow"]);
}

#[tokio::test]
async fn test_see_also_suppresses_in_text_and_drops_disambiguation() {
    let wiki = MockWiki::start().await;

    wiki.article(
        "en",
        "Graph",
        "graph text",
        &[("Definitions", "1"), ("See also", "3")],
        &[],
        &[],
    )
    .await;
    wiki.links("en", "Graph", Some("3"), &["Tree", "Mercury (disambiguation)"])
        .await;
    wiki.links(
        "en",
        "Graph",
        None,
        &["Tree", "Path", "Venus (Disambiguation)", "Tree"],
    )
    .await;
    wiki.external_links("en", "Graph", &[]).await;
    wiki.lang_links("en", "Graph", "Graph", &[], Some(1)).await;
    wiki.lang_links("en", "Tree", "Tree", &[], Some(1)).await;
    wiki.lang_links("en", "Path", "Path (graph theory)", &[], Some(1))
        .await;
    wiki.lang_links("en", "Mercury (disambiguation)", "Mercury", &[], Some(0))
        .await;
    wiki.lang_links("en", "Venus (Disambiguation)", "Venus", &[], Some(0))
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &wiki.url_template(), &["en||Graph"]);
    let mut coordinator = Coordinator::new(config, "hash").unwrap();
    coordinator.run(Some(1)).await.unwrap();

    let storage = coordinator.storage();
    let edges = storage.get_outgoing_edges("en||Graph").unwrap();
    assert_eq!(edges.len(), 2);

    let edges = outgoing(storage, "en||Graph");
    assert_eq!(edges.get("en||Tree"), Some(&EdgeKind::SeeAlso));
    assert_eq!(edges.get("en||Path (graph theory)"), Some(&EdgeKind::InText));
    assert!(!edges.keys().any(|k| k.to_lowercase().contains("disambiguation")));
}

#[tokio::test]
async fn test_crawl_runs_until_frontier_is_empty() {
    let wiki = MockWiki::start().await;

    wiki.simple_article("en", "Alpha", &["Beta"]).await;
    wiki.simple_article("en", "Beta", &["Alpha"]).await;
    wiki.lang_links("en", "Alpha", "Alpha", &[], Some(1)).await;
    wiki.lang_links("en", "Beta", "Beta", &[], Some(1)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &wiki.url_template(), &["en||Alpha"]);

    let mut coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let status = coordinator.run(None).await.unwrap();
    assert_eq!(status, RunStatus::Completed);

    let storage = coordinator.storage();
    assert_eq!(storage.count_texts().unwrap(), 2);
    assert_eq!(
        outgoing(storage, "en||Alpha").get("en||Beta"),
        Some(&EdgeKind::InText)
    );
    assert_eq!(
        outgoing(storage, "en||Beta").get("en||Alpha"),
        Some(&EdgeKind::InText)
    );
    assert_eq!(storage.count_frontier().unwrap(), 0);

    let run = storage.get_run(coordinator.run_id()).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.rounds, 2);
    assert_eq!(run.articles, 2);

    // A second run over the finished graph has nothing to do
    let edge_count = storage.get_outgoing_edges("en||Alpha").unwrap().len();
    let mut second = Coordinator::new(config, "hash").unwrap();
    assert_eq!(second.run(None).await.unwrap(), RunStatus::Completed);

    let storage = second.storage();
    assert_eq!(storage.count_texts().unwrap(), 2);
    assert_eq!(
        storage.get_outgoing_edges("en||Alpha").unwrap().len(),
        edge_count
    );
    assert_eq!(storage.get_run(second.run_id()).unwrap().rounds, 0);
}

#[tokio::test]
async fn test_failed_article_commits_nothing() {
    let wiki = MockWiki::start().await;

    wiki.simple_article("en", "Fragile", &["Broken"]).await;
    wiki.lang_links("en", "Fragile", "Fragile", &[("ru", "Хрупкий")], None)
        .await;
    wiki.redirect("ru", "Хрупкий", "Хрупкий").await;
    MockWiki::request("en", "Broken", "langlinks")
        .respond_with(ResponseTemplate::new(503))
        .mount(&wiki.server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &wiki.url_template(), &["en||Fragile"]);
    let mut coordinator = Coordinator::new(config, "hash").unwrap();
    coordinator.run(Some(1)).await.unwrap();

    let storage = coordinator.storage();
    assert!(!storage.has_text("en||Fragile").unwrap());
    assert!(storage.get_outgoing_edges("en||Fragile").unwrap().is_empty());
    assert_eq!(storage.get_equivalence("en||Fragile").unwrap(), None);

    let run = storage.get_run(coordinator.run_id()).unwrap();
    assert_eq!(run.articles, 1);
}

#[tokio::test]
async fn test_remote_api_error_fails_article() {
    let wiki = MockWiki::start().await;
    Mock::given(method("GET"))
        .and(path("/en/api.php"))
        .respond_with(MockWiki::reply(json!({
            "error": {"code": "ratelimited", "info": "You've exceeded your rate limit."}
        })))
        .mount(&wiki.server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &wiki.url_template(), &[]);
    let db_path = dir.path().join("graph.db");
    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        storage
            .upsert_edge(&Edge::new("en||Root", "en||Target", EdgeKind::InText))
            .unwrap();
    }

    let mut coordinator = Coordinator::new(config, "hash").unwrap();
    coordinator.run(Some(2)).await.unwrap();

    // The target was attempted twice and is still pending
    let storage = coordinator.storage();
    assert_eq!(storage.get_incoming_edges("en||Target").unwrap().len(), 1);
    assert_eq!(storage.next_frontier_batch(10).unwrap(), vec!["en||Target"]);
    assert_eq!(storage.get_run(coordinator.run_id()).unwrap().articles, 2);
}
