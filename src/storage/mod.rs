//! Storage module for persisting the link graph
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Insert-if-absent writes for edges, equivalence records and article text
//! - The frontier query that derives the crawl queue from the graph
//! - Run tracking
//!
//! Writes produced while crawling one article are collected in a [`WriteSet`]
//! and committed together through [`Storage::commit`].

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, FRONTIER_KINDS};
pub use sqlite::{SqliteStorage, DEFAULT_BUSY_TIMEOUT};
pub use traits::{Storage, StorageError, StorageResult};

use std::collections::{HashMap, HashSet};

/// Type of a graph edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Link from the article's "See also" section
    SeeAlso,
    /// Any other main-namespace link in the article body
    InText,
    /// Link leaving the wiki
    External,
    Category,
    Template,
    /// Cross-language equivalence
    Lang,
}

impl EdgeKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::SeeAlso => "seealso",
            Self::InText => "intext",
            Self::External => "ext",
            Self::Category => "cat",
            Self::Template => "tpl",
            Self::Lang => "lang",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "seealso" => Some(Self::SeeAlso),
            "intext" => Some(Self::InText),
            "ext" => Some(Self::External),
            "cat" => Some(Self::Category),
            "tpl" => Some(Self::Template),
            "lang" => Some(Self::Lang),
            _ => None,
        }
    }

    /// Returns true if targets of this kind feed the crawl frontier
    pub fn feeds_frontier(&self) -> bool {
        matches!(self, Self::SeeAlso | Self::InText | Self::Lang)
    }

    pub fn all() -> [Self; 6] {
        [
            Self::SeeAlso,
            Self::InText,
            Self::External,
            Self::Category,
            Self::Template,
            Self::Lang,
        ]
    }
}

/// A directed edge waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            kind,
        }
    }
}

/// A stored edge, with its insertion sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub seq: i64,
    pub from_id: String,
    pub to_id: String,
    pub kind: EdgeKind,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub rounds: u64,
    pub articles: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Pending writes for one article's unit of work
///
/// Mirrors the store's insert-if-absent semantics: the first edge for a
/// `(from, to)` pair, the first equivalence record for an identifier and the
/// first text for an identifier win; later writes for the same key are dropped.
/// Insertion order is preserved so committed edges keep discovery order.
#[derive(Debug, Default)]
pub struct WriteSet {
    edges: Vec<Edge>,
    edge_keys: HashSet<(String, String)>,
    equivalences: Vec<(String, Vec<String>)>,
    equivalence_index: HashMap<String, usize>,
    texts: Vec<(String, String)>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an edge; returns false if the pair was already queued
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        let key = (edge.from_id.clone(), edge.to_id.clone());
        if !self.edge_keys.insert(key) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Queues an equivalence record; returns false if one was already queued
    pub fn add_equivalence(&mut self, id: impl Into<String>, members: Vec<String>) -> bool {
        let id = id.into();
        if self.equivalence_index.contains_key(&id) {
            return false;
        }
        self.equivalence_index
            .insert(id.clone(), self.equivalences.len());
        self.equivalences.push((id, members));
        true
    }

    /// Looks up a queued equivalence record
    pub fn equivalence(&self, id: &str) -> Option<&[String]> {
        self.equivalence_index
            .get(id)
            .map(|&i| self.equivalences[i].1.as_slice())
    }

    /// Queues article text; returns false if text for this id was already queued
    pub fn set_text(&mut self, id: impl Into<String>, text: impl Into<String>) -> bool {
        let id = id.into();
        if self.texts.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        self.texts.push((id, text.into()));
        true
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn equivalences(&self) -> &[(String, Vec<String>)] {
        &self.equivalences
    }

    pub fn texts(&self) -> &[(String, String)] {
        &self.texts
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.equivalences.is_empty() && self.texts.is_empty()
    }
}
