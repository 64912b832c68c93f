/// Article state definitions for tracking one crawl attempt
///
/// An attempt starts in `Fetching` and ends in either `Done` or `Failed`.
use std::fmt;

/// Represents the current state of one article's crawl attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleState {
    // ===== Active States =====
    /// Waiting on the wikitext/sections/categories/templates call
    Fetching,

    /// The API reported the page as missing or invalid
    MissingPage,

    /// Canonical title and text are known
    Parsed,

    /// Links are being fetched, resolved and classified
    Extracting,

    /// The unit of work is being committed
    Persisting,

    // ===== Terminal States =====
    /// Committed, or the missing-page compensation ran
    Done,

    /// Abandoned; nothing from this attempt was committed
    Failed,
}

impl ArticleState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if this is an active state
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: ArticleState) -> bool {
        use ArticleState::*;
        matches!(
            (self, next),
            (Fetching, MissingPage)
                | (Fetching, Parsed)
                | (Fetching, Failed)
                | (MissingPage, Done)
                | (MissingPage, Failed)
                | (Parsed, Extracting)
                | (Extracting, Persisting)
                | (Extracting, Failed)
                | (Persisting, Done)
                | (Persisting, Failed)
        )
    }

    /// Short lowercase name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::MissingPage => "missing_page",
            Self::Parsed => "parsed",
            Self::Extracting => "extracting",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible article states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Fetching,
            Self::MissingPage,
            Self::Parsed,
            Self::Extracting,
            Self::Persisting,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for ArticleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
