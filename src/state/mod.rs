//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `ArticleState`: the states one article passes through during a crawl attempt
//! - `ArticleProgress`: a checked cursor over those states for a single attempt

mod article_state;

pub use article_state::ArticleState;

use crate::title::ArticleId;
use crate::WeaveError;

/// Tracks one article's attempt through its states
///
/// Illegal transitions are reported as `WeaveError::InvalidTransition` rather
/// than silently accepted.
#[derive(Debug)]
pub struct ArticleProgress {
    id: ArticleId,
    state: ArticleState,
}

impl ArticleProgress {
    /// Starts an attempt in `Fetching`
    pub fn start(id: ArticleId) -> Self {
        tracing::trace!(article = %id, state = %ArticleState::Fetching, "article state");
        Self {
            id,
            state: ArticleState::Fetching,
        }
    }

    pub fn state(&self) -> ArticleState {
        self.state
    }

    pub fn id(&self) -> &ArticleId {
        &self.id
    }

    /// Moves to `next` if the transition is legal
    pub fn advance(&mut self, next: ArticleState) -> Result<(), WeaveError> {
        if !self.state.can_transition_to(next) {
            return Err(WeaveError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(article = %self.id, from = %self.state, to = %next, "article state");
        self.state = next;
        Ok(())
    }

    /// Moves to `Failed` from any non-terminal state
    pub fn fail(&mut self) {
        if self.state.is_active() {
            self.state = ArticleState::Failed;
        }
    }
}
