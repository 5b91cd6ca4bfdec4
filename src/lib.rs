//! # downstack-mcts
//!
//! A concurrent Monte Carlo Tree Search (UCT variant) engine for agents playing
//! falling-block puzzle games, against no opponent or a simulated one.
//!
//! The engine runs a fixed pool of worker threads that build one logical search
//! tree without a global lock. The tree is sharded by state fingerprint, each
//! shard has exactly one owning worker, and all cross-shard mutation requests
//! travel as messages (jobs) between per-worker queues. Descent through the
//! tree is not recursive: every step of select / expand / rollout /
//! backpropagate is a job, and the route back to the root is carried inside the
//! job as an explicit path.
//!
//! The game rules, the position evaluator, and the opponent model are external
//! collaborators, consumed through the narrow traits in [`game_state`]. The
//! engine never inspects a move; it only asks the collaborators for legal
//! moves, successor states, fingerprints, and static values.
//!
//! ## Basic usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use downstack_mcts::{Evaluator, GameState, Search, SearchConfig};
//!
//! // A stand-in for the real game-rules collaborator.
//! #[derive(Clone)]
//! struct Stack {
//!     filled: u32,
//! }
//!
//! impl GameState for Stack {
//!     type Move = u8;
//!
//!     fn legal_moves(&self) -> Vec<u8> {
//!         if self.is_terminal() {
//!             return vec![];
//!         }
//!         vec![0, 1, 2]
//!     }
//!
//!     fn apply(&self, mv: &u8) -> Self {
//!         Stack { filled: self.filled * 3 + 1 + *mv as u32 }
//!     }
//!
//!     fn is_terminal(&self) -> bool {
//!         self.filled >= 200
//!     }
//!
//!     fn fingerprint(&self) -> u32 {
//!         self.filled
//!     }
//! }
//!
//! struct FlatEval;
//!
//! impl Evaluator<Stack> for FlatEval {
//!     fn static_value(&self, _state: &Stack, mv: &u8) -> f32 {
//!         *mv as f32
//!     }
//! }
//!
//! fn main() -> downstack_mcts::Result<()> {
//!     let config = SearchConfig::default().with_worker_count(2);
//!     let mut search = Search::new(config, Arc::new(FlatEval));
//!
//!     // The search runs until told to stop; deliberate while it works.
//!     search.start(Stack { filled: 0 })?;
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//!     let best = search.stop()?;
//!
//!     println!("best move: {best}");
//!     println!("{}", search.statistics().summary());
//!     Ok(())
//! }
//! ```
//!
//! ## How it works
//!
//! A search episode is one select-to-backprop round trip:
//!
//! 1. **Select**: a worker dequeues a SELECT job, picks an action from the
//!    node's statistics (PUCT or square-of-rank), applies virtual loss, and
//!    forwards a SELECT job for the successor state to the successor's owner.
//! 2. **Expand**: the first visit to a fingerprint builds the node (all legal
//!    moves scored by the static evaluator) and installs it in the owning
//!    shard, directly or via a PUT job.
//! 3. **Rollout**: instead of a multi-ply playout, the estimator performs one
//!    square-of-rank expansion step and reads off the best static value,
//!    shaped by attack-rate, back-to-back, and opponent signals.
//! 4. **Backpropagate**: the reward retraces the job's path one edge per
//!    BACKPROP message; when the path empties, a fresh SELECT is re-seeded
//!    from the root so workers never idle while the search is live.
//!
//! Between decisions the tree can be kept: [`Search::continue_search`] swaps
//! the shard generations and decays stale statistics instead of starting from
//! scratch.
//!
//! Fingerprints are 32-bit hashes; two distinct states that collide are
//! treated as one node. This is an accepted approximation that degrades search
//! quality silently, not an error the engine detects.

pub mod config;
pub mod game_state;
pub mod job;
pub mod policy;
pub mod queue;
pub mod search;
pub mod stats;
pub mod tree;

mod worker;

pub use config::{RewardAggregation, SearchConfig, SelectionKind};
pub use game_state::{Evaluator, Fingerprint, GameState, OpponentModel};
pub use job::{Job, PathEntry};
pub use search::{best_action, Search};
pub use stats::{SearchStatistics, WorkerStatistics};
pub use tree::{ActionStats, Node, TreeStore};

/// Error types for the search engine.
///
/// Invariant breaches (ownership violations, missing-node lookups) are not
/// represented here: they are programming errors and fail debug assertions
/// instead. The worst accepted runtime failure mode is degraded move quality,
/// never a crash.
#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    /// The root state has no legal moves to choose between.
    #[error("no legal moves available from the root state")]
    NoLegalMoves,

    /// `start` or `continue_search` was called while workers are running.
    #[error("search is already running")]
    SearchActive,

    /// `stop` or `continue_search` was called before any search was started.
    #[error("search has not been started")]
    SearchNotStarted,
}

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::SearchError;

    #[test]
    fn error_messages_are_descriptive() {
        assert_eq!(
            SearchError::NoLegalMoves.to_string(),
            "no legal moves available from the root state"
        );
        assert_eq!(
            SearchError::SearchActive.to_string(),
            "search is already running"
        );
        assert_eq!(
            SearchError::SearchNotStarted.to_string(),
            "search has not been started"
        );
    }
}
