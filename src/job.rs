//! Units of work flowing through the worker queues.

use crate::game_state::{Fingerprint, GameState};
use crate::tree::Node;

/// One step of the route from the root to the state being explored.
///
/// Backpropagation retraces these entries in reverse, one BACKPROP job per
/// entry; the path list stands in for a call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathEntry {
    /// Fingerprint of the node whose action was taken.
    pub parent: Fingerprint,

    /// Index of the chosen action within that node.
    pub action: u32,
}

/// A unit of work delivered through a worker's queue.
pub enum Job<S: GameState> {
    /// Walk one more ply from `state`.
    Select {
        state: S,
        path: Vec<PathEntry>,
    },

    /// Propagate `reward` up one edge, the path's last entry.
    Backprop {
        reward: f32,
        path: Vec<PathEntry>,
    },

    /// Install an already-built node; sent to its owner by a worker that
    /// expanded a state it does not own.
    Put {
        node: Node<S::Move>,
    },

    /// Terminate the receiving worker's loop.
    Stop,
}

impl<S: GameState> Job<S> {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Job::Select { .. } => "SELECT",
            Job::Backprop { .. } => "BACKPROP",
            Job::Put { .. } => "PUT",
            Job::Stop => "STOP",
        }
    }
}
