//! Statistics collected during a search.

/// Counters kept by one worker thread, merged into [`SearchStatistics`] when
/// the worker joins.
#[derive(Debug, Clone, Default)]
pub struct WorkerStatistics {
    /// Nodes this worker created by expansion.
    pub nodes_created: usize,

    /// Deepest path this worker extended.
    pub max_depth: usize,

    /// BACKPROP jobs this worker processed.
    pub backprop_messages: usize,

    /// Jobs this worker kept for itself instead of forwarding.
    pub steals: usize,
}

/// Aggregate statistics across all workers and episodes.
#[derive(Debug, Clone, Default)]
pub struct SearchStatistics {
    /// Nodes created by expansion.
    pub nodes_created: usize,

    /// BACKPROP jobs processed.
    pub backprop_messages: usize,

    /// Deepest path any worker extended.
    pub max_depth: usize,

    /// Jobs kept locally by work stealing.
    pub steals: usize,

    /// Completed select-to-backprop round trips.
    pub episodes: u64,
}

impl SearchStatistics {
    pub(crate) fn absorb(&mut self, worker: WorkerStatistics) {
        self.nodes_created += worker.nodes_created;
        self.backprop_messages += worker.backprop_messages;
        self.max_depth = self.max_depth.max(worker.max_depth);
        self.steals += worker.steals;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "UCT Search Statistics:\n\
             - Episodes: {}\n\
             - Nodes created: {}\n\
             - Backprop messages: {}\n\
             - Max depth: {}\n\
             - Stolen jobs: {}",
            self.episodes, self.nodes_created, self.backprop_messages, self.max_depth, self.steals
        )
    }
}
