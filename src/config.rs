//! Configuration options for the concurrent search.
//!
//! All parameters are fixed before the workers spawn and never change while a
//! search is running.

/// How interior nodes pick the next action during selection.
///
/// Chosen once per search; the two policies build statistics with different
/// meanings and must not be mixed within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// PUCT-style exploitation/exploration: mean reward plus a prior-weighted
    /// exploration term whose constant grows logarithmically with node visits
    /// and search depth. Unvisited actions are always sampled first.
    Puct,

    /// Square-of-rank sampling: actions ranked by `max(static value, reward)`
    /// and drawn with probability proportional to 1/rank². Cheaper and
    /// variance-tolerant, at the cost of optimality.
    SquareOfRank,
}

/// How backpropagated rewards fold into an action's stored reward.
///
/// One is expected-value estimation, the other optimistic worst-case
/// avoidance; pick one per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardAggregation {
    /// The stored reward is a running sum; an action's value is the mean.
    Mean,

    /// The stored reward is a running maximum; a backpropagated value only
    /// overwrites it when larger.
    Max,
}

/// Configuration for the search engine.
///
/// Use the builder methods to customize, in the usual pattern:
///
/// ```
/// use downstack_mcts::{RewardAggregation, SearchConfig, SelectionKind};
///
/// let config = SearchConfig::default()
///     .with_worker_count(8)
///     .with_selection(SelectionKind::Puct)
///     .with_aggregation(RewardAggregation::Mean)
///     .with_load_factor(64);
/// ```
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Number of worker threads. Defaults to the available parallelism.
    pub worker_count: usize,

    /// Initial SELECT jobs flooded onto the root owner's queue, per worker.
    /// Controls how many search lines are in flight at once.
    pub load_factor: usize,

    /// Expansion steps per rollout. One step already reads off the best
    /// static value; deeper rollouts trade throughput for lookahead.
    pub rollout_depth: usize,

    /// Interior-node action selection policy.
    pub selection: SelectionKind,

    /// Reward folding rule for backpropagation.
    pub aggregation: RewardAggregation,

    /// When true, a worker whose own queue is empty keeps jobs it would have
    /// forwarded to another worker.
    pub work_stealing: bool,

    /// Base PUCT exploration constant.
    pub c_init: f32,

    /// Visit scale over which the PUCT exploration constant grows.
    pub c_base: f32,

    /// Cap applied to the back-to-back counter in rollout reward shaping.
    pub b2b_cap: f32,

    /// Opponent stack height at which rollouts grant a pressure bonus.
    pub opponent_height_threshold: f32,

    /// Fraction of stale visit/reward statistics kept when a tree is reused
    /// across decisions.
    pub retain_factor: f32,

    /// Completed episodes `stop` waits for before terminating the workers,
    /// guaranteeing at least one statistically meaningful result.
    pub min_episodes: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            load_factor: 100,
            rollout_depth: 1,
            selection: SelectionKind::Puct,
            aggregation: RewardAggregation::Mean,
            work_stealing: true,
            c_init: 1.414,
            c_base: 512.0,
            b2b_cap: 8.0,
            opponent_height_threshold: 16.0,
            retain_factor: 0.5,
            min_episodes: 1,
        }
    }
}

impl SearchConfig {
    /// Sets the number of worker threads.
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    /// Sets the initial SELECT flood per worker.
    pub fn with_load_factor(mut self, load_factor: usize) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Sets the number of expansion steps per rollout.
    pub fn with_rollout_depth(mut self, depth: usize) -> Self {
        self.rollout_depth = depth;
        self
    }

    /// Sets the interior-node selection policy.
    pub fn with_selection(mut self, selection: SelectionKind) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the reward aggregation rule.
    pub fn with_aggregation(mut self, aggregation: RewardAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Enables or disables work stealing.
    pub fn with_work_stealing(mut self, enabled: bool) -> Self {
        self.work_stealing = enabled;
        self
    }

    /// Sets the base PUCT exploration constant.
    pub fn with_c_init(mut self, c_init: f32) -> Self {
        self.c_init = c_init;
        self
    }

    /// Sets the visit scale for PUCT exploration growth.
    pub fn with_c_base(mut self, c_base: f32) -> Self {
        self.c_base = c_base;
        self
    }

    /// Sets the back-to-back cap used in rollout shaping.
    pub fn with_b2b_cap(mut self, cap: f32) -> Self {
        self.b2b_cap = cap;
        self
    }

    /// Sets the opponent stack height that triggers a rollout bonus.
    pub fn with_opponent_height_threshold(mut self, threshold: f32) -> Self {
        self.opponent_height_threshold = threshold;
        self
    }

    /// Sets the fraction of stale statistics retained across decisions.
    pub fn with_retain_factor(mut self, factor: f32) -> Self {
        self.retain_factor = factor;
        self
    }

    /// Sets the minimum completed episodes `stop` waits for.
    pub fn with_min_episodes(mut self, episodes: u64) -> Self {
        self.min_episodes = episodes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_knobs() {
        let config = SearchConfig::default();
        assert!(config.worker_count >= 1);
        assert_eq!(config.load_factor, 100);
        assert_eq!(config.rollout_depth, 1);
        assert_eq!(config.selection, SelectionKind::Puct);
        assert_eq!(config.aggregation, RewardAggregation::Mean);
        assert!(config.work_stealing);
        assert_eq!(config.retain_factor, 0.5);
        assert_eq!(config.min_episodes, 1);
    }

    #[test]
    fn builders_override_each_field() {
        let config = SearchConfig::default()
            .with_worker_count(7)
            .with_load_factor(3)
            .with_rollout_depth(2)
            .with_selection(SelectionKind::SquareOfRank)
            .with_aggregation(RewardAggregation::Max)
            .with_work_stealing(false)
            .with_c_init(2.0)
            .with_c_base(128.0)
            .with_b2b_cap(4.0)
            .with_opponent_height_threshold(12.0)
            .with_retain_factor(0.25)
            .with_min_episodes(9);

        assert_eq!(config.worker_count, 7);
        assert_eq!(config.load_factor, 3);
        assert_eq!(config.rollout_depth, 2);
        assert_eq!(config.selection, SelectionKind::SquareOfRank);
        assert_eq!(config.aggregation, RewardAggregation::Max);
        assert!(!config.work_stealing);
        assert_eq!(config.c_init, 2.0);
        assert_eq!(config.c_base, 128.0);
        assert_eq!(config.b2b_cap, 4.0);
        assert_eq!(config.opponent_height_threshold, 12.0);
        assert_eq!(config.retain_factor, 0.25);
        assert_eq!(config.min_episodes, 9);
    }
}
