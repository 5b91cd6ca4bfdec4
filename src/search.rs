//! The search controller.
//!
//! [`Search`] owns the worker threads, the shared tree, and the job queues.
//! A search runs between `start` (or `continue_search`) and `stop`; the tree
//! survives across episodes so later searches can reuse earlier work.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{RewardAggregation, SearchConfig, SelectionKind};
use crate::game_state::{Evaluator, GameState, OpponentModel};
use crate::job::Job;
use crate::policy::{
    AggregationPolicy, MaxAggregation, MeanAggregation, PuctPolicy, RolloutPolicy,
    SelectionPolicy, SquareOfRankPolicy,
};
use crate::queue::{self, LaneSender};
use crate::stats::{SearchStatistics, WorkerStatistics};
use crate::tree::{ActionStats, Node, TreeStore};
use crate::worker::Worker;
use crate::{Result, SearchError};

/// Shared episode counter. Workers bump it when a reward reaches the root;
/// `stop` waits on it before tearing the workers down, so every `stop` call
/// returns a decision backed by at least `min_episodes` completed episodes.
pub(crate) struct EpisodeSignal {
    completed: Mutex<u64>,
    cond: Condvar,
}

impl EpisodeSignal {
    pub(crate) fn new() -> Self {
        EpisodeSignal {
            completed: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn bump(&self) {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *completed += 1;
        self.cond.notify_all();
    }

    pub(crate) fn wait_for(&self, minimum: u64) {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *completed < minimum {
            completed = self
                .cond
                .wait(completed)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn count(&self) -> u64 {
        *self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Picks the best action index of a node under the given aggregation.
///
/// Mean-style searches trust visit counts first (robust child), falling back
/// to reward on a tie. Max-style searches trust the recorded maximum first.
/// Exact ties keep the first action seen.
pub fn best_action<M>(node: &Node<M>, aggregation: RewardAggregation) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_visits = 0u32;
    let mut best_reward = f32::NEG_INFINITY;
    for (index, action) in node.actions.iter().enumerate() {
        let better = match aggregation {
            RewardAggregation::Mean => {
                action.visits > best_visits
                    || (action.visits == best_visits && action.reward > best_reward)
            }
            RewardAggregation::Max => {
                action.reward > best_reward
                    || (action.reward == best_reward && action.visits > best_visits)
            }
        };
        if best.is_none() || better {
            best = Some(index);
            best_visits = action.visits;
            best_reward = action.reward;
        }
    }
    best
}

/// A concurrent best-move search over a [`GameState`].
pub struct Search<S: GameState> {
    config: SearchConfig,
    evaluator: Arc<dyn Evaluator<S>>,
    opponent: Option<Arc<dyn OpponentModel<S>>>,
    selection: Arc<dyn SelectionPolicy<S::Move>>,
    aggregation: Arc<dyn AggregationPolicy>,
    tree: Option<Arc<TreeStore<S::Move>>>,
    workers: Vec<JoinHandle<WorkerStatistics>>,
    controller: Option<LaneSender<Job<S>>>,
    episodes: Option<Arc<EpisodeSignal>>,
    root: Option<S>,
    stats: SearchStatistics,
}

impl<S: GameState> Search<S> {
    /// Creates a search with the policies implied by `config`.
    pub fn new(config: SearchConfig, evaluator: Arc<dyn Evaluator<S>>) -> Self {
        let selection: Arc<dyn SelectionPolicy<S::Move>> = match config.selection {
            SelectionKind::Puct => Arc::new(PuctPolicy::new(config.c_init, config.c_base)),
            SelectionKind::SquareOfRank => Arc::new(SquareOfRankPolicy),
        };
        let aggregation: Arc<dyn AggregationPolicy> = match config.aggregation {
            RewardAggregation::Mean => Arc::new(MeanAggregation),
            RewardAggregation::Max => Arc::new(MaxAggregation),
        };
        Search {
            config,
            evaluator,
            opponent: None,
            selection,
            aggregation,
            tree: None,
            workers: Vec::new(),
            controller: None,
            episodes: None,
            root: None,
            stats: SearchStatistics::default(),
        }
    }

    /// Attaches an opponent model; rollouts then advance the opponent each
    /// step and fold its situation into the reward.
    pub fn with_opponent_model(mut self, opponent: Arc<dyn OpponentModel<S>>) -> Self {
        self.opponent = Some(opponent);
        self
    }

    /// Overrides the selection policy chosen from the config.
    pub fn with_selection_policy(mut self, policy: Arc<dyn SelectionPolicy<S::Move>>) -> Self {
        self.selection = policy;
        self
    }

    /// Whether worker threads are currently running.
    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Starts a fresh search from `root`, discarding any previous tree.
    pub fn start(&mut self, root: S) -> Result<()> {
        if self.is_running() {
            return Err(SearchError::SearchActive);
        }
        let workers = self.config.worker_count.max(1);
        let tree = Arc::new(TreeStore::new(workers));
        self.spawn(root, tree)
    }

    /// Starts a search from `root`, reusing the tree a previous search built.
    ///
    /// Nodes kept from the old tree carry their visits and rewards scaled by
    /// the configured retain factor, so prior work biases but does not
    /// dominate the new search.
    pub fn continue_search(&mut self, root: S) -> Result<()> {
        if self.is_running() {
            return Err(SearchError::SearchActive);
        }
        let tree = self.tree.take().ok_or(SearchError::SearchNotStarted)?;
        tree.collect(self.config.retain_factor);
        debug!("continuing search with {} retained nodes", tree.node_count());
        self.spawn(root, tree)
    }

    fn spawn(&mut self, root: S, tree: Arc<TreeStore<S::Move>>) -> Result<()> {
        if root.is_terminal() {
            self.tree = Some(tree);
            return Err(SearchError::NoLegalMoves);
        }
        let root_fingerprint = root.fingerprint();

        let known = tree
            .with_node(root_fingerprint, |node| !node.actions.is_empty())
            .unwrap_or(false);
        if !known {
            let node = Node::from_state(&root, self.evaluator.as_ref());
            if node.actions.is_empty() {
                self.tree = Some(tree);
                return Err(SearchError::NoLegalMoves);
            }
            // No workers are alive yet, so the controller may act as owner.
            tree.insert(node, tree.owner(root_fingerprint));
        }

        let worker_count = tree.worker_count();
        let (queues, mut senders) = queue::build(worker_count, worker_count + 1);
        let controller = match senders.pop() {
            Some(sender) => sender,
            None => return Err(SearchError::SearchNotStarted),
        };
        let episodes = Arc::new(EpisodeSignal::new());
        let rollout = RolloutPolicy::new(
            self.config.rollout_depth,
            self.config.b2b_cap,
            self.config.opponent_height_threshold,
        );

        // Flood the root owner so every worker has lines to pull from the
        // first dequeue onward.
        let root_owner = tree.owner(root_fingerprint);
        for _ in 0..self.config.load_factor * worker_count {
            controller.send_to(
                root_owner,
                Job::Select {
                    state: root.clone(),
                    path: Vec::new(),
                },
            );
        }

        let mut handles = Vec::with_capacity(worker_count);
        for (id, (queue, sender)) in queues.into_iter().zip(senders).enumerate() {
            let worker = Worker {
                id,
                queue,
                sender,
                tree: Arc::clone(&tree),
                evaluator: Arc::clone(&self.evaluator),
                opponent: self.opponent.clone(),
                selection: Arc::clone(&self.selection),
                aggregation: Arc::clone(&self.aggregation),
                rollout: rollout.clone(),
                root_state: root.clone(),
                root_fingerprint,
                episodes: Arc::clone(&episodes),
                work_stealing: self.config.work_stealing,
                rng: StdRng::from_entropy(),
                stats: WorkerStatistics::default(),
            };
            let handle = thread::Builder::new()
                .name(format!("uct-worker-{id}"))
                .spawn(move || worker.run())
                .map_err(|_| SearchError::SearchNotStarted)?;
            handles.push(handle);
        }

        info!(
            "search started from {:08x} with {} workers",
            root_fingerprint, worker_count
        );
        self.tree = Some(tree);
        self.workers = handles;
        self.controller = Some(controller);
        self.episodes = Some(episodes);
        self.root = Some(root);
        Ok(())
    }

    /// Stops the search and returns the best root move.
    ///
    /// Blocks until the configured minimum number of episodes has completed,
    /// then tears the workers down and reads the decision off the root node.
    pub fn stop(&mut self) -> Result<S::Move> {
        if self.controller.is_none() {
            return Err(SearchError::SearchNotStarted);
        }
        if let Some(episodes) = &self.episodes {
            episodes.wait_for(self.config.min_episodes);
        }
        self.halt();

        let root = self.root.as_ref().ok_or(SearchError::SearchNotStarted)?;
        let tree = self.tree.as_ref().ok_or(SearchError::SearchNotStarted)?;
        tree.with_node(root.fingerprint(), |node| {
            best_action(node, self.config.aggregation)
                .map(|index| node.actions[index].mv.clone())
        })
        .flatten()
        .ok_or(SearchError::NoLegalMoves)
    }

    /// Tears worker threads down without reading a decision.
    pub fn halt(&mut self) {
        let Some(controller) = self.controller.take() else {
            return;
        };
        let worker_count = self.workers.len();
        for id in 0..worker_count {
            controller.send_to(id, Job::Stop);
        }
        drop(controller);
        for handle in self.workers.drain(..) {
            match handle.join() {
                Ok(worker_stats) => self.stats.absorb(worker_stats),
                Err(_) => error!("a search worker panicked"),
            }
        }
        if let Some(episodes) = self.episodes.take() {
            self.stats.episodes += episodes.count();
        }
        info!("{}", self.stats.summary());
    }

    /// Aggregate counters from every worker of every finished search.
    pub fn statistics(&self) -> &SearchStatistics {
        &self.stats
    }

    /// A snapshot of the root node's action table, if a tree exists.
    pub fn root_actions(&self) -> Option<Vec<ActionStats<S::Move>>> {
        let tree = self.tree.as_ref()?;
        let root = self.root.as_ref()?;
        tree.with_node(root.fingerprint(), |node| node.actions.clone())
    }

    /// Total nodes currently held in the tree.
    pub fn node_count(&self) -> usize {
        self.tree.as_ref().map_or(0, |tree| tree.node_count())
    }

    /// Visits every tree node with the shard index it lives in. Meant for
    /// inspection when no workers are running.
    pub fn for_each_node(&self, f: impl FnMut(usize, &Node<S::Move>)) {
        if let Some(tree) = &self.tree {
            tree.for_each(f);
        }
    }
}

impl<S: GameState> Drop for Search<S> {
    fn drop(&mut self) {
        self.halt();
    }
}
