//! The sharded, double-buffered tree store and its node types.
//!
//! Every fingerprint maps to exactly one shard (`fingerprint % worker_count`)
//! and that shard's worker is the only one that may grow it. Each shard keeps
//! two generation tables: the write generation accumulates the current
//! episode's changes while the read generation stays stable for best-move
//! extraction. [`TreeStore::collect`] swaps them at a safe point between
//! episodes, which is how a tree survives into the next decision: nodes the
//! last episode touched move forward, nodes untouched for two generations are
//! dropped.
//!
//! The per-shard `RwLock` exists for the two sanctioned cross-thread
//! accesses (controller reads and work-stealing) and is uncontended in
//! steady state, where routing makes the owner the only writer.

use std::sync::{PoisonError, RwLock};

use rustc_hash::FxHashMap;

use crate::game_state::{Evaluator, Fingerprint, GameState};

/// Per-candidate-move statistics inside a node.
#[derive(Debug, Clone)]
pub struct ActionStats<M> {
    /// The move itself; opaque to the search.
    pub mv: M,

    /// Visit count N, incremented at selection time (virtual loss).
    pub visits: u32,

    /// Accumulated or maximum reward R, per the aggregation policy. Only
    /// meaningful once `visits > 0`.
    pub reward: f32,

    /// Prior probability used by the selection formula.
    pub prior: f32,

    /// Static evaluation, computed once at node creation.
    pub eval: f32,
}

/// A search-tree node, identified by its state fingerprint.
///
/// Created exactly once per distinct fingerprint, the first time any worker
/// visits that state; never deleted during an episode.
#[derive(Debug, Clone)]
pub struct Node<M> {
    /// The state fingerprint this node stands for.
    pub fingerprint: Fingerprint,

    /// Aggregate visit count, used for the exploration term.
    pub visits: u32,

    /// Residual reward parked on the node by backpropagation; cleared at
    /// generation maintenance.
    pub reward_buffer: f32,

    /// All legal actions from this state, in enumeration order.
    pub actions: Vec<ActionStats<M>>,
}

impl<M: Clone> Node<M> {
    /// Builds a node by enumerating the state's legal moves and scoring each
    /// with the static evaluator. Priors are the min-shifted, sum-normalised
    /// static values, falling back to uniform when the list is degenerate.
    pub fn from_state<S>(state: &S, evaluator: &dyn Evaluator<S>) -> Self
    where
        S: GameState<Move = M>,
    {
        let moves = state.legal_moves();
        let evals: Vec<f32> = moves
            .iter()
            .map(|mv| evaluator.static_value(state, mv))
            .collect();

        let min = evals.iter().copied().fold(f32::INFINITY, f32::min);
        let total: f32 = evals.iter().map(|e| e - min).sum();
        let uniform = 1.0 / moves.len().max(1) as f32;

        let actions = moves
            .into_iter()
            .zip(evals)
            .map(|(mv, eval)| ActionStats {
                mv,
                visits: 0,
                reward: 0.0,
                prior: if total > f32::EPSILON {
                    (eval - min) / total
                } else {
                    uniform
                },
                eval,
            })
            .collect();

        Node {
            fingerprint: state.fingerprint(),
            visits: 1,
            reward_buffer: 0.0,
            actions,
        }
    }
}

struct Shard<M> {
    read_gen: FxHashMap<Fingerprint, Node<M>>,
    write_gen: FxHashMap<Fingerprint, Node<M>>,
}

impl<M> Default for Shard<M> {
    fn default() -> Self {
        Shard {
            read_gen: FxHashMap::default(),
            write_gen: FxHashMap::default(),
        }
    }
}

/// The sharded key→node table shared by all workers.
pub struct TreeStore<M> {
    worker_count: usize,
    shards: Vec<RwLock<Shard<M>>>,
}

impl<M: Clone> TreeStore<M> {
    /// Creates an empty store with one shard per worker.
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        TreeStore {
            worker_count,
            shards: (0..worker_count).map(|_| RwLock::new(Shard::default())).collect(),
        }
    }

    /// Number of shards (and workers) this store was built for.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// The worker index that owns `fingerprint`'s shard.
    pub fn owner(&self, fingerprint: Fingerprint) -> usize {
        fingerprint as usize % self.worker_count
    }

    /// True if the node is present in either generation of its shard.
    pub fn contains(&self, fingerprint: Fingerprint) -> bool {
        let shard = self.shards[self.owner(fingerprint)]
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        shard.write_gen.contains_key(&fingerprint) || shard.read_gen.contains_key(&fingerprint)
    }

    /// Runs `f` over a read-only view of the node, from either generation.
    /// Any worker (and the controller) may call this.
    pub fn with_node<R>(&self, fingerprint: Fingerprint, f: impl FnOnce(&Node<M>) -> R) -> Option<R> {
        let shard = self.shards[self.owner(fingerprint)]
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        shard
            .write_gen
            .get(&fingerprint)
            .or_else(|| shard.read_gen.get(&fingerprint))
            .map(f)
    }

    /// Runs `f` over a mutable view of the node.
    ///
    /// When `worker` owns the shard, a node living only in the read
    /// generation is first moved into the write generation
    /// (promotion-on-touch), so it survives the next [`collect`].
    /// A non-owner (reachable only through work stealing) updates the node
    /// in place wherever it lives, without promoting it.
    ///
    /// [`collect`]: TreeStore::collect
    pub fn with_node_mut<R>(
        &self,
        fingerprint: Fingerprint,
        worker: usize,
        f: impl FnOnce(&mut Node<M>) -> R,
    ) -> Option<R> {
        let owner = self.owner(fingerprint);
        let mut shard = self.shards[owner]
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if !shard.write_gen.contains_key(&fingerprint) {
            if worker == owner {
                if let Some(node) = shard.read_gen.remove(&fingerprint) {
                    shard.write_gen.insert(fingerprint, node);
                }
            } else if let Some(node) = shard.read_gen.get_mut(&fingerprint) {
                return Some(f(node));
            }
        }

        shard.write_gen.get_mut(&fingerprint).map(f)
    }

    /// Inserts `node` into the write generation of its owning shard.
    ///
    /// Only the owning worker may call this; anyone else must route a PUT
    /// job. A node already present in either generation is left untouched,
    /// so racing inserts of the same fingerprint and warm restarts are
    /// idempotent.
    pub fn insert(&self, node: Node<M>, worker: usize) {
        let owner = self.owner(node.fingerprint);
        debug_assert_eq!(
            worker, owner,
            "insert of {:08x} must come from its owning worker",
            node.fingerprint
        );

        let mut shard = self.shards[owner]
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if shard.read_gen.contains_key(&node.fingerprint) {
            return;
        }
        shard.write_gen.entry(node.fingerprint).or_insert(node);
    }

    /// Swaps the write generation into the read generation and clears the
    /// write side, rescaling surviving statistics by `retain_factor` and
    /// clearing residual buffers.
    ///
    /// Must only be called while no worker is running; the generational
    /// split needs no locking beyond that quiescence.
    pub fn collect(&self, retain_factor: f32) {
        for lock in &self.shards {
            let mut shard = lock.write().unwrap_or_else(PoisonError::into_inner);
            let mut survivors = std::mem::take(&mut shard.write_gen);
            for node in survivors.values_mut() {
                node.reward_buffer = 0.0;
                node.visits = ((node.visits as f32 * retain_factor).round() as u32).max(1);
                for action in node.actions.iter_mut() {
                    action.visits = (action.visits as f32 * retain_factor).round() as u32;
                    action.reward *= retain_factor;
                }
            }
            shard.read_gen = survivors;
        }
    }

    /// Total nodes across both generations of all shards.
    pub fn node_count(&self) -> usize {
        self.shards
            .iter()
            .map(|lock| {
                let shard = lock.read().unwrap_or_else(PoisonError::into_inner);
                shard.write_gen.len() + shard.read_gen.len()
            })
            .sum()
    }

    /// Visits every node, passing the shard index it lives in.
    pub fn for_each(&self, mut f: impl FnMut(usize, &Node<M>)) {
        for (idx, lock) in self.shards.iter().enumerate() {
            let shard = lock.read().unwrap_or_else(PoisonError::into_inner);
            for node in shard.write_gen.values().chain(shard.read_gen.values()) {
                f(idx, node);
            }
        }
    }
}
