//! Selection policies: which action an interior node explores next.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::Rng;

use crate::policy::backprop::AggregationPolicy;
use crate::tree::Node;

/// Trait for policies that pick an action index from a node's statistics.
///
/// `pick` is called with virtual loss not yet applied; the caller increments
/// the node and action visit counts immediately afterwards. The stored R
/// field means different things under different aggregation rules (running
/// sum vs running maximum), so the policy reads action values through
/// `aggregation` instead of interpreting R itself.
pub trait SelectionPolicy<M>: Send + Sync {
    /// Picks an action index. `depth` is the length of the path so far.
    /// Must only be called on a node with at least one action.
    fn pick(
        &self,
        node: &Node<M>,
        depth: usize,
        aggregation: &dyn AggregationPolicy,
        rng: &mut StdRng,
    ) -> usize;
}

/// PUCT-style exploitation/exploration selection.
///
/// ```text
/// score(a) = Q(a) + c_puct · prior(a) · sqrt(N_node) / (1 + N_a)
/// ```
///
/// where `Q` is the aggregation policy's value of a visited action (0
/// otherwise) and `c_puct` grows logarithmically with the node's visit count
/// and the search depth, so early search favours exploration and deep search
/// favours exploitation. An action with zero visits short-circuits the
/// formula and is chosen immediately, guaranteeing every action is sampled
/// once before any is resampled. Ties break to the first action with the
/// strictly highest score.
#[derive(Debug, Clone)]
pub struct PuctPolicy {
    /// Base exploration constant.
    pub c_init: f32,

    /// Visit scale over which the exploration constant grows.
    pub c_base: f32,
}

impl PuctPolicy {
    /// Creates a new PUCT policy.
    pub fn new(c_init: f32, c_base: f32) -> Self {
        PuctPolicy { c_init, c_base }
    }

    /// The depth- and visit-dependent exploration constant.
    pub fn c_puct(&self, node_visits: u32, depth: usize) -> f32 {
        self.c_init + (1.0 + (node_visits as f32 + depth as f32) / self.c_base).ln()
    }
}

impl<M: Send + Sync> SelectionPolicy<M> for PuctPolicy {
    fn pick(
        &self,
        node: &Node<M>,
        depth: usize,
        aggregation: &dyn AggregationPolicy,
        _rng: &mut StdRng,
    ) -> usize {
        for (i, action) in node.actions.iter().enumerate() {
            if action.visits == 0 {
                return i;
            }
        }

        let n_node = node.visits.max(1) as f32;
        let c = self.c_puct(node.visits, depth);
        let sqrt_n = n_node.sqrt();

        let mut best_index = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (i, action) in node.actions.iter().enumerate() {
            let q = aggregation.value(action.reward, action.visits);
            let exploration = c * action.prior * sqrt_n / (1.0 + action.visits as f32);
            let score = q + exploration;
            if score > best_score {
                best_score = score;
                best_index = i;
            }
        }
        best_index
    }
}

/// Square-of-rank sampling.
///
/// Actions are ranked by `max(static value, action value)` descending; rank
/// r gets unnormalised weight 1/r², and one action is drawn from the
/// normalised distribution. Trades optimality for much cheaper, variance-
/// tolerant selection; also the policy rollouts advance with.
#[derive(Debug, Clone, Default)]
pub struct SquareOfRankPolicy;

impl SquareOfRankPolicy {
    /// Creates a new square-of-rank policy.
    pub fn new() -> Self {
        SquareOfRankPolicy
    }
}

impl<M: Send + Sync> SelectionPolicy<M> for SquareOfRankPolicy {
    fn pick(
        &self,
        node: &Node<M>,
        _depth: usize,
        aggregation: &dyn AggregationPolicy,
        rng: &mut StdRng,
    ) -> usize {
        let mut order: Vec<usize> = (0..node.actions.len()).collect();
        order.sort_by(|&a, &b| {
            let action_a = &node.actions[a];
            let action_b = &node.actions[b];
            let ka = action_a
                .eval
                .max(aggregation.value(action_a.reward, action_a.visits));
            let kb = action_b
                .eval
                .max(aggregation.value(action_b.reward, action_b.visits));
            kb.partial_cmp(&ka).unwrap_or(Ordering::Equal)
        });

        let total: f32 = (1..=order.len()).map(|rank| 1.0 / (rank * rank) as f32).sum();
        let mut draw = rng.gen::<f32>() * total;
        for (i, &index) in order.iter().enumerate() {
            let rank = i + 1;
            let weight = 1.0 / (rank * rank) as f32;
            if draw < weight {
                return index;
            }
            draw -= weight;
        }
        order[0]
    }
}
