//! The rollout reward estimator.
//!
//! A rollout does not replay random moves to a depth limit. Each step scores
//! every legal move with the static evaluator, reads off the best value,
//! shapes it with the agent's attack-per-piece rate, its capped back-to-back
//! counter, and the simulated opponent's condition, then advances one ply by
//! square-of-rank sampling. The running maximum over the steps, squashed into
//! (0, 1), is the reward. One expansion instead of a multi-ply simulation
//! trades sampling depth for throughput.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::Rng;

use crate::game_state::{Evaluator, GameState, OpponentModel};

const OPPONENT_DEAD_BONUS: f32 = 1.0;
const OPPONENT_PRESSURE_BONUS: f32 = 0.5;

/// The reward estimator run at every expansion and terminal select.
#[derive(Debug, Clone)]
pub struct RolloutPolicy {
    /// Expansion steps per rollout.
    pub depth: usize,

    /// Cap on the back-to-back counter's contribution.
    pub b2b_cap: f32,

    /// Opponent stack height that triggers the pressure bonus.
    pub height_threshold: f32,
}

impl RolloutPolicy {
    /// Creates a new rollout policy.
    pub fn new(depth: usize, b2b_cap: f32, height_threshold: f32) -> Self {
        RolloutPolicy {
            depth,
            b2b_cap,
            height_threshold,
        }
    }

    /// Estimates a reward in (0, 1) for `state`.
    ///
    /// A state that dies within the rollout horizon is worth exactly 0.0,
    /// discarding anything accumulated on the way there.
    pub fn estimate<S: GameState>(
        &self,
        state: &S,
        evaluator: &dyn Evaluator<S>,
        opponent: Option<&dyn OpponentModel<S>>,
        rng: &mut StdRng,
    ) -> f32 {
        let mut state = state.clone();
        let mut best = 0.0f32;

        for _ in 0..self.depth.max(1) {
            if state.is_terminal() {
                return 0.0;
            }

            let moves = state.legal_moves();
            if moves.is_empty() {
                return 0.0;
            }

            let mut scored: Vec<(S::Move, f32)> = moves
                .into_iter()
                .map(|mv| {
                    let value = evaluator.static_value(&state, &mv);
                    (mv, value)
                })
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

            let mut step = scored[0].1
                + state.attack_per_piece() / 10.0
                + state.back_to_back().min(self.b2b_cap) / 50.0;

            if let Some(model) = opponent {
                model.advance(&mut state);
                if model.is_dead(&state) {
                    step += OPPONENT_DEAD_BONUS;
                } else if model.stack_height(&state) >= self.height_threshold {
                    step += OPPONENT_PRESSURE_BONUS;
                }
            }

            best = best.max(step);

            let chosen = square_of_rank_sample(scored.len(), rng);
            state = state.apply(&scored[chosen].0);
        }

        (sigmoid(best) + 1.0) / 2.0
    }
}

/// Draws a rank index from the 1/rank² distribution over `len` candidates.
fn square_of_rank_sample(len: usize, rng: &mut StdRng) -> usize {
    let total: f32 = (1..=len).map(|rank| 1.0 / (rank * rank) as f32).sum();
    let mut draw = rng.gen::<f32>() * total;
    for i in 0..len {
        let rank = i + 1;
        let weight = 1.0 / (rank * rank) as f32;
        if draw < weight {
            return i;
        }
        draw -= weight;
    }
    0
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
