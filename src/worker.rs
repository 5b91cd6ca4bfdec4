//! The worker state machine.
//!
//! One logical loop per worker thread: dequeue a job, advance the search one
//! step, enqueue the follow-up. Descent never recurses; the path carried in
//! each job is the call stack. A worker blocks only inside `dequeue` and
//! exits only on STOP (or when every lane into its queue has disconnected).

use std::sync::Arc;

use log::trace;
use rand::rngs::StdRng;

use crate::game_state::{Evaluator, Fingerprint, GameState, OpponentModel};
use crate::job::{Job, PathEntry};
use crate::policy::{AggregationPolicy, RolloutPolicy, SelectionPolicy};
use crate::queue::{LaneSender, WorkQueue};
use crate::search::EpisodeSignal;
use crate::stats::WorkerStatistics;
use crate::tree::{Node, TreeStore};

pub(crate) struct Worker<S: GameState> {
    pub(crate) id: usize,
    pub(crate) queue: WorkQueue<Job<S>>,
    pub(crate) sender: LaneSender<Job<S>>,
    pub(crate) tree: Arc<TreeStore<S::Move>>,
    pub(crate) evaluator: Arc<dyn Evaluator<S>>,
    pub(crate) opponent: Option<Arc<dyn OpponentModel<S>>>,
    pub(crate) selection: Arc<dyn SelectionPolicy<S::Move>>,
    pub(crate) aggregation: Arc<dyn AggregationPolicy>,
    pub(crate) rollout: RolloutPolicy,
    pub(crate) root_state: S,
    pub(crate) root_fingerprint: Fingerprint,
    pub(crate) episodes: Arc<EpisodeSignal>,
    pub(crate) work_stealing: bool,
    pub(crate) rng: StdRng,
    pub(crate) stats: WorkerStatistics,
}

impl<S: GameState> Worker<S> {
    /// Runs the loop until STOP, returning this worker's counters.
    pub(crate) fn run(mut self) -> WorkerStatistics {
        loop {
            let job = match self.queue.dequeue() {
                Some(job) => job,
                None => break,
            };
            match job {
                Job::Stop => {
                    trace!("worker {} stopping", self.id);
                    break;
                }
                Job::Put { node } => {
                    // Install a node built elsewhere into our write generation.
                    self.tree.insert(node, self.id);
                }
                Job::Select { state, path } => self.handle_select(state, path),
                Job::Backprop { reward, path } => self.handle_backprop(reward, path),
            }
        }
        self.stats
    }

    /// Forwards a job to `target`'s queue, unless our own queue has run dry,
    /// in which case we keep the job for ourselves. Ownership matters for
    /// writes, not for carrying a job payload, so keeping it is safe.
    fn dispatch(&mut self, target: usize, job: Job<S>) {
        if self.work_stealing && target != self.id && self.queue.is_empty() {
            trace!("worker {} stealing {} bound for {}", self.id, job.kind(), target);
            self.stats.steals += 1;
            self.sender.send_to(self.id, job);
            return;
        }
        self.sender.send_to(target, job);
    }

    fn handle_select(&mut self, state: S, mut path: Vec<PathEntry>) {
        let fingerprint = state.fingerprint();

        if state.is_terminal() {
            let reward = self.estimate(&state);
            // A terminal root has nowhere to backpropagate; the line ends.
            let Some(tail) = path.last() else {
                return;
            };
            let target = self.tree.owner(tail.parent);
            self.dispatch(target, Job::Backprop { reward, path });
            return;
        }

        if self.tree.contains(fingerprint) {
            let picked = self.tree.with_node_mut(fingerprint, self.id, |node| {
                if node.actions.is_empty() {
                    return None;
                }
                let index =
                    self.selection
                        .pick(node, path.len(), self.aggregation.as_ref(), &mut self.rng);
                // Virtual loss: commit the visit before the reward resolves.
                node.visits += 1;
                let action = &mut node.actions[index];
                action.visits += 1;
                Some((index as u32, action.mv.clone()))
            });

            match picked {
                Some(Some((action, mv))) => {
                    let next = state.apply(&mv);
                    let next_fingerprint = next.fingerprint();
                    path.push(PathEntry {
                        parent: fingerprint,
                        action,
                    });
                    self.stats.max_depth = self.stats.max_depth.max(path.len());
                    let target = self.tree.owner(next_fingerprint);
                    self.dispatch(target, Job::Select { state: next, path });
                }
                Some(None) => {
                    // Known node with no actions: the collaborator reported a
                    // dead end without flagging the state terminal. Treat it
                    // like a terminal select.
                    let reward = self.estimate(&state);
                    let Some(tail) = path.last() else {
                        return;
                    };
                    let target = self.tree.owner(tail.parent);
                    self.dispatch(target, Job::Backprop { reward, path });
                }
                None => {
                    debug_assert!(false, "node {fingerprint:08x} vanished between checks");
                }
            }
            return;
        }

        // First visit: expand.
        let node = Node::from_state(&state, self.evaluator.as_ref());
        let owner = self.tree.owner(fingerprint);
        if owner == self.id {
            self.tree.insert(node, self.id);
        } else {
            // Inserts are never stolen; the owner installs its own nodes.
            self.sender.send_to(owner, Job::Put { node });
        }
        self.stats.nodes_created += 1;

        let reward = self.estimate(&state);
        let Some(tail) = path.last() else {
            // The controller pre-inserts the root, so an unknown node with an
            // empty path should be unreachable.
            debug_assert!(false, "expanded the root without a path");
            self.reseed_root();
            return;
        };
        let target = self.tree.owner(tail.parent);
        self.dispatch(target, Job::Backprop { reward, path });
    }

    fn handle_backprop(&mut self, reward: f32, mut path: Vec<PathEntry>) {
        let Some(tail) = path.last().copied() else {
            debug_assert!(false, "backprop with an empty path");
            self.reseed_root();
            return;
        };

        let applied = self.tree.with_node_mut(tail.parent, self.id, |node| {
            if let Some(action) = node.actions.get_mut(tail.action as usize) {
                action.reward = self.aggregation.fold(action.reward, reward);
            }
            node.reward_buffer += reward;
        });
        debug_assert!(
            applied.is_some(),
            "backprop target {:08x} missing from the tree",
            tail.parent
        );
        self.stats.backprop_messages += 1;

        path.pop();
        if path.is_empty() {
            // The reward reached the root: one full episode is done. Re-seed
            // so this line of search keeps running.
            self.episodes.bump();
            let target = self.tree.owner(self.root_fingerprint);
            self.dispatch(
                target,
                Job::Select {
                    state: self.root_state.clone(),
                    path,
                },
            );
        } else {
            let parent = path.last().map(|entry| entry.parent);
            if let Some(parent) = parent {
                let target = self.tree.owner(parent);
                self.dispatch(target, Job::Backprop { reward, path });
            }
        }
    }

    fn estimate(&mut self, state: &S) -> f32 {
        self.rollout.estimate(
            state,
            self.evaluator.as_ref(),
            self.opponent.as_deref(),
            &mut self.rng,
        )
    }

    fn reseed_root(&mut self) {
        let target = self.tree.owner(self.root_fingerprint);
        self.dispatch(
            target,
            Job::Select {
                state: self.root_state.clone(),
                path: Vec::new(),
            },
        );
    }
}
