//! Traits for the external collaborators consumed by the search.
//!
//! The engine owns no game knowledge. Piece placement, rotation kicks, line
//! clearing and damage all live behind [`GameState`]; the hand-tuned or
//! learned position evaluation lives behind [`Evaluator`]; the simulated
//! opponent used for reward shaping lives behind [`OpponentModel`].

use std::fmt::Debug;

/// Hash-derived identity for a game state, used as the tree's node key.
///
/// Must be stable for logically-equal states and sensitive to the board
/// cells, the active and held piece, and the pending-garbage queue. Two
/// distinct states hashing equal are treated as one node; collisions are an
/// accepted modeling approximation, not defended against.
pub type Fingerprint = u32;

/// The game-rules collaborator.
///
/// States are cheap-to-clone snapshots: every job carries one, and the search
/// explores many successors of the same state. `apply` must therefore be pure
/// with respect to the receiver (any internal randomness is the state's own
/// generator, carried along in the clone).
pub trait GameState: Clone + Send + 'static {
    /// A candidate move. Opaque to the search; only the collaborators
    /// interpret it.
    type Move: Clone + Send + Sync + Debug + 'static;

    /// All legal moves from this state. A terminal state returns an empty
    /// list. A new call may recompute; the search calls it once per state.
    fn legal_moves(&self) -> Vec<Self::Move>;

    /// The deterministic successor of this state under `mv`.
    fn apply(&self, mv: &Self::Move) -> Self;

    /// True when no legal continuation exists.
    fn is_terminal(&self) -> bool;

    /// The node key for this state. See [`Fingerprint`].
    fn fingerprint(&self) -> Fingerprint;

    /// The agent's attack-per-piece rate, fed into rollout reward shaping.
    fn attack_per_piece(&self) -> f32 {
        0.0
    }

    /// The agent's back-to-back counter, fed capped into rollout reward
    /// shaping.
    fn back_to_back(&self) -> f32 {
        0.0
    }
}

/// The position-evaluation collaborator.
///
/// A pure function with no side effects, used both to build action priors at
/// node creation and as the rollout signal.
pub trait Evaluator<S: GameState>: Send + Sync {
    /// Static value of playing `mv` from `state`.
    fn static_value(&self, state: &S, mv: &S::Move) -> f32;
}

/// The optional simulated-opponent collaborator.
///
/// Consumed only inside rollout reward shaping: a rollout step advances the
/// opponent once and grants a bonus when the opponent dies or its stack
/// height crosses the configured threshold. The opponent's own state is
/// expected to live inside `S`, the same way the emulated game carries its
/// garbage meter.
pub trait OpponentModel<S: GameState>: Send + Sync {
    /// Advances the simulated opponent one step, returning the amount of
    /// garbage it sends.
    fn advance(&self, state: &mut S) -> f32;

    /// True when the simulated opponent has topped out.
    fn is_dead(&self, state: &S) -> bool;

    /// The simulated opponent's current stack height.
    fn stack_height(&self, state: &S) -> f32;
}
