//! Policies for the phases of the search.
//!
//! - Selection policies: how interior nodes choose the next action
//! - Aggregation policies: how backpropagated rewards fold into statistics
//! - The rollout estimator: how a freshly expanded state is scored

pub mod backprop;
pub mod rollout;
pub mod selection;

pub use backprop::{AggregationPolicy, MaxAggregation, MeanAggregation};
pub use rollout::RolloutPolicy;
pub use selection::{PuctPolicy, SelectionPolicy, SquareOfRankPolicy};
