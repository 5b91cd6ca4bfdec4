//! Aggregation policies: how a backpropagated reward folds into an action's
//! stored reward.
//!
//! One search uses exactly one policy; the two rules give the stored R field
//! different meanings and must never be conflated within a tree.

/// Trait for reward-folding rules applied during backpropagation.
pub trait AggregationPolicy: Send + Sync {
    /// Folds a backpropagated `reward` into the `current` stored reward.
    fn fold(&self, current: f32, reward: f32) -> f32;

    /// Point estimate of an action's value from its stored statistics.
    fn value(&self, reward: f32, visits: u32) -> f32;
}

/// Expected-value aggregation: R is a running sum, value is the mean.
#[derive(Debug, Clone, Default)]
pub struct MeanAggregation;

impl AggregationPolicy for MeanAggregation {
    fn fold(&self, current: f32, reward: f32) -> f32 {
        current + reward
    }

    fn value(&self, reward: f32, visits: u32) -> f32 {
        if visits == 0 {
            return 0.0;
        }
        reward / visits as f32
    }
}

/// Optimistic aggregation: R is a running maximum, not a mean. A
/// backpropagated value only overwrites the stored reward when larger.
#[derive(Debug, Clone, Default)]
pub struct MaxAggregation;

impl AggregationPolicy for MaxAggregation {
    fn fold(&self, current: f32, reward: f32) -> f32 {
        current.max(reward)
    }

    fn value(&self, reward: f32, _visits: u32) -> f32 {
        reward
    }
}
