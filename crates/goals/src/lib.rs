//! Goals domain module: savings goals and the contributions/withdrawals made towards them.

pub mod goal;

pub use goal::{Goal, GoalAggregate, GoalId, GoalProps, GoalUpdate};
