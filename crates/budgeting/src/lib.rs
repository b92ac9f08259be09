//! Budgeting domain: a budget limit plus the spending transactions recorded against it.

pub mod budget;

pub use budget::{Budget, BudgetAggregate, BudgetId, BudgetProps, BudgetUpdate, NewSpending};
