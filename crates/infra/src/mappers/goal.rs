use fintrack_core::{Transaction, UserId};
use fintrack_goals::{Goal, GoalAggregate, GoalId, GoalProps};

use super::transaction::{TRANSACTION_COLUMNS, transaction_from_row, transaction_to_row};
use super::{read_meta, with_meta};
use crate::repository::{
    AggregateMapper, Column, Criterion, RepositoryError, Row, SqlValue, TableSpec,
};

const GOAL_COLUMNS: &[Column] = &[
    Column::text("id"),
    Column::text("user_id"),
    Column::text("name"),
    Column::text("description"),
    Column::text("target_amount"),
    Column::text("target_currency"),
    Column::text("current_amount"),
    Column::text("current_currency"),
    Column::text("deadline"),
    Column::text("created_at"),
    Column::text("updated_at"),
];

pub static GOAL_SPEC: TableSpec = TableSpec {
    root_table: "goals",
    root_columns: GOAL_COLUMNS,
    sortable: &["name", "deadline", "created_at", "updated_at"],
    child_table: "transactions",
    child_columns: TRANSACTION_COLUMNS,
    link_table: "goal_transactions",
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalFilter {
    pub user_id: Option<UserId>,
    pub name: Option<String>,
}

impl GoalFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GoalMapper;

impl AggregateMapper for GoalMapper {
    type Aggregate = GoalAggregate;
    type Filter = GoalFilter;

    fn spec(&self) -> &TableSpec {
        &GOAL_SPEC
    }

    fn root_to_row(&self, goal: &Goal) -> Row {
        let props = goal.props();
        with_meta(Row::new(), goal.meta())
            .with("user_id", SqlValue::text(props.user_id.to_string()))
            .with("name", SqlValue::text(props.name.clone()))
            .with("description", SqlValue::opt_text(props.description.clone()))
            .with_money("target_amount", "target_currency", props.target_amount.as_ref())
            .with_money("current_amount", "current_currency", props.current_amount.as_ref())
            .with("deadline", SqlValue::opt_date(props.deadline))
    }

    fn root_from_row(&self, row: &Row) -> Result<Goal, RepositoryError> {
        let meta = read_meta::<GoalId>(row)?;
        let props = GoalProps {
            user_id: UserId::from_uuid(row.uuid("user_id")?),
            name: row.string("name")?,
            description: row.opt_string("description")?,
            target_amount: row.opt_money("target_amount", "target_currency")?,
            current_amount: row.opt_money("current_amount", "current_currency")?,
            deadline: row.opt_date("deadline")?,
        };
        Ok(Goal::restore(meta, props))
    }

    fn child_to_row(&self, child: &Transaction) -> Row {
        transaction_to_row(child)
    }

    fn child_from_row(&self, row: &Row) -> Result<Transaction, RepositoryError> {
        transaction_from_row(row)
    }

    fn filter_criteria(&self, filter: &GoalFilter) -> Vec<Criterion> {
        let mut criteria = Vec::new();
        if let Some(user_id) = filter.user_id {
            criteria.push(Criterion::equals("user_id", SqlValue::text(user_id.to_string())));
        }
        if let Some(name) = &filter.name {
            criteria.push(Criterion::equals("name", SqlValue::text(name.clone())));
        }
        criteria
    }
}
