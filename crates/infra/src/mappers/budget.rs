use fintrack_budgeting::{Budget, BudgetAggregate, BudgetId, BudgetProps};
use fintrack_core::{Transaction, UserId};

use super::transaction::{TRANSACTION_COLUMNS, transaction_from_row, transaction_to_row};
use super::{read_meta, with_meta};
use crate::repository::{
    AggregateMapper, Column, Criterion, RepositoryError, Row, SqlValue, TableSpec,
};

const BUDGET_COLUMNS: &[Column] = &[
    Column::text("id"),
    Column::text("user_id"),
    Column::text("name"),
    Column::text("amount"),
    Column::text("currency"),
    Column::text("category"),
    Column::text("start_date"),
    Column::text("end_date"),
    Column::text("created_at"),
    Column::text("updated_at"),
];

pub static BUDGET_SPEC: TableSpec = TableSpec {
    root_table: "budgets",
    root_columns: BUDGET_COLUMNS,
    sortable: &["name", "category", "start_date", "end_date", "created_at", "updated_at"],
    child_table: "transactions",
    child_columns: TRANSACTION_COLUMNS,
    link_table: "budget_transactions",
};

/// Root-field filter for budgets; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetFilter {
    pub user_id: Option<UserId>,
    pub name: Option<String>,
    pub category: Option<String>,
}

impl BudgetFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetMapper;

impl AggregateMapper for BudgetMapper {
    type Aggregate = BudgetAggregate;
    type Filter = BudgetFilter;

    fn spec(&self) -> &TableSpec {
        &BUDGET_SPEC
    }

    fn root_to_row(&self, budget: &Budget) -> Row {
        let props = budget.props();
        with_meta(Row::new(), budget.meta())
            .with("user_id", SqlValue::text(props.user_id.to_string()))
            .with("name", SqlValue::text(props.name.clone()))
            .with_money("amount", "currency", Some(&props.amount))
            .with("category", SqlValue::opt_text(props.category.clone()))
            .with("start_date", SqlValue::date(props.start_date))
            .with("end_date", SqlValue::opt_date(props.end_date))
    }

    fn root_from_row(&self, row: &Row) -> Result<Budget, RepositoryError> {
        let meta = read_meta::<BudgetId>(row)?;
        let props = BudgetProps {
            user_id: UserId::from_uuid(row.uuid("user_id")?),
            name: row.string("name")?,
            amount: row.money("amount", "currency")?,
            category: row.opt_string("category")?,
            start_date: row.date("start_date")?,
            end_date: row.opt_date("end_date")?,
        };
        Ok(Budget::restore(meta, props))
    }

    fn child_to_row(&self, child: &Transaction) -> Row {
        transaction_to_row(child)
    }

    fn child_from_row(&self, row: &Row) -> Result<Transaction, RepositoryError> {
        transaction_from_row(row)
    }

    fn filter_criteria(&self, filter: &BudgetFilter) -> Vec<Criterion> {
        let mut criteria = Vec::new();
        if let Some(user_id) = filter.user_id {
            criteria.push(Criterion::equals("user_id", SqlValue::text(user_id.to_string())));
        }
        if let Some(name) = &filter.name {
            criteria.push(Criterion::equals("name", SqlValue::text(name.clone())));
        }
        if let Some(category) = &filter.category {
            criteria.push(Criterion::equals("category", SqlValue::text(category.clone())));
        }
        criteria
    }
}
