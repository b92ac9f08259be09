use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fintrack_core::{
    AggregateRoot, CurrencyValue, DomainError, DomainResult, Entity, EntityMeta, Transaction,
    TransactionId, TransactionKind, TransactionProps, TransactionUpdate, UserId, Validate,
    WatchList,
};

fintrack_core::uuid_id!(
    /// Budget identifier.
    BudgetId,
    "BudgetId"
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetProps {
    pub user_id: UserId,
    pub name: String,
    /// Spending limit for the period.
    pub amount: CurrencyValue,
    pub category: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Editable subset of a budget; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetUpdate {
    pub name: Option<String>,
    pub amount: Option<CurrencyValue>,
    pub category: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
}

/// Root entity: Budget.
#[derive(Debug, Clone)]
pub struct Budget {
    meta: EntityMeta<BudgetId>,
    props: BudgetProps,
}

fintrack_core::impl_entity!(Budget, BudgetId);

impl Budget {
    pub fn new(props: BudgetProps) -> Self {
        Self {
            meta: EntityMeta::new(BudgetId::new()),
            props,
        }
    }

    pub fn restore(meta: EntityMeta<BudgetId>, props: BudgetProps) -> Self {
        Self { meta, props }
    }

    pub fn meta(&self) -> &EntityMeta<BudgetId> {
        &self.meta
    }

    pub fn props(&self) -> &BudgetProps {
        &self.props
    }

    pub fn update(&mut self, changes: BudgetUpdate) {
        let BudgetUpdate {
            name,
            amount,
            category,
            start_date,
            end_date,
        } = changes;
        if let Some(name) = name {
            self.props.name = name;
        }
        if let Some(amount) = amount {
            self.props.amount = amount;
        }
        if let Some(category) = category {
            self.props.category = category;
        }
        if let Some(start_date) = start_date {
            self.props.start_date = start_date;
        }
        if let Some(end_date) = end_date {
            self.props.end_date = end_date;
        }
        self.meta.touch();
    }
}

impl Validate for Budget {
    fn validate(&self) -> DomainResult<()> {
        if self.props.name.trim().is_empty() {
            return Err(DomainError::validation("budget name is required"));
        }
        if !self.props.amount.is_positive() {
            return Err(DomainError::invalid_amount("budget amount must be positive"));
        }
        if let Some(end) = self.props.end_date {
            if end < self.props.start_date {
                return Err(DomainError::validation(
                    "budget end_date must not precede start_date",
                ));
            }
        }
        Ok(())
    }
}

/// Input for recording a spending against a budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSpending {
    pub amount: CurrencyValue,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub recurring: bool,
}

/// Aggregate: Budget + its spending transactions.
#[derive(Debug, Clone)]
pub struct BudgetAggregate {
    budget: Budget,
    spendings: WatchList<Transaction>,
}

impl BudgetAggregate {
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            spendings: WatchList::new(),
        }
    }

    pub fn new_budget(props: BudgetProps) -> Self {
        Self::new(Budget::new(props))
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn spendings(&self) -> &WatchList<Transaction> {
        &self.spendings
    }

    /// Direct access to the tracked spendings. Whatever is put here is checked by
    /// [`Validate::validate`] before saving.
    pub fn spendings_mut(&mut self) -> &mut WatchList<Transaction> {
        &mut self.spendings
    }

    pub fn record_spending(&mut self, input: NewSpending) -> DomainResult<TransactionId> {
        self.budget.props.amount.ensure_same_currency(&input.amount)?;
        let tx = Transaction::new(TransactionProps {
            user_id: self.budget.props.user_id,
            name: input.name,
            description: input.description,
            amount: input.amount,
            kind: TransactionKind::Outcome,
            category: input.category.or_else(|| self.budget.props.category.clone()),
            occurred_at: input.occurred_at,
            recurring: input.recurring,
        });
        let id = *tx.id();
        self.spendings.add(tx)?;
        Ok(id)
    }

    pub fn update_spending(
        &mut self,
        spending_id: TransactionId,
        changes: TransactionUpdate,
    ) -> DomainResult<()> {
        if let Some(amount) = &changes.amount {
            self.budget.props.amount.ensure_same_currency(amount)?;
        }
        let mut tx = self
            .spendings
            .get(&spending_id)
            .cloned()
            .ok_or_else(DomainError::not_found)?;
        tx.update(changes);
        self.spendings.update(tx);
        Ok(())
    }

    pub fn remove_spending(&mut self, spending_id: TransactionId) -> DomainResult<()> {
        if !self.spendings.remove(&spending_id) {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    pub fn update_details(&mut self, changes: BudgetUpdate) -> DomainResult<()> {
        self.budget.update(changes);
        self.validate()
    }

    /// Sum of live spendings, in the budget currency.
    pub fn total_spent(&self) -> DomainResult<CurrencyValue> {
        self.spendings
            .items()
            .try_fold(CurrencyValue::zero(self.budget.props.amount.currency()), |acc, tx| {
                acc.add(tx.amount())
            })
    }

    /// Limit minus spending, never below zero.
    pub fn remaining(&self) -> DomainResult<CurrencyValue> {
        let left = self.budget.props.amount.subtract(&self.total_spent()?)?;
        Ok(left.clamp_zero())
    }

    pub fn is_over_budget(&self) -> DomainResult<bool> {
        Ok(self.total_spent()?.amount() > self.budget.props.amount.amount())
    }
}

impl Validate for BudgetAggregate {
    fn validate(&self) -> DomainResult<()> {
        self.budget.validate()?;
        for tx in self.spendings.items() {
            tx.validate()?;
            if tx.kind() != TransactionKind::Outcome {
                return Err(DomainError::validation(format!(
                    "budget spending must be an outcome, got {}",
                    tx.kind()
                )));
            }
            self.budget.props.amount.ensure_same_currency(tx.amount())?;
        }
        Ok(())
    }
}

impl AggregateRoot for BudgetAggregate {
    type Root = Budget;
    type Child = Transaction;

    fn root(&self) -> &Budget {
        &self.budget
    }

    fn children(&self) -> &WatchList<Transaction> {
        &self.spendings
    }

    fn user_id(&self) -> UserId {
        self.budget.props.user_id
    }

    fn reconstitute(root: Budget, children: Vec<Transaction>) -> Self {
        Self {
            budget: root,
            spendings: WatchList::from_items(children),
        }
    }

    fn mark_persisted(&mut self) {
        self.spendings.commit();
    }
}
