use chrono::{NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use fintrack_core::{
    AggregateRoot, Currency, CurrencyValue, DomainError, DomainResult, Entity, EntityMeta,
    Transaction, TransactionId, TransactionKind, TransactionProps, UserId, Validate, WatchList,
};

fintrack_core::uuid_id!(GoalId, "GoalId");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProps {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: Option<CurrencyValue>,
    /// Balance the user reported when the goal was created.
    pub current_amount: Option<CurrencyValue>,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub target_amount: Option<Option<CurrencyValue>>,
    pub current_amount: Option<Option<CurrencyValue>>,
    pub deadline: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone)]
pub struct Goal {
    meta: EntityMeta<GoalId>,
    props: GoalProps,
}

fintrack_core::impl_entity!(Goal, GoalId);

impl Goal {
    pub fn new(props: GoalProps) -> Self {
        Self {
            meta: EntityMeta::new(GoalId::new()),
            props,
        }
    }

    pub fn restore(meta: EntityMeta<GoalId>, props: GoalProps) -> Self {
        Self { meta, props }
    }

    pub fn meta(&self) -> &EntityMeta<GoalId> {
        &self.meta
    }

    pub fn props(&self) -> &GoalProps {
        &self.props
    }

    pub fn update(&mut self, changes: GoalUpdate) {
        let GoalUpdate {
            name,
            description,
            target_amount,
            current_amount,
            deadline,
        } = changes;
        if let Some(name) = name {
            self.props.name = name;
        }
        if let Some(description) = description {
            self.props.description = description;
        }
        if let Some(target_amount) = target_amount {
            self.props.target_amount = target_amount;
        }
        if let Some(current_amount) = current_amount {
            self.props.current_amount = current_amount;
        }
        if let Some(deadline) = deadline {
            self.props.deadline = deadline;
        }
        self.meta.touch();
    }
}

impl Validate for Goal {
    fn validate(&self) -> DomainResult<()> {
        if self.props.name.trim().is_empty() {
            return Err(DomainError::validation("goal name is required"));
        }
        if let Some(target) = &self.props.target_amount {
            if !target.is_positive() {
                return Err(DomainError::invalid_amount("goal target amount must be positive"));
            }
        }
        if let Some(current) = &self.props.current_amount {
            if current.is_negative() {
                return Err(DomainError::invalid_amount(
                    "goal current amount must not be negative",
                ));
            }
        }
        if let (Some(target), Some(current)) =
            (&self.props.target_amount, &self.props.current_amount)
        {
            target.ensure_same_currency(current)?;
        }
        Ok(())
    }
}

/// Aggregate: Goal + its contribution and withdrawal transactions.
#[derive(Debug, Clone)]
pub struct GoalAggregate {
    goal: Goal,
    transactions: WatchList<Transaction>,
}

impl GoalAggregate {
    pub fn new(goal: Goal) -> Self {
        Self {
            goal,
            transactions: WatchList::new(),
        }
    }

    pub fn new_goal(props: GoalProps) -> Self {
        Self::new(Goal::new(props))
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn transactions(&self) -> &WatchList<Transaction> {
        &self.transactions
    }

    /// Currency the goal is tracked in, if anything pins it yet:
    /// target, then current amount, then the first transaction.
    fn pinned_currency(&self) -> Option<Currency> {
        self.goal
            .props
            .target_amount
            .or(self.goal.props.current_amount)
            .map(|v| v.currency())
            .or_else(|| self.transactions.items().next().map(|tx| tx.amount().currency()))
    }

    pub fn currency(&self) -> Currency {
        self.pinned_currency().unwrap_or_default()
    }

    fn ensure_goal_currency(&self, amount: &CurrencyValue) -> DomainResult<()> {
        match self.pinned_currency() {
            Some(currency) => CurrencyValue::zero(currency).ensure_same_currency(amount),
            None => Ok(()),
        }
    }

    fn record(
        &mut self,
        kind: TransactionKind,
        amount: CurrencyValue,
        name: Option<String>,
        description: Option<String>,
        recurring: bool,
    ) -> DomainResult<TransactionId> {
        let default_name = match kind {
            TransactionKind::GoalWithdrawal => format!("Withdrawal from {}", self.goal.props.name),
            _ => format!("Contribution to {}", self.goal.props.name),
        };
        let tx = Transaction::new(TransactionProps {
            user_id: self.goal.props.user_id,
            name: name.unwrap_or(default_name),
            description,
            amount,
            kind,
            category: None,
            occurred_at: Utc::now(),
            recurring,
        });
        let id = *tx.id();
        self.transactions.add(tx)?;
        Ok(id)
    }

    pub fn contribute(
        &mut self,
        amount: CurrencyValue,
        name: Option<String>,
        description: Option<String>,
        recurring: bool,
    ) -> DomainResult<TransactionId> {
        if !amount.is_positive() {
            return Err(DomainError::invalid_amount(
                "contribution amount must be positive",
            ));
        }
        self.ensure_goal_currency(&amount)?;
        self.record(
            TransactionKind::GoalContribution,
            amount,
            name,
            description,
            recurring,
        )
    }

    /// Withdraw from the goal. Withdrawing the exact balance is allowed.
    pub fn withdraw(
        &mut self,
        amount: CurrencyValue,
        name: Option<String>,
        description: Option<String>,
    ) -> DomainResult<TransactionId> {
        if !amount.is_positive() {
            return Err(DomainError::invalid_amount(
                "withdrawal amount must be positive",
            ));
        }
        self.ensure_goal_currency(&amount)?;
        let available = self.total_contributed()?;
        if amount.amount() > available.amount() {
            return Err(DomainError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.record(
            TransactionKind::GoalWithdrawal,
            amount,
            name,
            description,
            false,
        )
    }

    /// Contributions minus withdrawals over the live transactions.
    pub fn total_contributed(&self) -> DomainResult<CurrencyValue> {
        self.transactions
            .items()
            .try_fold(CurrencyValue::zero(self.currency()), |acc, tx| match tx.kind() {
                TransactionKind::GoalWithdrawal => acc.subtract(tx.amount()),
                _ => acc.add(tx.amount()),
            })
    }

    /// `max(0, target - total_contributed)`; zero without a target.
    pub fn remaining_amount(&self) -> DomainResult<CurrencyValue> {
        let Some(target) = self.goal.props.target_amount else {
            return Ok(CurrencyValue::zero(self.currency()));
        };
        Ok(target.subtract(&self.total_contributed()?)?.clamp_zero())
    }

    /// Share of the target reached, in percent, clamped to `0..=100`.
    pub fn progress_percentage(&self) -> DomainResult<Decimal> {
        let Some(target) = self.goal.props.target_amount else {
            return Ok(Decimal::ZERO);
        };
        let total = self.total_contributed()?;
        let ratio = total
            .amount()
            .checked_div(target.amount())
            .ok_or_else(|| DomainError::invariant("goal target amount is zero"))?;
        let percent = (ratio * Decimal::ONE_HUNDRED)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Ok(percent)
    }

    pub fn is_completed(&self) -> DomainResult<bool> {
        match self.goal.props.target_amount {
            Some(target) => Ok(self.total_contributed()?.amount() >= target.amount()),
            None => Ok(false),
        }
    }

    pub fn update_goal_details(&mut self, changes: GoalUpdate) -> DomainResult<()> {
        self.goal.update(changes);
        self.validate()
    }
}

impl Validate for GoalAggregate {
    fn validate(&self) -> DomainResult<()> {
        self.goal.validate()?;
        let currency = CurrencyValue::zero(self.currency());
        for tx in self.transactions.items() {
            tx.validate()?;
            if !matches!(
                tx.kind(),
                TransactionKind::GoalContribution | TransactionKind::GoalWithdrawal
            ) {
                return Err(DomainError::validation(format!(
                    "goal transaction must be a contribution or withdrawal, got {}",
                    tx.kind()
                )));
            }
            currency.ensure_same_currency(tx.amount())?;
        }
        Ok(())
    }
}

impl AggregateRoot for GoalAggregate {
    type Root = Goal;
    type Child = Transaction;

    fn root(&self) -> &Goal {
        &self.goal
    }

    fn children(&self) -> &WatchList<Transaction> {
        &self.transactions
    }

    fn user_id(&self) -> UserId {
        self.goal.props.user_id
    }

    fn reconstitute(root: Goal, children: Vec<Transaction>) -> Self {
        Self {
            goal: root,
            transactions: WatchList::from_items(children),
        }
    }

    fn mark_persisted(&mut self) {
        self.transactions.commit();
    }
}
