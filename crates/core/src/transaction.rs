//! Money movement entity shared by budgets (spending) and goals (contributions/withdrawals).

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyValue;
use crate::entity::{EntityMeta, Validate};
use crate::error::{DomainError, DomainResult};
use crate::id::{TransactionId, UserId};

/// Direction/purpose of a transaction. Amounts are always positive; the kind carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Outcome,
    GoalContribution,
    GoalWithdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Outcome => "outcome",
            TransactionKind::GoalContribution => "goal_contribution",
            TransactionKind::GoalWithdrawal => "goal_withdrawal",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "outcome" => Ok(TransactionKind::Outcome),
            "goal_contribution" => Ok(TransactionKind::GoalContribution),
            "goal_withdrawal" => Ok(TransactionKind::GoalWithdrawal),
            other => Err(DomainError::validation(format!(
                "unknown transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProps {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub amount: CurrencyValue,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub recurring: bool,
}

/// Editable subset of a transaction; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub amount: Option<CurrencyValue>,
    pub category: Option<Option<String>>,
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    meta: EntityMeta<TransactionId>,
    props: TransactionProps,
}

crate::impl_entity!(Transaction, TransactionId);

impl Transaction {
    pub fn new(props: TransactionProps) -> Self {
        Self {
            meta: EntityMeta::new(TransactionId::new()),
            props,
        }
    }

    pub fn restore(meta: EntityMeta<TransactionId>, props: TransactionProps) -> Self {
        Self { meta, props }
    }

    pub fn meta(&self) -> &EntityMeta<TransactionId> {
        &self.meta
    }

    /// Read-only view of the transaction's fields.
    pub fn props(&self) -> &TransactionProps {
        &self.props
    }

    pub fn amount(&self) -> &CurrencyValue {
        &self.props.amount
    }

    pub fn kind(&self) -> TransactionKind {
        self.props.kind
    }

    pub fn update(&mut self, changes: TransactionUpdate) {
        let TransactionUpdate {
            name,
            description,
            amount,
            category,
            occurred_at,
        } = changes;
        if let Some(name) = name {
            self.props.name = name;
        }
        if let Some(description) = description {
            self.props.description = description;
        }
        if let Some(amount) = amount {
            self.props.amount = amount;
        }
        if let Some(category) = category {
            self.props.category = category;
        }
        if let Some(occurred_at) = occurred_at {
            self.props.occurred_at = occurred_at;
        }
        self.meta.touch();
    }
}

impl Validate for Transaction {
    fn validate(&self) -> DomainResult<()> {
        if self.props.name.trim().is_empty() {
            return Err(DomainError::validation("transaction name is required"));
        }
        if !self.props.amount.is_positive() {
            return Err(DomainError::invalid_amount(
                "transaction amount must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Currency, Entity};
    use rust_decimal_macros::dec;

    fn props(amount: rust_decimal::Decimal) -> TransactionProps {
        TransactionProps {
            user_id: UserId::new(),
            name: "Groceries".to_string(),
            description: None,
            amount: CurrencyValue::new(amount, Currency::Usd),
            kind: TransactionKind::Outcome,
            category: Some("food".to_string()),
            occurred_at: Utc::now(),
            recurring: false,
        }
    }

    #[test]
    fn equality_is_by_id_only() {
        let a = Transaction::new(props(dec!(10)));
        let mut b = a.clone();
        b.update(TransactionUpdate {
            name: Some("Other".to_string()),
            ..Default::default()
        });
        assert_eq!(a, b);
        assert_ne!(a, Transaction::new(props(dec!(10))));
    }

    #[test]
    fn update_bumps_updated_at_and_keeps_identity() {
        let mut tx = Transaction::new(props(dec!(10)));
        let id = *tx.id();
        let created = tx.created_at();
        tx.update(TransactionUpdate {
            amount: Some(CurrencyValue::new(dec!(12), Currency::Usd)),
            category: Some(None),
            ..Default::default()
        });
        assert_eq!(*tx.id(), id);
        assert_eq!(tx.created_at(), created);
        assert!(tx.updated_at() >= created);
        assert_eq!(tx.amount().amount(), dec!(12));
        assert_eq!(tx.props().category, None);
    }

    #[test]
    fn validate_requires_name_and_positive_amount() {
        assert!(Transaction::new(props(dec!(1))).validate().is_ok());

        let zero = Transaction::new(props(dec!(0)));
        assert!(matches!(zero.validate(), Err(DomainError::InvalidAmount(_))));

        let mut blank = props(dec!(1));
        blank.name = "  ".to_string();
        assert!(matches!(
            Transaction::new(blank).validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn kinds_round_trip_through_their_string_form() {
        for kind in [
            TransactionKind::Income,
            TransactionKind::Outcome,
            TransactionKind::GoalContribution,
            TransactionKind::GoalWithdrawal,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
        }
        assert!("refund".parse::<TransactionKind>().is_err());
    }
}
