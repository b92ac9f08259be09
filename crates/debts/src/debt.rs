use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fintrack_core::{
    AggregateRoot, CurrencyValue, DomainError, DomainResult, Entity, EntityMeta, UserId,
    Validate, WatchList,
};

fintrack_core::uuid_id!(DebtId, "DebtId");
fintrack_core::uuid_id!(DebtPaymentId, "DebtPaymentId");

/// Name given to the payment synthesized for an amount already paid before tracking began.
pub const ALREADY_PAID_PAYMENT_NAME: &str = "Already paid";

const MAX_RATE: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtProps {
    pub user_id: UserId,
    pub lender: String,
    pub purpose: Option<String>,
    /// Principal owed.
    pub amount: CurrencyValue,
    /// Interest rate in percent (`0..=100`).
    pub rate: Decimal,
    pub due_date: Option<NaiveDate>,
}

/// Editable subset of a debt. The principal is not editable after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebtUpdate {
    pub lender: Option<String>,
    pub purpose: Option<Option<String>>,
    pub rate: Option<Decimal>,
    pub due_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone)]
pub struct Debt {
    meta: EntityMeta<DebtId>,
    props: DebtProps,
}

fintrack_core::impl_entity!(Debt, DebtId);

impl Debt {
    pub fn new(props: DebtProps) -> Self {
        Self {
            meta: EntityMeta::new(DebtId::new()),
            props,
        }
    }

    pub fn restore(meta: EntityMeta<DebtId>, props: DebtProps) -> Self {
        Self { meta, props }
    }

    pub fn meta(&self) -> &EntityMeta<DebtId> {
        &self.meta
    }

    pub fn props(&self) -> &DebtProps {
        &self.props
    }

    pub fn amount(&self) -> &CurrencyValue {
        &self.props.amount
    }

    pub fn update(&mut self, changes: DebtUpdate) {
        let DebtUpdate {
            lender,
            purpose,
            rate,
            due_date,
        } = changes;
        if let Some(lender) = lender {
            self.props.lender = lender;
        }
        if let Some(purpose) = purpose {
            self.props.purpose = purpose;
        }
        if let Some(rate) = rate {
            self.props.rate = rate;
        }
        if let Some(due_date) = due_date {
            self.props.due_date = due_date;
        }
        self.meta.touch();
    }
}

impl Validate for Debt {
    fn validate(&self) -> DomainResult<()> {
        if self.props.lender.trim().is_empty() {
            return Err(DomainError::validation("debt lender is required"));
        }
        if !self.props.amount.is_positive() {
            return Err(DomainError::invalid_amount("debt amount must be positive"));
        }
        if self.props.rate < Decimal::ZERO || self.props.rate > MAX_RATE {
            return Err(DomainError::validation(format!(
                "debt rate must be between 0 and 100, got {}",
                self.props.rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtPaymentProps {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub amount: CurrencyValue,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DebtPayment {
    meta: EntityMeta<DebtPaymentId>,
    props: DebtPaymentProps,
}

fintrack_core::impl_entity!(DebtPayment, DebtPaymentId);

impl DebtPayment {
    pub fn new(props: DebtPaymentProps) -> Self {
        Self {
            meta: EntityMeta::new(DebtPaymentId::new()),
            props,
        }
    }

    pub fn restore(meta: EntityMeta<DebtPaymentId>, props: DebtPaymentProps) -> Self {
        Self { meta, props }
    }

    pub fn meta(&self) -> &EntityMeta<DebtPaymentId> {
        &self.meta
    }

    pub fn props(&self) -> &DebtPaymentProps {
        &self.props
    }

    pub fn amount(&self) -> &CurrencyValue {
        &self.props.amount
    }
}

impl Validate for DebtPayment {
    fn validate(&self) -> DomainResult<()> {
        if self.props.name.trim().is_empty() {
            return Err(DomainError::validation("payment name is required"));
        }
        if !self.props.amount.is_positive() {
            return Err(DomainError::invalid_amount("payment amount must be positive"));
        }
        Ok(())
    }
}

/// Aggregate: Debt + the payments made against it.
#[derive(Debug, Clone)]
pub struct DebtAggregate {
    debt: Debt,
    payments: WatchList<DebtPayment>,
}

impl DebtAggregate {
    /// Start tracking a debt. A positive `current_paid_amount` becomes one
    /// synthesized "Already paid" payment.
    pub fn new_debt(
        props: DebtProps,
        current_paid_amount: Option<CurrencyValue>,
    ) -> DomainResult<Self> {
        let mut aggregate = Self {
            debt: Debt::new(props),
            payments: WatchList::new(),
        };
        if let Some(paid) = current_paid_amount.filter(CurrencyValue::is_positive) {
            aggregate.pay(
                paid,
                Some(ALREADY_PAID_PAYMENT_NAME.to_string()),
                Some("Amount paid before the debt was registered".to_string()),
            )?;
        }
        Ok(aggregate)
    }

    pub fn debt(&self) -> &Debt {
        &self.debt
    }

    pub fn payments(&self) -> &WatchList<DebtPayment> {
        &self.payments
    }

    /// Record a payment. Amount positivity is checked by [`Validate::validate`].
    pub fn pay(
        &mut self,
        amount: CurrencyValue,
        name: Option<String>,
        description: Option<String>,
    ) -> DomainResult<DebtPaymentId> {
        self.debt.props.amount.ensure_same_currency(&amount)?;
        let payment = DebtPayment::new(DebtPaymentProps {
            user_id: self.debt.props.user_id,
            name: name.unwrap_or_else(|| format!("Payment to {}", self.debt.props.lender)),
            description,
            amount,
            paid_at: Utc::now(),
        });
        let id = *payment.id();
        self.payments.add(payment)?;
        Ok(id)
    }

    pub fn remove_payment(&mut self, payment_id: DebtPaymentId) -> DomainResult<()> {
        if !self.payments.remove(&payment_id) {
            return Err(DomainError::PaymentNotFound(payment_id.to_string()));
        }
        Ok(())
    }

    /// Sum of live payments, in the debt currency.
    pub fn current_paid_amount(&self) -> DomainResult<CurrencyValue> {
        self.payments
            .items()
            .try_fold(CurrencyValue::zero(self.debt.props.amount.currency()), |acc, p| {
                acc.add(p.amount())
            })
    }

    pub fn remaining_amount(&self) -> DomainResult<CurrencyValue> {
        let left = self.debt.props.amount.subtract(&self.current_paid_amount()?)?;
        Ok(left.clamp_zero())
    }

    pub fn is_paid_off(&self) -> DomainResult<bool> {
        Ok(self.remaining_amount()?.is_zero())
    }

    pub fn update_debt_details(&mut self, changes: DebtUpdate) -> DomainResult<()> {
        self.debt.update(changes);
        self.validate()
    }
}

impl Validate for DebtAggregate {
    fn validate(&self) -> DomainResult<()> {
        self.debt.validate()?;
        for payment in self.payments.items() {
            payment.validate()?;
            self.debt.props.amount.ensure_same_currency(payment.amount())?;
        }
        Ok(())
    }
}

impl AggregateRoot for DebtAggregate {
    type Root = Debt;
    type Child = DebtPayment;

    fn root(&self) -> &Debt {
        &self.debt
    }

    fn children(&self) -> &WatchList<DebtPayment> {
        &self.payments
    }

    fn user_id(&self) -> UserId {
        self.debt.props.user_id
    }

    fn reconstitute(root: Debt, children: Vec<DebtPayment>) -> Self {
        Self {
            debt: root,
            payments: WatchList::from_items(children),
        }
    }

    fn mark_persisted(&mut self) {
        self.payments.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_core::Currency;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn usd(amount: Decimal) -> CurrencyValue {
        CurrencyValue::new(amount, Currency::Usd)
    }

    fn test_props(amount: Decimal) -> DebtProps {
        DebtProps {
            user_id: UserId::new(),
            lender: "Bank".to_string(),
            purpose: Some("Car".to_string()),
            amount: usd(amount),
            rate: dec!(4.5),
            due_date: NaiveDate::from_ymd_opt(2030, 6, 1),
        }
    }

    #[test]
    fn new_debt_synthesizes_already_paid_payment() {
        let debt = DebtAggregate::new_debt(test_props(dec!(10000)), Some(usd(dec!(2500)))).unwrap();

        let payments: Vec<_> = debt.payments().items().collect();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].props().name, ALREADY_PAID_PAYMENT_NAME);
        assert_eq!(payments[0].amount(), &usd(dec!(2500)));
        assert_eq!(debt.current_paid_amount().unwrap().amount(), dec!(2500));
        assert_eq!(debt.remaining_amount().unwrap().amount(), dec!(7500));
        assert!(debt.validate().is_ok());
    }

    #[test]
    fn new_debt_without_prior_payment_has_no_children() {
        let none = DebtAggregate::new_debt(test_props(dec!(100)), None).unwrap();
        let zero = DebtAggregate::new_debt(test_props(dec!(100)), Some(usd(dec!(0)))).unwrap();
        assert!(none.payments().is_empty());
        assert!(zero.payments().is_empty());
        assert_eq!(zero.current_paid_amount().unwrap(), usd(dec!(0)));
    }

    #[test]
    fn removing_a_payment_excludes_it_from_paid_amount() {
        let mut debt = DebtAggregate::new_debt(test_props(dec!(10000)), None).unwrap();
        let first = debt.pay(usd(dec!(500)), None, None).unwrap();
        let second = debt.pay(usd(dec!(500)), None, None).unwrap();

        debt.remove_payment(first).unwrap();

        assert_eq!(debt.current_paid_amount().unwrap().amount(), dec!(500));
        let removed = debt.payments().removed_items();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id(), &first);
        assert!(debt.payments().contains(&second));
    }

    #[test]
    fn removing_an_unknown_payment_fails() {
        let mut debt = DebtAggregate::new_debt(test_props(dec!(100)), None).unwrap();
        let missing = DebtPaymentId::new();
        assert_eq!(
            debt.remove_payment(missing),
            Err(DomainError::PaymentNotFound(missing.to_string()))
        );
    }

    #[test]
    fn pay_rejects_other_currency_and_validate_rejects_non_positive() {
        let mut debt = DebtAggregate::new_debt(test_props(dec!(100)), None).unwrap();
        let err = debt
            .pay(CurrencyValue::new(dec!(5), Currency::Eur), None, None)
            .unwrap_err();
        assert!(matches!(err, DomainError::CurrencyMismatch { .. }));

        debt.pay(usd(dec!(-5)), None, None).unwrap();
        assert!(matches!(debt.validate(), Err(DomainError::InvalidAmount(_))));
    }

    #[test]
    fn overpaid_debt_is_paid_off_with_zero_remaining() {
        let mut debt = DebtAggregate::new_debt(test_props(dec!(100)), None).unwrap();
        debt.pay(usd(dec!(60)), None, None).unwrap();
        assert!(!debt.is_paid_off().unwrap());
        debt.pay(usd(dec!(60)), None, None).unwrap();
        assert!(debt.is_paid_off().unwrap());
        assert_eq!(debt.remaining_amount().unwrap(), usd(dec!(0)));
    }

    #[test]
    fn update_details_keeps_principal_and_checks_rate() {
        let mut debt = DebtAggregate::new_debt(test_props(dec!(100)), None).unwrap();
        debt.update_debt_details(DebtUpdate {
            lender: Some("Credit union".to_string()),
            due_date: Some(None),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(debt.debt().props().lender, "Credit union");
        assert_eq!(debt.debt().props().due_date, None);
        assert_eq!(debt.debt().amount(), &usd(dec!(100)));

        let err = debt
            .update_debt_details(DebtUpdate {
                rate: Some(dec!(120)),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn paid_amount_is_sum_of_live_payments(
            cents in prop::collection::vec(1i64..1_000_000, 0..16),
            remove_mask in prop::collection::vec(any::<bool>(), 16),
        ) {
            let mut debt = DebtAggregate::new_debt(test_props(dec!(50000)), None).unwrap();
            let ids: Vec<_> = cents
                .iter()
                .map(|c| debt.pay(usd(Decimal::new(*c, 2)), None, None).unwrap())
                .collect();

            let mut expected = Decimal::ZERO;
            for (i, id) in ids.iter().enumerate() {
                if remove_mask[i] {
                    debt.remove_payment(*id).unwrap();
                } else {
                    expected += Decimal::new(cents[i], 2);
                }
            }

            prop_assert_eq!(debt.current_paid_amount().unwrap().amount(), expected);
            prop_assert!(!debt.remaining_amount().unwrap().is_negative());
        }
    }
}
