use tracing::instrument;

use fintrack_core::{AggregateRoot, CurrencyValue, UserId};
use fintrack_debts::{DebtAggregate, DebtId, DebtPaymentId, DebtProps, DebtUpdate};

use super::{UseCaseResult, load_owned, persist};
use crate::mappers::DebtFilter;
use crate::repository::{AggregateRepository, FindOptions};

#[derive(Debug, Clone)]
pub struct DebtService<R> {
    repo: R,
}

impl<R> DebtService<R>
where
    R: AggregateRepository<Aggregate = DebtAggregate, Filter = DebtFilter>,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Register a debt. A positive `current_paid_amount` is stored as one
    /// "Already paid" payment.
    #[instrument(skip(self, props, current_paid_amount), fields(user_id = %props.user_id), err)]
    pub async fn create_debt(
        &self,
        props: DebtProps,
        current_paid_amount: Option<CurrencyValue>,
    ) -> UseCaseResult<DebtAggregate> {
        let debt = DebtAggregate::new_debt(props, current_paid_amount)?;
        let debt = persist(&self.repo, debt).await?;
        tracing::info!(debt_id = %debt.id(), payments = debt.payments().len(), "debt created");
        Ok(debt)
    }

    #[instrument(skip(self), err)]
    pub async fn get_debt(&self, user_id: UserId, debt_id: DebtId) -> UseCaseResult<DebtAggregate> {
        load_owned(&self.repo, user_id, &debt_id).await
    }

    #[instrument(skip(self, options), err)]
    pub async fn list_debts(
        &self,
        user_id: UserId,
        options: &FindOptions,
    ) -> UseCaseResult<Vec<DebtAggregate>> {
        Ok(self
            .repo
            .find_many(&DebtFilter::for_user(user_id), options)
            .await?)
    }

    #[instrument(skip(self, name, description), fields(amount = %amount), err)]
    pub async fn pay(
        &self,
        user_id: UserId,
        debt_id: DebtId,
        amount: CurrencyValue,
        name: Option<String>,
        description: Option<String>,
    ) -> UseCaseResult<(DebtAggregate, DebtPaymentId)> {
        let mut debt = load_owned(&self.repo, user_id, &debt_id).await?;
        let payment_id = debt.pay(amount, name, description)?;
        let debt = persist(&self.repo, debt).await?;
        if debt.is_paid_off()? {
            tracing::info!("debt paid off");
        }
        Ok((debt, payment_id))
    }

    #[instrument(skip(self), err)]
    pub async fn remove_payment(
        &self,
        user_id: UserId,
        debt_id: DebtId,
        payment_id: DebtPaymentId,
    ) -> UseCaseResult<DebtAggregate> {
        let mut debt = load_owned(&self.repo, user_id, &debt_id).await?;
        debt.remove_payment(payment_id)?;
        persist(&self.repo, debt).await
    }

    #[instrument(skip(self, changes), err)]
    pub async fn update_debt_details(
        &self,
        user_id: UserId,
        debt_id: DebtId,
        changes: DebtUpdate,
    ) -> UseCaseResult<DebtAggregate> {
        let mut debt = load_owned(&self.repo, user_id, &debt_id).await?;
        debt.update_debt_details(changes)?;
        persist(&self.repo, debt).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete_debt(&self, user_id: UserId, debt_id: DebtId) -> UseCaseResult<()> {
        let debt = load_owned(&self.repo, user_id, &debt_id).await?;
        self.repo.soft_delete(&debt).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_core::{Currency, DomainError};
    use fintrack_debts::ALREADY_PAID_PAYMENT_NAME;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::mappers::DebtMapper;
    use crate::repository::InMemoryAggregateRepository;
    use crate::use_cases::UseCaseError;

    fn service() -> DebtService<InMemoryAggregateRepository<DebtMapper>> {
        DebtService::new(InMemoryAggregateRepository::default())
    }

    fn usd(amount: Decimal) -> CurrencyValue {
        CurrencyValue::new(amount, Currency::Usd)
    }

    fn props(user_id: UserId) -> DebtProps {
        DebtProps {
            user_id,
            lender: "Bank".to_string(),
            purpose: Some("car".to_string()),
            amount: usd(dec!(1000)),
            rate: dec!(4.5),
            due_date: None,
        }
    }

    #[tokio::test]
    async fn already_paid_amount_is_stored_as_a_payment() {
        let service = service();
        let user_id = UserId::new();
        let debt = service
            .create_debt(props(user_id), Some(usd(dec!(300))))
            .await
            .unwrap();

        let reloaded = service.get_debt(user_id, *debt.id()).await.unwrap();
        let payments: Vec<_> = reloaded.payments().items().collect();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].props().name, ALREADY_PAID_PAYMENT_NAME);
        assert_eq!(reloaded.remaining_amount().unwrap(), usd(dec!(700)));
    }

    #[tokio::test]
    async fn paying_off_and_removing_a_payment() {
        let service = service();
        let user_id = UserId::new();
        let debt = service.create_debt(props(user_id), None).await.unwrap();
        let debt_id = *debt.id();

        let (debt, payment_id) = service
            .pay(user_id, debt_id, usd(dec!(1000)), None, None)
            .await
            .unwrap();
        assert!(debt.is_paid_off().unwrap());

        let debt = service
            .remove_payment(user_id, debt_id, payment_id)
            .await
            .unwrap();
        assert_eq!(debt.remaining_amount().unwrap(), usd(dec!(1000)));

        let err = service
            .remove_payment(user_id, debt_id, payment_id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "payment_not_found");
        assert_eq!(service.repository().row_counts().unwrap().children, 0);
    }

    #[tokio::test]
    async fn invalid_rate_is_rejected_and_not_saved() {
        let service = service();
        let user_id = UserId::new();
        let debt = service.create_debt(props(user_id), None).await.unwrap();

        let err = service
            .update_debt_details(
                user_id,
                *debt.id(),
                DebtUpdate {
                    rate: Some(dec!(150)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::Domain(DomainError::Validation(_))));

        let stored = service.get_debt(user_id, *debt.id()).await.unwrap();
        assert_eq!(stored.debt().props().rate, dec!(4.5));
    }

    #[tokio::test]
    async fn foreign_debts_are_invisible() {
        let service = service();
        let debt = service.create_debt(props(UserId::new()), None).await.unwrap();
        let stranger = UserId::new();

        assert!(service.get_debt(stranger, *debt.id()).await.unwrap_err().is_not_found());
        assert!(
            service
                .delete_debt(stranger, *debt.id())
                .await
                .unwrap_err()
                .is_not_found()
        );
        let listed = service
            .list_debts(stranger, &FindOptions::default())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
