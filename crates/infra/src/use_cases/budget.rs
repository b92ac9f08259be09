use tracing::instrument;

use fintrack_budgeting::{BudgetAggregate, BudgetId, BudgetProps, BudgetUpdate, NewSpending};
use fintrack_core::{AggregateRoot, TransactionId, TransactionUpdate, UserId};

use super::{UseCaseResult, load_owned, persist};
use crate::mappers::BudgetFilter;
use crate::repository::{AggregateRepository, FindOptions};

/// Budget use-cases over any budget repository.
#[derive(Debug, Clone)]
pub struct BudgetService<R> {
    repo: R,
}

impl<R> BudgetService<R>
where
    R: AggregateRepository<Aggregate = BudgetAggregate, Filter = BudgetFilter>,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    #[instrument(skip(self, props), fields(user_id = %props.user_id), err)]
    pub async fn create_budget(&self, props: BudgetProps) -> UseCaseResult<BudgetAggregate> {
        let budget = persist(&self.repo, BudgetAggregate::new_budget(props)).await?;
        tracing::info!(budget_id = %budget.id(), "budget created");
        Ok(budget)
    }

    #[instrument(skip(self), err)]
    pub async fn get_budget(
        &self,
        user_id: UserId,
        budget_id: BudgetId,
    ) -> UseCaseResult<BudgetAggregate> {
        load_owned(&self.repo, user_id, &budget_id).await
    }

    #[instrument(skip(self, options), err)]
    pub async fn list_budgets(
        &self,
        user_id: UserId,
        options: &FindOptions,
    ) -> UseCaseResult<Vec<BudgetAggregate>> {
        Ok(self
            .repo
            .find_many(&BudgetFilter::for_user(user_id), options)
            .await?)
    }

    #[instrument(skip(self, changes), err)]
    pub async fn update_budget(
        &self,
        user_id: UserId,
        budget_id: BudgetId,
        changes: BudgetUpdate,
    ) -> UseCaseResult<BudgetAggregate> {
        let mut budget = load_owned(&self.repo, user_id, &budget_id).await?;
        budget.update_details(changes)?;
        persist(&self.repo, budget).await
    }

    #[instrument(skip(self, input), fields(amount = %input.amount), err)]
    pub async fn record_spending(
        &self,
        user_id: UserId,
        budget_id: BudgetId,
        input: NewSpending,
    ) -> UseCaseResult<(BudgetAggregate, TransactionId)> {
        let mut budget = load_owned(&self.repo, user_id, &budget_id).await?;
        let spending_id = budget.record_spending(input)?;
        let budget = persist(&self.repo, budget).await?;
        Ok((budget, spending_id))
    }

    #[instrument(skip(self, changes), err)]
    pub async fn update_spending(
        &self,
        user_id: UserId,
        budget_id: BudgetId,
        spending_id: TransactionId,
        changes: TransactionUpdate,
    ) -> UseCaseResult<BudgetAggregate> {
        let mut budget = load_owned(&self.repo, user_id, &budget_id).await?;
        budget.update_spending(spending_id, changes)?;
        persist(&self.repo, budget).await
    }

    #[instrument(skip(self), err)]
    pub async fn remove_spending(
        &self,
        user_id: UserId,
        budget_id: BudgetId,
        spending_id: TransactionId,
    ) -> UseCaseResult<BudgetAggregate> {
        let mut budget = load_owned(&self.repo, user_id, &budget_id).await?;
        budget.remove_spending(spending_id)?;
        persist(&self.repo, budget).await
    }

    /// Soft delete; the budget disappears from reads but its rows stay.
    #[instrument(skip(self), err)]
    pub async fn delete_budget(&self, user_id: UserId, budget_id: BudgetId) -> UseCaseResult<()> {
        let budget = load_owned(&self.repo, user_id, &budget_id).await?;
        self.repo.soft_delete(&budget).await?;
        tracing::info!("budget deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use fintrack_core::{Currency, CurrencyValue, DomainError};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::mappers::BudgetMapper;
    use crate::repository::InMemoryAggregateRepository;
    use crate::use_cases::UseCaseError;

    type Service = BudgetService<InMemoryAggregateRepository<BudgetMapper>>;

    fn service() -> Service {
        BudgetService::new(InMemoryAggregateRepository::default())
    }

    fn usd(amount: Decimal) -> CurrencyValue {
        CurrencyValue::new(amount, Currency::Usd)
    }

    fn props(user_id: UserId, name: &str) -> BudgetProps {
        BudgetProps {
            user_id,
            name: name.to_string(),
            amount: usd(dec!(400)),
            category: Some("food".to_string()),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 31),
        }
    }

    fn spending(amount: Decimal) -> NewSpending {
        NewSpending {
            amount: usd(amount),
            name: "Market".to_string(),
            description: None,
            category: None,
            occurred_at: Utc::now(),
            recurring: false,
        }
    }

    #[tokio::test]
    async fn spending_lifecycle_is_persisted() {
        let service = service();
        let user_id = UserId::new();
        let budget = service.create_budget(props(user_id, "Groceries")).await.unwrap();
        let budget_id = *budget.id();

        let (_, first) = service
            .record_spending(user_id, budget_id, spending(dec!(120)))
            .await
            .unwrap();
        service
            .record_spending(user_id, budget_id, spending(dec!(80)))
            .await
            .unwrap();
        service
            .update_spending(
                user_id,
                budget_id,
                first,
                TransactionUpdate {
                    amount: Some(usd(dec!(100))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reloaded = service.get_budget(user_id, budget_id).await.unwrap();
        assert_eq!(reloaded.total_spent().unwrap(), usd(dec!(180)));
        assert_eq!(reloaded.remaining().unwrap(), usd(dec!(220)));
        assert!(!reloaded.spendings().has_changes());

        let after_remove = service
            .remove_spending(user_id, budget_id, first)
            .await
            .unwrap();
        assert_eq!(after_remove.total_spent().unwrap(), usd(dec!(80)));
        let counts = service.repository().row_counts().unwrap();
        assert_eq!((counts.children, counts.links), (1, 1));
    }

    #[tokio::test]
    async fn other_users_see_not_found() {
        let service = service();
        let owner = UserId::new();
        let budget = service.create_budget(props(owner, "Fun")).await.unwrap();

        let err = service
            .record_spending(UserId::new(), *budget.id(), spending(dec!(5)))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_json()["error"], "not_found");
    }

    #[tokio::test]
    async fn invalid_budgets_are_not_saved() {
        let service = service();
        let err = service
            .create_budget(props(UserId::new(), "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::Domain(DomainError::Validation(_))));
        assert_eq!(service.repository().row_counts().unwrap().roots, 0);
    }

    #[tokio::test]
    async fn list_is_scoped_to_user_and_skips_deleted() {
        let service = service();
        let user_id = UserId::new();
        let a = service.create_budget(props(user_id, "A")).await.unwrap();
        service.create_budget(props(user_id, "B")).await.unwrap();
        service.create_budget(props(UserId::new(), "C")).await.unwrap();

        service.delete_budget(user_id, *a.id()).await.unwrap();

        let listed = service
            .list_budgets(user_id, &FindOptions::default())
            .await
            .unwrap();
        let names: Vec<_> = listed.iter().map(|b| b.budget().props().name.as_str()).collect();
        assert_eq!(names, vec!["B"]);
        assert!(service.get_budget(user_id, *a.id()).await.unwrap_err().is_not_found());
    }
}
