use tracing::instrument;

use fintrack_core::{AggregateRoot, CurrencyValue, TransactionId, UserId};
use fintrack_goals::{GoalAggregate, GoalId, GoalProps, GoalUpdate};

use super::{UseCaseResult, load_owned, persist};
use crate::mappers::GoalFilter;
use crate::repository::{AggregateRepository, FindOptions};

/// Savings-goal use-cases.
#[derive(Debug, Clone)]
pub struct GoalService<R> {
    repo: R,
}

impl<R> GoalService<R>
where
    R: AggregateRepository<Aggregate = GoalAggregate, Filter = GoalFilter>,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    #[instrument(skip(self, props), fields(user_id = %props.user_id), err)]
    pub async fn create_goal(&self, props: GoalProps) -> UseCaseResult<GoalAggregate> {
        let goal = persist(&self.repo, GoalAggregate::new_goal(props)).await?;
        tracing::info!(goal_id = %goal.id(), "goal created");
        Ok(goal)
    }

    #[instrument(skip(self), err)]
    pub async fn get_goal(&self, user_id: UserId, goal_id: GoalId) -> UseCaseResult<GoalAggregate> {
        load_owned(&self.repo, user_id, &goal_id).await
    }

    #[instrument(skip(self, options), err)]
    pub async fn list_goals(
        &self,
        user_id: UserId,
        options: &FindOptions,
    ) -> UseCaseResult<Vec<GoalAggregate>> {
        Ok(self
            .repo
            .find_many(&GoalFilter::for_user(user_id), options)
            .await?)
    }

    #[instrument(skip(self, name, description), fields(amount = %amount), err)]
    pub async fn contribute(
        &self,
        user_id: UserId,
        goal_id: GoalId,
        amount: CurrencyValue,
        name: Option<String>,
        description: Option<String>,
        recurring: bool,
    ) -> UseCaseResult<(GoalAggregate, TransactionId)> {
        let mut goal = load_owned(&self.repo, user_id, &goal_id).await?;
        let tx_id = goal.contribute(amount, name, description, recurring)?;
        let goal = persist(&self.repo, goal).await?;
        if goal.is_completed()? {
            tracing::info!("goal completed");
        }
        Ok((goal, tx_id))
    }

    #[instrument(skip(self, name, description), fields(amount = %amount), err)]
    pub async fn withdraw(
        &self,
        user_id: UserId,
        goal_id: GoalId,
        amount: CurrencyValue,
        name: Option<String>,
        description: Option<String>,
    ) -> UseCaseResult<(GoalAggregate, TransactionId)> {
        let mut goal = load_owned(&self.repo, user_id, &goal_id).await?;
        let tx_id = goal.withdraw(amount, name, description)?;
        let goal = persist(&self.repo, goal).await?;
        Ok((goal, tx_id))
    }

    #[instrument(skip(self, changes), err)]
    pub async fn update_goal_details(
        &self,
        user_id: UserId,
        goal_id: GoalId,
        changes: GoalUpdate,
    ) -> UseCaseResult<GoalAggregate> {
        let mut goal = load_owned(&self.repo, user_id, &goal_id).await?;
        goal.update_goal_details(changes)?;
        persist(&self.repo, goal).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete_goal(&self, user_id: UserId, goal_id: GoalId) -> UseCaseResult<()> {
        let goal = load_owned(&self.repo, user_id, &goal_id).await?;
        self.repo.soft_delete(&goal).await?;
        Ok(())
    }
}
