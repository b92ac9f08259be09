use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;

use fintrack_core::AggregateRoot;

use super::mapper::{AggregateMapper, Criterion, LINK_USER_ID, TableSpec};
use super::plan::{WriteOp, WritePlan};
use super::row::Row;
use super::r#trait::{
    AggregateId, AggregateRepository, FindOptions, RepoResult, RepositoryError, SortDirection,
};
use super::RowCounts;

#[derive(Debug, Clone)]
struct StoredRoot {
    row: Row,
    deleted_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Link {
    root_id: String,
    child_id: String,
    user_id: String,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    roots: HashMap<String, StoredRoot>,
    children: HashMap<String, Row>,
    /// Insertion order is the child order an aggregate is loaded with.
    links: Vec<Link>,
}

impl Tables {
    fn apply(&mut self, op: WriteOp) -> RepoResult<()> {
        match op {
            WriteOp::UpsertRoot { row, .. } => {
                let id = row.id()?.to_owned();
                match self.roots.get_mut(&id) {
                    Some(stored) => stored.row = row,
                    None => {
                        self.roots.insert(
                            id,
                            StoredRoot {
                                row,
                                deleted_at: None,
                            },
                        );
                    }
                }
            }
            WriteOp::InsertChild { table, row } => {
                let id = row.id()?.to_owned();
                if self.children.contains_key(&id) {
                    return Err(RepositoryError::Constraint(format!(
                        "duplicate primary key {id} in {table}"
                    )));
                }
                self.children.insert(id, row);
            }
            WriteOp::InsertLink {
                table,
                root_id,
                child_id,
                user_id,
                ..
            } => {
                let Some(root) = self.roots.get(&root_id) else {
                    return Err(RepositoryError::Constraint(format!(
                        "{table} references missing root {root_id}"
                    )));
                };
                if !self.children.contains_key(&child_id) {
                    return Err(RepositoryError::Constraint(format!(
                        "{table} references missing child {child_id}"
                    )));
                }
                // The denormalized owner must be the root's owner.
                if root.row.text(LINK_USER_ID)? != user_id {
                    return Err(RepositoryError::Constraint(format!(
                        "{table} owner {user_id} does not own root {root_id}"
                    )));
                }
                if self
                    .links
                    .iter()
                    .any(|l| l.root_id == root_id && l.child_id == child_id)
                {
                    return Err(RepositoryError::Constraint(format!(
                        "duplicate primary key ({root_id}, {child_id}) in {table}"
                    )));
                }
                self.links.push(Link {
                    root_id,
                    child_id,
                    user_id,
                });
            }
            WriteOp::UpdateChild { table, row } => {
                let id = row.id()?.to_owned();
                match self.children.get_mut(&id) {
                    Some(existing) => *existing = row,
                    None => {
                        return Err(RepositoryError::Constraint(format!(
                            "no row {id} to update in {table}"
                        )));
                    }
                }
            }
            WriteOp::DeleteLink {
                root_id, child_id, ..
            } => {
                self.links
                    .retain(|l| !(l.root_id == root_id && l.child_id == child_id));
            }
            WriteOp::DeleteChild { table, id } => {
                if self.links.iter().any(|l| l.child_id == id) {
                    return Err(RepositoryError::Constraint(format!(
                        "row {id} in {table} is still referenced"
                    )));
                }
                self.children.remove(&id);
            }
            WriteOp::DeleteLinkedChildren { root_id, .. } => {
                let (linked, kept): (Vec<Link>, Vec<Link>) = std::mem::take(&mut self.links)
                    .into_iter()
                    .partition(|l| l.root_id == root_id);
                self.links = kept;
                for link in linked {
                    self.children.remove(&link.child_id);
                }
            }
            WriteOp::DeleteRoot { table, id } => {
                if self.links.iter().any(|l| l.root_id == id) {
                    return Err(RepositoryError::Constraint(format!(
                        "row {id} in {table} is still referenced"
                    )));
                }
                self.roots.remove(&id);
            }
            WriteOp::SoftDeleteRoot { id, deleted_at, .. } => {
                if let Some(stored) = self.roots.get_mut(&id) {
                    stored.deleted_at.get_or_insert(deleted_at);
                }
            }
        }
        Ok(())
    }

    fn live_root(&self, id: &str) -> Option<&Row> {
        self.roots
            .get(id)
            .filter(|r| r.deleted_at.is_none())
            .map(|r| &r.row)
    }

    fn child_rows(&self, root_id: &str) -> Vec<Row> {
        self.links
            .iter()
            .filter(|l| l.root_id == root_id)
            .filter_map(|l| self.children.get(&l.child_id).cloned())
            .collect()
    }
}

/// In-memory repository for one aggregate family.
///
/// Intended for tests/dev. A plan is applied to a copy of the tables and the
/// copy replaces the live state only when every op succeeded, which gives the
/// same all-or-nothing behavior as a database transaction. Primary keys and
/// link-table foreign keys are enforced.
#[derive(Debug)]
pub struct InMemoryAggregateRepository<M> {
    mapper: M,
    tables: RwLock<Tables>,
}

impl<M: AggregateMapper + Default> Default for InMemoryAggregateRepository<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: AggregateMapper> InMemoryAggregateRepository<M> {
    pub fn new(mapper: M) -> Self {
        Self {
            mapper,
            tables: RwLock::new(Tables::default()),
        }
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Apply a plan atomically.
    pub fn execute(&self, plan: WritePlan) -> RepoResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| RepositoryError::Constraint("lock poisoned".to_string()))?;
        let mut staged = tables.clone();
        for op in plan.into_ops() {
            staged.apply(op)?;
        }
        *tables = staged;
        Ok(())
    }

    /// Stored row counts, soft-deleted roots included.
    pub fn row_counts(&self) -> RepoResult<RowCounts> {
        let tables = self.read()?;
        Ok(RowCounts {
            roots: tables.roots.len() as u64,
            children: tables.children.len() as u64,
            links: tables.links.len() as u64,
        })
    }

    fn read(&self) -> RepoResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::Constraint("lock poisoned".to_string()))
    }

    fn spec(&self) -> &TableSpec {
        self.mapper.spec()
    }

    fn matching(
        &self,
        criteria: &[Criterion],
        options: &FindOptions,
    ) -> RepoResult<Vec<M::Aggregate>> {
        if let Some(sort) = &options.sort {
            self.spec().ensure_sortable(&sort.column)?;
        }
        let tables = self.read()?;
        let mut rows: Vec<&Row> = tables
            .roots
            .values()
            .filter(|r| r.deleted_at.is_none())
            .map(|r| &r.row)
            .filter(|row| criteria.iter().all(|c| c.matches(row)))
            .collect();

        let (column, direction) = match &options.sort {
            Some(sort) => (sort.column.as_str(), sort.direction),
            None => ("created_at", SortDirection::Asc),
        };
        rows.sort_by(|a, b| {
            let ord = a.get(column).cmp(&b.get(column));
            let ord = match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            ord.then_with(|| a.get("id").cmp(&b.get("id")))
        });

        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        rows.into_iter()
            .skip(options.offset as usize)
            .take(limit)
            .map(|row| {
                let children = tables.child_rows(row.id()?);
                self.mapper.load(row, &children)
            })
            .collect()
    }
}

#[async_trait]
impl<M: AggregateMapper> AggregateRepository for InMemoryAggregateRepository<M> {
    type Aggregate = M::Aggregate;
    type Filter = M::Filter;

    #[instrument(skip(self, id), fields(table = self.spec().root_table, id = %id), err)]
    async fn find_by_id(
        &self,
        id: &AggregateId<Self::Aggregate>,
    ) -> RepoResult<Option<Self::Aggregate>> {
        let tables = self.read()?;
        let key = id.to_string();
        match tables.live_root(&key) {
            Some(row) => {
                let children = tables.child_rows(&key);
                self.mapper.load(row, &children).map(Some)
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, filter), fields(table = self.spec().root_table), err)]
    async fn find_one(&self, filter: &Self::Filter) -> RepoResult<Option<Self::Aggregate>> {
        let criteria = self.mapper.checked_criteria(filter)?;
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };
        Ok(self.matching(&criteria, &options)?.into_iter().next())
    }

    #[instrument(skip(self, filter), fields(table = self.spec().root_table), err)]
    async fn find_many(
        &self,
        filter: &Self::Filter,
        options: &FindOptions,
    ) -> RepoResult<Vec<Self::Aggregate>> {
        let criteria = self.mapper.checked_criteria(filter)?;
        self.matching(&criteria, options)
    }

    #[instrument(skip(self, aggregate), fields(table = self.spec().root_table, id = %aggregate.id()), err)]
    async fn save(&self, aggregate: &Self::Aggregate) -> RepoResult<()> {
        let plan = WritePlan::for_save(&self.mapper, aggregate)?;
        tracing::debug!(ops = plan.len(), "applying write plan");
        self.execute(plan)
    }

    #[instrument(skip(self, aggregate), fields(table = self.spec().root_table, id = %aggregate.id()), err)]
    async fn delete(&self, aggregate: &Self::Aggregate) -> RepoResult<()> {
        self.execute(WritePlan::for_delete(self.spec(), aggregate.id().to_string()))
    }

    #[instrument(skip(self, aggregate), fields(table = self.spec().root_table, id = %aggregate.id()), err)]
    async fn soft_delete(&self, aggregate: &Self::Aggregate) -> RepoResult<()> {
        self.execute(WritePlan::for_soft_delete(
            self.spec(),
            aggregate.id().to_string(),
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fintrack_budgeting::{BudgetAggregate, BudgetProps, NewSpending};
    use fintrack_core::{Currency, CurrencyValue, Entity, UserId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::mappers::{BudgetFilter, BudgetMapper};

    type Repo = InMemoryAggregateRepository<BudgetMapper>;

    fn usd(amount: Decimal) -> CurrencyValue {
        CurrencyValue::new(amount, Currency::Usd)
    }

    fn budget(user_id: UserId, name: &str) -> BudgetAggregate {
        BudgetAggregate::new_budget(BudgetProps {
            user_id,
            name: name.to_string(),
            amount: usd(dec!(300)),
            category: None,
            start_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            end_date: None,
        })
    }

    fn spending(amount: Decimal) -> NewSpending {
        NewSpending {
            amount: usd(amount),
            name: "Coffee".to_string(),
            description: None,
            category: None,
            occurred_at: Utc::now(),
            recurring: false,
        }
    }

    #[tokio::test]
    async fn loads_children_in_insertion_order() {
        let repo = Repo::default();
        let mut aggregate = budget(UserId::new(), "Cafe");
        let first = aggregate.record_spending(spending(dec!(3))).unwrap();
        let second = aggregate.record_spending(spending(dec!(4))).unwrap();
        repo.save(&aggregate).await.unwrap();

        let loaded = repo.find_by_id(aggregate.id()).await.unwrap().unwrap();
        let ids: Vec<_> = loaded.spendings().items().map(|t| *t.id()).collect();
        assert_eq!(ids, vec![first, second]);
        assert!(!loaded.spendings().has_changes());
    }

    #[tokio::test]
    async fn failed_plan_leaves_tables_untouched() {
        let repo = Repo::default();
        let user_id = UserId::new();
        let mut existing = budget(user_id, "Existing");
        existing.record_spending(spending(dec!(10))).unwrap();
        repo.save(&existing).await.unwrap();
        let before = repo.row_counts().unwrap();

        let duplicate = existing.spendings().items().next().unwrap().clone();
        let mut other = budget(user_id, "Other");
        other.record_spending(spending(dec!(1))).unwrap();
        other.spendings_mut().add(duplicate).unwrap();

        let err = repo.save(&other).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Constraint(_)));
        assert_eq!(repo.row_counts().unwrap(), before);
        assert!(repo.find_by_id(other.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn link_owner_must_match_root_owner() {
        let repo = Repo::default();
        let aggregate = budget(UserId::new(), "Mine");
        repo.save(&aggregate).await.unwrap();

        let mut child = budget(UserId::new(), "tmp");
        child.record_spending(spending(dec!(2))).unwrap();
        let tx = child.spendings().items().next().unwrap();

        let plan: WritePlan = [
            WriteOp::InsertChild {
                table: "transactions",
                row: repo.mapper().child_to_row(tx),
            },
            WriteOp::InsertLink {
                table: "budget_transactions",
                root_table: "budgets",
                root_id: aggregate.id().to_string(),
                child_id: tx.id().to_string(),
                user_id: UserId::new().to_string(),
            },
        ]
        .into_iter()
        .collect();

        let err = repo.execute(plan).unwrap_err();
        assert!(err.to_string().contains("does not own"));
        assert_eq!(repo.row_counts().unwrap().children, 0);
    }

    #[tokio::test]
    async fn soft_delete_hides_but_keeps_rows() {
        let repo = Repo::default();
        let user_id = UserId::new();
        let mut aggregate = budget(user_id, "Gone");
        aggregate.record_spending(spending(dec!(7))).unwrap();
        repo.save(&aggregate).await.unwrap();

        repo.soft_delete(&aggregate).await.unwrap();

        assert!(repo.find_by_id(aggregate.id()).await.unwrap().is_none());
        let found = repo
            .find_one(&BudgetFilter::for_user(user_id))
            .await
            .unwrap();
        assert!(found.is_none());
        let counts = repo.row_counts().unwrap();
        assert_eq!((counts.roots, counts.children, counts.links), (1, 1, 1));
    }
}
