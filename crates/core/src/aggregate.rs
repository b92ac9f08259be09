//! Aggregate root trait for state-based aggregates with tracked children.

use chrono::{DateTime, Utc};

use crate::entity::{Entity, Validate};
use crate::id::UserId;
use crate::watch_list::WatchList;

/// Aggregate root: one root entity plus one change-tracked child collection,
/// persisted and validated as one consistency unit.
///
/// Identity and timestamps are those of the root entity. Aggregates must not
/// perform IO; repositories read the child [`WatchList`] to work out what to write.
pub trait AggregateRoot: Validate {
    type Root: Entity;
    type Child: Entity;

    fn root(&self) -> &Self::Root;

    fn children(&self) -> &WatchList<Self::Child>;

    /// Owner of the aggregate.
    fn user_id(&self) -> UserId;

    /// Rebuild an aggregate from stored state; the child list starts unmarked.
    fn reconstitute(root: Self::Root, children: Vec<Self::Child>) -> Self
    where
        Self: Sized;

    /// Clear change tracking once the repository has committed a save.
    fn mark_persisted(&mut self);

    fn id(&self) -> &<Self::Root as Entity>::Id {
        self.root().id()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.root().created_at()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.root().updated_at()
    }

    fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id() == user_id
    }
}
