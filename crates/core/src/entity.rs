//! Entity trait: identity + continuity across state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainResult;

/// Entity marker + minimal interface.
///
/// Two entities are the same entity iff their ids match, whatever their fields say.
pub trait Entity: Send + Sync {
    /// Strongly-typed entity identifier. Its `Display` form is the storage key.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;
}

/// Invariant check invoked by callers after construction or mutation, before persisting.
pub trait Validate {
    fn validate(&self) -> DomainResult<()>;
}

/// Identity and lifecycle timestamps shared by every entity.
///
/// `id` and `created_at` never change after construction; `updated_at` only moves
/// forward through [`EntityMeta::touch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta<Id> {
    id: Id,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<Id> EntityMeta<Id> {
    /// Metadata for a brand new entity.
    pub fn new(id: Id) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Metadata for an entity reconstituted from storage.
    pub fn restore(id: Id, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Bump `updated_at`; never moves it backwards.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Implement [`Entity`] and id-based equality for a struct holding `meta: EntityMeta<Id>`.
#[macro_export]
macro_rules! impl_entity {
    ($t:ty, $id:ty) => {
        impl $crate::Entity for $t {
            type Id = $id;

            fn id(&self) -> &Self::Id {
                self.meta.id()
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.meta.created_at()
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.meta.updated_at()
            }
        }

        impl PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                self.meta.id() == other.meta.id()
            }
        }

        impl Eq for $t {}
    };
}
