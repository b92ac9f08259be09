//! Change-tracking collection of child entities.
//!
//! A [`WatchList`] is what lets an aggregate persist only its delta: it keeps the
//! full backing list of children plus the ids that were added, updated or removed
//! since the list was built. Repositories consult it on save; a freshly loaded
//! aggregate always starts with an unmarked list.
//!
//! Per-id state machine:
//!
//! ```text
//! Unmarked ──add──▶ Added
//! Unmarked/Added ──update──▶ Updated
//! Unmarked/Added/Updated ──remove──▶ Removed   (terminal)
//! ```

use std::collections::HashSet;

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};

/// Most advanced tracking state recorded for an id.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChangeState {
    Unmarked,
    Added,
    Updated,
    Removed,
}

/// Ordered collection of entities that records additions, updates and removals.
#[derive(Debug, Clone)]
pub struct WatchList<T: Entity> {
    items: Vec<T>,
    added: HashSet<T::Id>,
    updated: HashSet<T::Id>,
    removed: HashSet<T::Id>,
}

/// Net writes implied by a [`WatchList`], in backing-list order.
///
/// - added then removed: nothing (never reached storage)
/// - added then updated: one insert carrying the latest state
/// - updated then removed: one delete
#[derive(Debug)]
pub struct PendingChanges<'a, T> {
    pub inserts: Vec<&'a T>,
    pub updates: Vec<&'a T>,
    pub deletes: Vec<&'a T>,
}

impl<T> PendingChanges<'_, T> {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

impl<T: Entity> Default for WatchList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> WatchList<T> {
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    /// Build an unmarked list, e.g. from rows loaded out of storage.
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items,
            added: HashSet::new(),
            updated: HashSet::new(),
            removed: HashSet::new(),
        }
    }

    /// Live items (removed ones excluded), in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &T> + '_ {
        self.items
            .iter()
            .filter(|item| !self.removed.contains(item.id()))
    }

    pub fn len(&self) -> usize {
        self.items().count()
    }

    pub fn is_empty(&self) -> bool {
        self.items().next().is_none()
    }

    /// Live item with the given id.
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.get(id).is_some()
    }

    /// Append a new item and mark it as added.
    ///
    /// Fails with `Conflict` if the id is already present in the backing list,
    /// removed or not.
    pub fn add(&mut self, item: T) -> DomainResult<()> {
        if self.position(item.id()).is_some() {
            return Err(DomainError::conflict(format!(
                "item {:?} is already tracked",
                item.id()
            )));
        }
        self.added.insert(item.id().clone());
        self.items.push(item);
        Ok(())
    }

    /// Replace the item with the same id and mark it as updated.
    ///
    /// Returns `false` (and changes nothing) when the id is unknown or already removed.
    pub fn update(&mut self, item: T) -> bool {
        if self.removed.contains(item.id()) {
            return false;
        }
        match self.position(item.id()) {
            Some(idx) => {
                self.updated.insert(item.id().clone());
                self.items[idx] = item;
                true
            }
            None => false,
        }
    }

    /// Mark the item with this id as removed. It stays in the backing list so that
    /// [`WatchList::removed_items`] can still report it.
    ///
    /// Returns `false` when the id is unknown or already removed.
    pub fn remove(&mut self, id: &T::Id) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        self.removed.insert(id.clone())
    }

    pub fn added_items(&self) -> Vec<&T> {
        self.marked(&self.added)
    }

    pub fn updated_items(&self) -> Vec<&T> {
        self.marked(&self.updated)
    }

    pub fn removed_items(&self) -> Vec<&T> {
        self.marked(&self.removed)
    }

    pub fn state(&self, id: &T::Id) -> Option<ChangeState> {
        self.position(id)?;
        let state = if self.removed.contains(id) {
            ChangeState::Removed
        } else if self.updated.contains(id) {
            ChangeState::Updated
        } else if self.added.contains(id) {
            ChangeState::Added
        } else {
            ChangeState::Unmarked
        };
        Some(state)
    }

    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }

    /// Collapse the recorded sets into the writes a repository must issue.
    pub fn pending_changes(&self) -> PendingChanges<'_, T> {
        let mut changes = PendingChanges {
            inserts: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        };
        for item in &self.items {
            let id = item.id();
            let added = self.added.contains(id);
            let removed = self.removed.contains(id);
            match (added, removed) {
                (true, true) => {}
                (true, false) => changes.inserts.push(item),
                (false, true) => changes.deletes.push(item),
                (false, false) if self.updated.contains(id) => changes.updates.push(item),
                (false, false) => {}
            }
        }
        changes
    }

    /// Forget the tracking sets after a successful save; removed items are dropped.
    pub fn commit(&mut self) {
        let removed = std::mem::take(&mut self.removed);
        self.items.retain(|item| !removed.contains(item.id()));
        self.added.clear();
        self.updated.clear();
    }

    fn position(&self, id: &T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    fn marked(&self, set: &HashSet<T::Id>) -> Vec<&T> {
        self.items
            .iter()
            .filter(|item| set.contains(item.id()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityMeta;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct Item {
        meta: EntityMeta<u32>,
        label: String,
    }

    crate::impl_entity!(Item, u32);

    fn item(id: u32, label: &str) -> Item {
        Item {
            meta: EntityMeta::new(id),
            label: label.to_string(),
        }
    }

    fn ids<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<u32> {
        items.into_iter().map(|i| *i.id()).collect()
    }

    fn loaded() -> WatchList<Item> {
        WatchList::from_items(vec![item(1, "a"), item(2, "b"), item(3, "c")])
    }

    #[test]
    fn loaded_list_has_no_changes() {
        let list = loaded();
        assert_eq!(ids(list.items()), vec![1, 2, 3]);
        assert!(!list.has_changes());
        assert!(list.pending_changes().is_empty());
        assert_eq!(list.state(&2), Some(ChangeState::Unmarked));
    }

    #[test]
    fn add_appends_and_marks_added() {
        let mut list = loaded();
        list.add(item(4, "d")).unwrap();
        assert_eq!(ids(list.items()), vec![1, 2, 3, 4]);
        assert_eq!(ids(list.added_items()), vec![4]);
        assert_eq!(list.state(&4), Some(ChangeState::Added));
    }

    #[test]
    fn duplicate_add_is_a_conflict() {
        let mut list = loaded();
        let err = list.add(item(2, "again")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn update_replaces_in_place() {
        let mut list = loaded();
        assert!(list.update(item(2, "B")));
        assert_eq!(ids(list.items()), vec![1, 2, 3]);
        assert_eq!(list.get(&2).unwrap().label, "B");
        assert_eq!(ids(list.updated_items()), vec![2]);
    }

    #[test]
    fn update_of_unknown_id_is_a_noop() {
        let mut list = loaded();
        assert!(!list.update(item(9, "x")));
        assert!(!list.has_changes());
    }

    #[test]
    fn remove_hides_item_but_reports_it() {
        let mut list = loaded();
        assert!(list.remove(&1));
        assert_eq!(ids(list.items()), vec![2, 3]);
        assert_eq!(ids(list.removed_items()), vec![1]);
        assert!(list.get(&1).is_none());
        assert!(!list.remove(&1));
        assert!(!list.remove(&42));
    }

    #[test]
    fn removed_is_terminal() {
        let mut list = loaded();
        list.remove(&3);
        assert!(!list.update(item(3, "revived")));
        assert_eq!(list.state(&3), Some(ChangeState::Removed));
        assert!(list.updated_items().is_empty());
    }

    #[test]
    fn added_then_removed_nets_to_nothing() {
        let mut list = loaded();
        list.add(item(4, "d")).unwrap();
        list.remove(&4);
        assert_eq!(ids(list.added_items()), vec![4]);
        assert_eq!(ids(list.removed_items()), vec![4]);
        assert!(list.pending_changes().is_empty());
    }

    #[test]
    fn added_then_updated_is_a_single_insert_of_latest_state() {
        let mut list = loaded();
        list.add(item(4, "d")).unwrap();
        list.update(item(4, "D"));
        let pending = list.pending_changes();
        assert_eq!(ids(pending.inserts.iter().copied()), vec![4]);
        assert_eq!(pending.inserts[0].label, "D");
        assert!(pending.updates.is_empty());
    }

    #[test]
    fn updated_then_removed_is_a_single_delete() {
        let mut list = loaded();
        list.update(item(2, "B"));
        list.remove(&2);
        let pending = list.pending_changes();
        assert!(pending.updates.is_empty());
        assert_eq!(ids(pending.deletes.iter().copied()), vec![2]);
    }

    #[test]
    fn commit_clears_tracking_and_drops_removed() {
        let mut list = loaded();
        list.add(item(4, "d")).unwrap();
        list.remove(&1);
        list.commit();
        assert!(!list.has_changes());
        assert_eq!(ids(list.items()), vec![2, 3, 4]);
        assert_eq!(list.state(&1), None);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u32),
        Update(u32),
        Remove(u32),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..12).prop_map(Op::Add),
            (0u32..12).prop_map(Op::Update),
            (0u32..12).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any op sequence, `items` is the backing list minus removed ids
        /// in original order, and the marked views match what was recorded.
        #[test]
        fn tracking_matches_a_reference_model(ops in prop::collection::vec(arb_op(), 0..40)) {
            let mut list: WatchList<Item> = WatchList::from_items(vec![item(0, "seed"), item(1, "seed")]);

            let mut backing: Vec<u32> = vec![0, 1];
            let mut added: Vec<u32> = Vec::new();
            let mut updated: Vec<u32> = Vec::new();
            let mut removed: Vec<u32> = Vec::new();

            for op in ops {
                match op {
                    Op::Add(id) => {
                        let ok = list.add(item(id, "x")).is_ok();
                        prop_assert_eq!(ok, !backing.contains(&id));
                        if ok {
                            backing.push(id);
                            added.push(id);
                        }
                    }
                    Op::Update(id) => {
                        let ok = list.update(item(id, "u"));
                        let expected = backing.contains(&id) && !removed.contains(&id);
                        prop_assert_eq!(ok, expected);
                        if ok && !updated.contains(&id) {
                            updated.push(id);
                        }
                    }
                    Op::Remove(id) => {
                        let ok = list.remove(&id);
                        let expected = backing.contains(&id) && !removed.contains(&id);
                        prop_assert_eq!(ok, expected);
                        if ok {
                            removed.push(id);
                        }
                    }
                }
            }

            let in_order = |set: &Vec<u32>| -> Vec<u32> {
                backing.iter().copied().filter(|id| set.contains(id)).collect()
            };
            let live: Vec<u32> = backing.iter().copied().filter(|id| !removed.contains(id)).collect();

            prop_assert_eq!(ids(list.items()), live);
            prop_assert_eq!(ids(list.added_items()), in_order(&added));
            prop_assert_eq!(ids(list.updated_items()), in_order(&updated));
            prop_assert_eq!(ids(list.removed_items()), in_order(&removed));
        }
    }
}
