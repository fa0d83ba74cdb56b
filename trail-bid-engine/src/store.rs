use core::fmt::{self, Debug, Display};
use core::hash::Hash;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::key::Key;

/// Something that can live in a [`Store`]: uniquely identified by an
/// externally assigned id, with a registration sequence and a display name.
pub trait Entity {
    type Id: Clone + Debug + Display + Eq + Hash + Ord;

    /// Used in log lines and error messages.
    const KIND: &'static str;

    fn id(&self) -> &Self::Id;
    fn sequence(&self) -> u32;
    fn name(&self) -> &str;
}

/// Result of [`Store::add_unique`].
pub enum InsertOutcome<T> {
    Inserted(Key<T>),
    AlreadyPresent(Key<T>),
}

// same reason as for `Key`: derives would put bounds on `T`
impl<T> Clone for InsertOutcome<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InsertOutcome<T> {}

impl<T> PartialEq for InsertOutcome<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Inserted(a), Self::Inserted(b))
            | (Self::AlreadyPresent(a), Self::AlreadyPresent(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> Eq for InsertOutcome<T> {}

impl<T> fmt::Debug for InsertOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inserted(key) => f.debug_tuple("Inserted").field(key).finish(),
            Self::AlreadyPresent(key) => f.debug_tuple("AlreadyPresent").field(key).finish(),
        }
    }
}

impl<T> InsertOutcome<T> {
    #[must_use]
    pub const fn key(self) -> Key<T> {
        match self {
            Self::Inserted(key) | Self::AlreadyPresent(key) => key,
        }
    }

    #[must_use]
    pub const fn was_inserted(self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Insertion-ordered entities with O(1) lookup by id.
#[derive(Debug, Clone)]
pub struct Store<T: Entity> {
    entities: Vec<T>,
    lookup: HashMap<T::Id, Key<T>>,
}

impl<T: Entity> Default for Store<T> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            lookup: HashMap::new(),
        }
    }
}

impl<T: Entity> Store<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entity`, rejecting an id that is already present.
    pub fn add(&mut self, entity: T) -> Result<Key<T>, StoreError> {
        if self.lookup.contains_key(entity.id()) {
            return Err(StoreError::DuplicateId {
                kind: T::KIND,
                id: entity.id().to_string(),
            });
        }
        let key = Key::new(self.entities.len());
        self.lookup.insert(entity.id().clone(), key);
        self.entities.push(entity);
        Ok(key)
    }

    /// Inserts `entity` unless its id is already present, in which case the
    /// stored entity is kept and `entity` is dropped.
    pub fn add_unique(&mut self, entity: T) -> InsertOutcome<T> {
        match self.lookup.get(entity.id()) {
            Some(&key) => InsertOutcome::AlreadyPresent(key),
            None => {
                let key = Key::new(self.entities.len());
                self.lookup.insert(entity.id().clone(), key);
                self.entities.push(entity);
                InsertOutcome::Inserted(key)
            }
        }
    }

    #[must_use]
    pub fn key_of(&self, id: &T::Id) -> Option<Key<T>> {
        self.lookup.get(id).copied()
    }

    #[must_use]
    pub fn get_by_id(&self, id: &T::Id) -> Option<&T> {
        self.key_of(id).map(|key| &self.entities[key.index()])
    }

    #[must_use]
    pub fn get(&self, key: Key<T>) -> &T {
        &self.entities[key.index()]
    }

    pub(crate) fn get_mut(&mut self, key: Key<T>) -> &mut T {
        &mut self.entities[key.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key<T>, &T)> + '_ {
        self.entities
            .iter()
            .enumerate()
            .map(|(index, entity)| (Key::new(index), entity))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.entities.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = Key<T>> + '_ {
        (0..self.entities.len()).map(Key::new)
    }

    #[must_use]
    pub fn sorted_by_id(&self) -> Vec<Key<T>> {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_by(|&a, &b| self.get(a).id().cmp(self.get(b).id()));
        keys
    }

    /// Keys ordered by sequence, ties broken by id.
    #[must_use]
    pub fn sorted_by_sequence(&self) -> Vec<Key<T>> {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_by(|&a, &b| {
            let (a, b) = (self.get(a), self.get(b));
            (a.sequence(), a.id()).cmp(&(b.sequence(), b.id()))
        });
        keys
    }

    /// Keys ordered by name, ties broken by id.
    #[must_use]
    pub fn sorted_by_name(&self) -> Vec<Key<T>> {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_by(|&a, &b| {
            let (a, b) = (self.get(a), self.get(b));
            (a.name(), a.id()).cmp(&(b.name(), b.id()))
        });
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, InsertOutcome, Store};
    use crate::error::StoreError;
    use crate::model::{Participant, ParticipantId};

    fn hasher(id: u64, sequence: u32, name: &str) -> Participant {
        Participant::new(ParticipantId(id), sequence, name)
    }

    #[test]
    fn add_rejects_duplicate_id_and_keeps_first() {
        let mut store = Store::new();
        store.add(hasher(1, 1, "Mudflap")).unwrap();
        let err = store.add(hasher(1, 2, "Imposter")).unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateId {
                kind: "hasher",
                id: "1".to_owned()
            }
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_id(&ParticipantId(1)).unwrap().name(), "Mudflap");
    }

    #[test]
    fn add_unique_reports_outcome() {
        let mut store = Store::new();
        let first = store.add_unique(hasher(5, 1, "A"));
        let second = store.add_unique(hasher(5, 1, "B"));
        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert_eq!(second, InsertOutcome::AlreadyPresent(first.key()));
        assert!(!second.was_inserted());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(second.key()).name(), "A");
    }

    #[test]
    fn outcomes_copy_and_compare_for_any_entity() {
        let mut store = Store::new();
        let outcome = store.add_unique(hasher(9, 1, "Nine"));
        let copy = outcome;
        assert!(outcome.was_inserted());
        assert_eq!(copy, outcome);
        assert_ne!(copy, InsertOutcome::AlreadyPresent(outcome.key()));
        assert_eq!(format!("{outcome:?}"), "Inserted(Key<Participant>(0))");
    }

    #[test]
    fn missing_id_is_none() {
        let store: Store<Participant> = Store::new();
        assert!(store.get_by_id(&ParticipantId(42)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn sorted_listings() {
        let mut store = Store::new();
        store.add(hasher(3, 2, "Charlie")).unwrap();
        store.add(hasher(1, 3, "alpha")).unwrap();
        store.add(hasher(2, 2, "Bravo")).unwrap();

        let ids = |keys: Vec<_>| -> Vec<u64> {
            keys.into_iter().map(|key| store.get(key).id().0).collect()
        };
        assert_eq!(ids(store.sorted_by_id()), [1, 2, 3]);
        assert_eq!(ids(store.sorted_by_sequence()), [2, 3, 1]);
        assert_eq!(ids(store.sorted_by_name()), [2, 3, 1]);
    }
}
