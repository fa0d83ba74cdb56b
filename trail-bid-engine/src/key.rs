//! Phantom-typed arena keys.
//!
//! Entities of an [`Event`](crate::Event) reference each other through
//! `Key<T>` instead of shared pointers, so a `Key<Trail>` can never be used
//! to look up a participant.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

pub struct Key<T> {
    index: usize,
    marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    #[must_use]
    pub(crate) const fn new(index: usize) -> Self {
        Self {
            index,
            marker: PhantomData,
        }
    }

    /// Position of the entity in its store, in insertion order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

// derives would put bounds on `T`
impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Key<T> {}

impl<T> PartialOrd for Key<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Key<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = core::any::type_name::<T>();
        let name = name.rsplit("::").next().unwrap_or(name);
        write!(f, "Key<{name}>({})", self.index)
    }
}
