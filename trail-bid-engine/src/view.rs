use itertools::{Itertools, MinMaxResult};

use crate::event::Event;
use crate::key::Key;
use crate::model::{Bid, Participant, TimeSlot, Trail};

/// Read-only aggregate view over a set of bids.
#[derive(Debug, Clone)]
pub struct BidView<'a> {
    event: &'a Event,
    keys: Vec<Key<Bid>>,
}

impl<'a> BidView<'a> {
    pub(crate) const fn new(event: &'a Event, keys: Vec<Key<Bid>>) -> Self {
        Self { event, keys }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sum of the bid values.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.iter().map(|(_, bid)| bid.value()).sum()
    }

    /// Lowest and highest bid value, `None` for an empty view.
    #[must_use]
    pub fn bookend_values(&self) -> Option<(u64, u64)> {
        match self.iter().map(|(_, bid)| bid.value()).minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(value) => Some((value, value)),
            MinMaxResult::MinMax(lowest, highest) => Some((lowest, highest)),
        }
    }

    #[must_use]
    pub fn participants(&self) -> Vec<Key<Participant>> {
        self.iter().map(|(_, bid)| bid.participant()).sorted().dedup().collect()
    }

    #[must_use]
    pub fn trails(&self) -> Vec<Key<Trail>> {
        self.iter().map(|(_, bid)| bid.trail()).sorted().dedup().collect()
    }

    #[must_use]
    pub fn time_slots(&self) -> Vec<Key<TimeSlot>> {
        self.keys
            .iter()
            .filter_map(|&key| self.event.time_slot_of(key))
            .sorted()
            .dedup()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key<Bid>, &'a Bid)> + '_ {
        let event = self.event;
        self.keys.iter().map(move |&key| (key, event.bid(key)))
    }

    #[must_use]
    pub fn keys(&self) -> &[Key<Bid>] {
        &self.keys
    }

    #[must_use]
    pub fn into_keys(self) -> Vec<Key<Bid>> {
        self.keys
    }
}
