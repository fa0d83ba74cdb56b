//! The order in which competing bids are considered.

use core::cmp::Reverse;

use crate::event::Event;
use crate::key::Key;
use crate::model::{Bid, TimeSlot, TrailId};
use crate::rank::FairnessRank;
use crate::store::Entity;

/// Sort key of one bid, compared field by field in declaration order:
///
/// 1. bid value, highest first
/// 2. wins the hasher already has, fewest first
/// 3. bids the hasher submitted, fewest first
/// 4. the hasher's fairness rank
/// 5. bids the trail received, fewest first
/// 6. trail id
///
/// Counts are taken when the key is built.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EquitableKey<'a> {
    value: Reverse<u64>,
    successful_bid_count: usize,
    bid_count: usize,
    rank: FairnessRank,
    trail_bid_count: usize,
    trail: &'a TrailId,
}

impl Event {
    #[must_use]
    pub fn equitable_key(&self, bid: Key<Bid>) -> EquitableKey<'_> {
        let bid = self.bid(bid);
        let hasher = self.participants().get(bid.participant());
        let trail = self.trails().get(bid.trail());
        EquitableKey {
            value: Reverse(bid.value()),
            successful_bid_count: hasher.successful_bid_count(),
            bid_count: hasher.bid_count(),
            rank: hasher.rank(),
            trail_bid_count: trail.bid_count(),
            trail: trail.id(),
        }
    }

    pub fn sort_equitably(&self, bids: &mut [Key<Bid>]) {
        bids.sort_by_cached_key(|&bid| self.equitable_key(bid));
    }

    /// Every bid of the time slot ordered by its current key. Before
    /// allocation this is the order the allocator will use; afterwards the
    /// winners' counts have moved, so use [`TimeSlotOutcome::ranked`] for the
    /// order that was actually used.
    ///
    /// [`TimeSlotOutcome::ranked`]: crate::allocation::TimeSlotOutcome::ranked
    #[must_use]
    pub fn ranked_bids_by_time_slot(&self, time_slot: Key<TimeSlot>) -> Vec<Key<Bid>> {
        let mut bids = self.time_slots().get(time_slot).bids().to_vec();
        self.sort_equitably(&mut bids);
        bids
    }
}
