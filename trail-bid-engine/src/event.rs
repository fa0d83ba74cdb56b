use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{BidError, LinkError, StoreError};
use crate::key::Key;
use crate::model::{
    Bid, BidStatus, Participant, ParticipantId, TimeSlot, TimeSlotId, Trail, TrailId,
};
use crate::store::{Entity, Store};
use crate::view::BidView;

/// Result of [`Event::link`] when the request does not conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    /// The trail was already held in the requested time slot.
    AlreadyLinked,
}

/// Returned by [`Event::add_bid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidReceipt {
    pub key: Key<Bid>,
    /// Set on the one bid that pushed the hasher's total for the time slot
    /// past the allowance.
    pub allowance_exceeded: bool,
}

/// Arena holding every entity of one event and the indices between them.
#[derive(Debug, Clone, Default)]
pub struct Event {
    participants: Store<Participant>,
    trails: Store<Trail>,
    time_slots: Store<TimeSlot>,
    bids: Vec<Bid>,
    bid_lookup: HashMap<(Key<Participant>, Key<Trail>), Key<Bid>>,
}

impl Event {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn participants(&self) -> &Store<Participant> {
        &self.participants
    }

    #[must_use]
    pub const fn trails(&self) -> &Store<Trail> {
        &self.trails
    }

    #[must_use]
    pub const fn time_slots(&self) -> &Store<TimeSlot> {
        &self.time_slots
    }

    pub(crate) fn participants_mut(&mut self) -> &mut Store<Participant> {
        &mut self.participants
    }

    pub fn add_participant(
        &mut self,
        participant: Participant,
    ) -> Result<Key<Participant>, StoreError> {
        self.participants.add(participant)
    }

    pub fn add_trail(&mut self, trail: Trail) -> Result<Key<Trail>, StoreError> {
        self.trails.add(trail)
    }

    pub fn add_time_slot(&mut self, time_slot: TimeSlot) -> Result<Key<TimeSlot>, StoreError> {
        self.time_slots.add(time_slot)
    }

    /// Places the trail in the time slot. A trail's time slot is set at most
    /// once; asking for the same slot again is harmless.
    pub fn link(
        &mut self,
        time_slot: &TimeSlotId,
        trail: &TrailId,
    ) -> Result<LinkOutcome, LinkError> {
        let slot_key = self
            .time_slots
            .key_of(time_slot)
            .ok_or_else(|| LinkError::UnknownTimeSlot(time_slot.clone()))?;
        let trail_key = self
            .trails
            .key_of(trail)
            .ok_or_else(|| LinkError::UnknownTrail(trail.clone()))?;

        let current = self.trails.get(trail_key).time_slot;
        match current {
            Some(existing) if existing == slot_key => Ok(LinkOutcome::AlreadyLinked),
            Some(existing) => Err(LinkError::DuplicateRelation {
                trail: trail.clone(),
                existing: self.time_slots.get(existing).id().clone(),
                requested: time_slot.clone(),
            }),
            None => {
                self.trails.get_mut(trail_key).time_slot = Some(slot_key);
                self.time_slots.get_mut(slot_key).trails.push(trail_key);
                Ok(LinkOutcome::Linked)
            }
        }
    }

    /// Records a bid. Going over `allowance` within a time slot is only
    /// reported through the receipt.
    pub fn add_bid(
        &mut self,
        participant: ParticipantId,
        trail: &TrailId,
        value: u64,
        allowance: u64,
    ) -> Result<BidReceipt, BidError> {
        let participant_key = self
            .participants
            .key_of(&participant)
            .ok_or(BidError::UnknownParticipant(participant))?;
        let trail_key = self
            .trails
            .key_of(trail)
            .ok_or_else(|| BidError::UnknownTrail(trail.clone()))?;
        let slot_key = self
            .trails
            .get(trail_key)
            .time_slot
            .ok_or_else(|| BidError::UnlinkedTrail(trail.clone()))?;
        if self.bid_lookup.contains_key(&(participant_key, trail_key)) {
            return Err(BidError::DuplicateBid {
                participant,
                trail: trail.clone(),
            });
        }

        let before = self.value_by_time_slot(participant_key, slot_key);
        let after = before.saturating_add(value);
        let allowance_exceeded = before <= allowance && after > allowance;
        if allowance_exceeded {
            warn!(
                participant = %participant,
                time_slot = %self.time_slots.get(slot_key).id(),
                total = after,
                allowance,
                "bid allowance exceeded"
            );
        }

        let key = Key::new(self.bids.len());
        self.bids.push(Bid::new(participant_key, trail_key, value));
        self.bid_lookup.insert((participant_key, trail_key), key);

        let hasher = self.participants.get_mut(participant_key);
        hasher.bids.push(key);
        hasher.bid_value = hasher.bid_value.saturating_add(value);
        let run = self.trails.get_mut(trail_key);
        run.bids.push(key);
        run.bid_value = run.bid_value.saturating_add(value);
        self.time_slots.get_mut(slot_key).bids.push(key);

        debug!(participant = %participant, trail = %trail, value, "bid recorded");
        Ok(BidReceipt {
            key,
            allowance_exceeded,
        })
    }

    #[must_use]
    pub fn bid(&self, key: Key<Bid>) -> &Bid {
        &self.bids[key.index()]
    }

    /// Looks up the bid a hasher placed on a trail.
    #[must_use]
    pub fn find_bid(&self, participant: Key<Participant>, trail: Key<Trail>) -> Option<Key<Bid>> {
        self.bid_lookup.get(&(participant, trail)).copied()
    }

    #[must_use]
    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    /// The time slot of the bid's trail.
    #[must_use]
    pub fn time_slot_of(&self, bid: Key<Bid>) -> Option<Key<TimeSlot>> {
        self.trails.get(self.bid(bid).trail()).time_slot
    }

    #[must_use]
    pub fn bids(&self) -> BidView<'_> {
        BidView::new(self, (0..self.bids.len()).map(Key::new).collect())
    }

    #[must_use]
    pub fn bids_by_participant(&self, participant: Key<Participant>) -> BidView<'_> {
        BidView::new(self, self.participants.get(participant).bids.clone())
    }

    #[must_use]
    pub fn bids_by_trail(&self, trail: Key<Trail>) -> BidView<'_> {
        BidView::new(self, self.trails.get(trail).bids.clone())
    }

    #[must_use]
    pub fn bids_by_time_slot(&self, time_slot: Key<TimeSlot>) -> BidView<'_> {
        BidView::new(self, self.time_slots.get(time_slot).bids.clone())
    }

    #[must_use]
    pub fn successful_bids_by_participant(&self, participant: Key<Participant>) -> BidView<'_> {
        BidView::new(self, self.participants.get(participant).successful_bids.clone())
    }

    #[must_use]
    pub fn successful_bids_by_trail(&self, trail: Key<Trail>) -> BidView<'_> {
        BidView::new(self, self.trails.get(trail).successful_bids.clone())
    }

    /// Hashers with at least one bid in the time slot, in key order.
    #[must_use]
    pub fn participants_by_time_slot(&self, time_slot: Key<TimeSlot>) -> Vec<Key<Participant>> {
        self.bids_by_time_slot(time_slot).participants()
    }

    #[must_use]
    pub fn trails_by_time_slot(&self, time_slot: Key<TimeSlot>) -> &[Key<Trail>] {
        self.time_slots.get(time_slot).trails()
    }

    /// Total a hasher has bid across the trails of one time slot.
    #[must_use]
    pub fn value_by_time_slot(
        &self,
        participant: Key<Participant>,
        time_slot: Key<TimeSlot>,
    ) -> u64 {
        self.participants
            .get(participant)
            .bids
            .iter()
            .filter(|&&bid| self.time_slot_of(bid) == Some(time_slot))
            .map(|&bid| self.bid(bid).value())
            .sum()
    }

    /// The trail the hasher has already won in this time slot, if any.
    #[must_use]
    pub fn attending_trail(
        &self,
        participant: Key<Participant>,
        time_slot: Key<TimeSlot>,
    ) -> Option<Key<Trail>> {
        self.participants
            .get(participant)
            .successful_bids
            .iter()
            .find(|&&bid| self.time_slot_of(bid) == Some(time_slot))
            .map(|&bid| self.bid(bid).trail())
    }

    #[must_use]
    pub fn is_attending_time_slot(
        &self,
        participant: Key<Participant>,
        time_slot: Key<TimeSlot>,
    ) -> bool {
        self.attending_trail(participant, time_slot).is_some()
    }

    /// Hashers who did not bid at all, ordered by id.
    #[must_use]
    pub fn participants_without_bids(&self) -> Vec<Key<Participant>> {
        self.participants
            .sorted_by_id()
            .into_iter()
            .filter(|&key| self.participants.get(key).bid_count() == 0)
            .collect()
    }

    /// Hashers who bid but won nothing, ordered by id.
    #[must_use]
    pub fn unsuccessful_participants(&self) -> Vec<Key<Participant>> {
        self.participants
            .sorted_by_id()
            .into_iter()
            .filter(|&key| {
                let hasher = self.participants.get(key);
                hasher.bid_count() > 0 && hasher.successful_bid_count() == 0
            })
            .collect()
    }

    pub(crate) fn set_status(&mut self, bid: Key<Bid>, status: BidStatus) {
        self.bids[bid.index()].status = status;
    }

    /// Moves a pending bid into both successful-bid collections.
    pub(crate) fn commit_win(&mut self, bid: Key<Bid>) {
        let (participant, trail) = {
            let bid = self.bid(bid);
            (bid.participant(), bid.trail())
        };
        self.set_status(bid, BidStatus::Successful);
        self.trails.get_mut(trail).successful_bids.push(bid);
        self.participants.get_mut(participant).successful_bids.push(bid);
    }
}
