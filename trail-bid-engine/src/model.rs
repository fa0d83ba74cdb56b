//! The entity graph: hashers bid on trails, trails happen in time slots.
//!
//! Entities only hold keys into the owning [`Event`](crate::Event). The
//! successful-bid collections are written exclusively by the
//! [`Allocator`](crate::Allocator).

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::key::Key;
use crate::rank::FairnessRank;
use crate::store::Entity;

/// Registration number of a hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrailId(String);

impl TrailId {
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlotId(String);

impl TimeSlotId {
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimeSlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A hasher who can bid on trails.
#[derive(Debug, Clone)]
pub struct Participant {
    id: ParticipantId,
    sequence: u32,
    name: String,
    pub(crate) bids: Vec<Key<Bid>>,
    pub(crate) successful_bids: Vec<Key<Bid>>,
    pub(crate) bid_value: u64,
    pub(crate) rank: FairnessRank,
}

impl Participant {
    #[must_use]
    pub fn new(id: ParticipantId, sequence: u32, name: impl AsRef<str>) -> Self {
        Self {
            id,
            sequence,
            name: name.as_ref().trim().to_owned(),
            bids: Vec::new(),
            successful_bids: Vec::new(),
            bid_value: 0,
            rank: FairnessRank::unassigned(sequence),
        }
    }

    #[must_use]
    pub fn bids(&self) -> &[Key<Bid>] {
        &self.bids
    }

    #[must_use]
    pub fn successful_bids(&self) -> &[Key<Bid>] {
        &self.successful_bids
    }

    #[must_use]
    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    /// Sum of the values of every bid this hasher submitted.
    #[must_use]
    pub const fn bid_value(&self) -> u64 {
        self.bid_value
    }

    #[must_use]
    pub fn successful_bid_count(&self) -> usize {
        self.successful_bids.len()
    }

    /// Position in the last fairness draw.
    #[must_use]
    pub const fn order(&self) -> u32 {
        self.rank.order()
    }

    #[must_use]
    pub const fn rank(&self) -> FairnessRank {
        self.rank
    }
}

impl Entity for Participant {
    type Id = ParticipantId;

    const KIND: &'static str = "hasher";

    fn id(&self) -> &ParticipantId {
        &self.id
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.name)
    }
}

/// A run with a limited number of places, held in exactly one time slot.
#[derive(Debug, Clone)]
pub struct Trail {
    id: TrailId,
    sequence: u32,
    name: String,
    capacity: NonZeroU32,
    pub(crate) time_slot: Option<Key<TimeSlot>>,
    pub(crate) bids: Vec<Key<Bid>>,
    pub(crate) successful_bids: Vec<Key<Bid>>,
    pub(crate) bid_value: u64,
}

impl Trail {
    #[must_use]
    pub fn new(id: TrailId, sequence: u32, name: impl AsRef<str>, capacity: NonZeroU32) -> Self {
        Self {
            id,
            sequence,
            name: name.as_ref().trim().to_owned(),
            capacity,
            time_slot: None,
            bids: Vec::new(),
            successful_bids: Vec::new(),
            bid_value: 0,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity.get()
    }

    /// `None` until the calendar has been linked.
    #[must_use]
    pub const fn time_slot(&self) -> Option<Key<TimeSlot>> {
        self.time_slot
    }

    #[must_use]
    pub fn bids(&self) -> &[Key<Bid>] {
        &self.bids
    }

    #[must_use]
    pub fn successful_bids(&self) -> &[Key<Bid>] {
        &self.successful_bids
    }

    #[must_use]
    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    #[must_use]
    pub const fn bid_value(&self) -> u64 {
        self.bid_value
    }

    #[must_use]
    pub fn successful_bid_count(&self) -> usize {
        self.successful_bids.len()
    }

    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.successful_bids.len() >= self.capacity.get() as usize
    }

    #[must_use]
    pub fn vacancies(&self) -> usize {
        (self.capacity.get() as usize).saturating_sub(self.successful_bids.len())
    }
}

impl Entity for Trail {
    type Id = TrailId;

    const KIND: &'static str = "trail";

    fn id(&self) -> &TrailId {
        &self.id
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.name)
    }
}

/// A window in which one or more trails are run. A hasher attends at most
/// one trail per time slot.
#[derive(Debug, Clone)]
pub struct TimeSlot {
    id: TimeSlotId,
    sequence: u32,
    name: String,
    pub(crate) trails: Vec<Key<Trail>>,
    pub(crate) bids: Vec<Key<Bid>>,
}

impl TimeSlot {
    #[must_use]
    pub fn new(id: TimeSlotId, sequence: u32, name: impl AsRef<str>) -> Self {
        Self {
            id,
            sequence,
            name: name.as_ref().trim().to_owned(),
            trails: Vec::new(),
            bids: Vec::new(),
        }
    }

    #[must_use]
    pub fn trails(&self) -> &[Key<Trail>] {
        &self.trails
    }

    /// Every bid placed on one of this slot's trails.
    #[must_use]
    pub fn bids(&self) -> &[Key<Bid>] {
        &self.bids
    }
}

impl Entity for TimeSlot {
    type Id = TimeSlotId;

    const KIND: &'static str = "time slot";

    fn id(&self) -> &TimeSlotId {
        &self.id
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.name)
    }
}

/// Why a bid did not win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossReason {
    /// The trail filled up with bids ranked ahead of this one.
    TrailFull,
    /// The hasher already won `trail` in the same time slot.
    AlreadyAttending { trail: Key<Trail> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BidStatus {
    #[default]
    Pending,
    Successful,
    Unresolved(LossReason),
}

impl BidStatus {
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub const fn is_successful(self) -> bool {
        matches!(self, Self::Successful)
    }
}

/// A hasher's valued request to attend a trail. The time slot is always
/// derived from the trail.
#[derive(Debug, Clone)]
pub struct Bid {
    participant: Key<Participant>,
    trail: Key<Trail>,
    value: u64,
    pub(crate) status: BidStatus,
}

impl Bid {
    pub(crate) const fn new(participant: Key<Participant>, trail: Key<Trail>, value: u64) -> Self {
        Self {
            participant,
            trail,
            value,
            status: BidStatus::Pending,
        }
    }

    #[must_use]
    pub const fn participant(&self) -> Key<Participant> {
        self.participant
    }

    #[must_use]
    pub const fn trail(&self) -> Key<Trail> {
        self.trail
    }

    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    #[must_use]
    pub const fn status(&self) -> BidStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use core::num::NonZeroU32;

    use super::{BidStatus, Participant, ParticipantId, Trail, TrailId};
    use crate::store::Entity;

    #[test]
    fn ids_and_names_are_trimmed() {
        let trail = Trail::new(TrailId::new(" 201 "), 0, " test trail ", NonZeroU32::MIN);
        assert_eq!(trail.id().as_str(), "201");
        assert_eq!(trail.name(), "test trail");
        assert_eq!(trail.to_string(), "201: test trail");
    }

    #[test]
    fn bidless_hasher_has_zero_aggregates() {
        let hasher = Participant::new(ParticipantId(101), 0, "Stupid McNamey");
        assert_eq!(hasher.bid_count(), 0);
        assert_eq!(hasher.bid_value(), 0);
        assert_eq!(hasher.successful_bid_count(), 0);
        assert_eq!(hasher.order(), 0);
    }

    #[test]
    fn trail_without_bids() {
        let trail = Trail::new(TrailId::new("1"), 0, "Lonely", NonZeroU32::new(3).unwrap());
        assert_eq!(trail.bid_count(), 0);
        assert_eq!(trail.bid_value(), 0);
        assert!(trail.time_slot().is_none());
        assert!(!trail.is_at_capacity());
        assert_eq!(trail.vacancies(), 3);
    }

    #[test]
    fn new_status_is_pending() {
        assert!(BidStatus::default().is_pending());
        assert!(!BidStatus::default().is_successful());
    }
}
