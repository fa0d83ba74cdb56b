//! Greedy, capacity-limited assignment of bids to trails.
//!
//! A hasher may win at most one trail per time slot, so the canonical path
//! resolves a whole time slot at once: the bids on all of its trails are
//! ordered together with the equitable comparator and then granted one by
//! one. Every bid is decided exactly once and ends up either successful or
//! unresolved.

use tracing::{debug, info, trace};

use crate::event::Event;
use crate::key::Key;
use crate::model::{Bid, BidStatus, LossReason, TimeSlot, Trail};
use crate::store::Entity;

/// How full a trail ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailFill {
    pub trail: Key<Trail>,
    pub capacity: u32,
    pub filled: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlotOutcome {
    pub time_slot: Key<TimeSlot>,
    /// Every bid of the time slot in the order it was considered, including
    /// bids decided before this pass.
    pub ranked: Vec<Key<Bid>>,
    /// In the order they were granted.
    pub winners: Vec<Key<Bid>>,
    pub losses: Vec<(Key<Bid>, LossReason)>,
    pub fill: Vec<TrailFill>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailOutcome {
    pub trail: Key<Trail>,
    pub winners: Vec<Key<Bid>>,
    pub losses: Vec<(Key<Bid>, LossReason)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationReport {
    pub time_slots: Vec<TimeSlotOutcome>,
}

impl AllocationReport {
    #[must_use]
    pub fn winner_count(&self) -> usize {
        self.time_slots.iter().map(|outcome| outcome.winners.len()).sum()
    }

    #[must_use]
    pub fn loss_count(&self) -> usize {
        self.time_slots.iter().map(|outcome| outcome.losses.len()).sum()
    }
}

#[derive(Debug, Clone, Copy)]
enum Decision {
    Won,
    Lost(LossReason),
}

/// The only writer of successful-bid collections and bid statuses.
pub struct Allocator<'a> {
    event: &'a mut Event,
}

impl<'a> Allocator<'a> {
    pub fn new(event: &'a mut Event) -> Self {
        Self { event }
    }

    /// Resolves every time slot in `(sequence, id)` order.
    pub fn resolve_all(&mut self) -> AllocationReport {
        let time_slots = self.event.time_slots().sorted_by_sequence();
        AllocationReport {
            time_slots: time_slots
                .into_iter()
                .map(|time_slot| self.resolve_time_slot(time_slot))
                .collect(),
        }
    }

    /// Resolves all pending bids on the trails of one time slot.
    pub fn resolve_time_slot(&mut self, time_slot: Key<TimeSlot>) -> TimeSlotOutcome {
        let ranked = self.event.ranked_bids_by_time_slot(time_slot);
        let mut winners = Vec::new();
        let mut losses = Vec::new();
        for &bid in &ranked {
            match self.run_bid(bid) {
                Some(Decision::Won) => winners.push(bid),
                Some(Decision::Lost(reason)) => losses.push((bid, reason)),
                None => {}
            }
        }

        let fill: Vec<_> = self
            .event
            .trails_by_time_slot(time_slot)
            .iter()
            .map(|&trail| {
                let run = self.event.trails().get(trail);
                TrailFill {
                    trail,
                    capacity: run.capacity(),
                    filled: run.successful_bid_count(),
                }
            })
            .collect();
        for entry in &fill {
            info!(
                trail = %self.event.trails().get(entry.trail).id(),
                filled = entry.filled,
                capacity = entry.capacity,
                "trail resolved"
            );
        }
        info!(
            time_slot = %self.event.time_slots().get(time_slot).id(),
            winners = winners.len(),
            losses = losses.len(),
            "time slot resolved"
        );

        TimeSlotOutcome {
            time_slot,
            ranked,
            winners,
            losses,
            fill,
        }
    }

    /// Resolves one trail on its own: only its own pending bids are ordered
    /// and granted, under the same capacity and attendance rules.
    ///
    /// Bids on the other trails of the same time slot are not considered,
    /// so on a time slot with several trails the outcome can differ from
    /// [`Self::resolve_time_slot`]. For a single-trail time slot the two
    /// agree.
    pub fn resolve_trail(&mut self, trail: Key<Trail>) -> TrailOutcome {
        let mut ranked = self.event.trails().get(trail).bids().to_vec();
        self.event.sort_equitably(&mut ranked);
        let mut winners = Vec::new();
        let mut losses = Vec::new();
        for bid in ranked {
            match self.run_bid(bid) {
                Some(Decision::Won) => winners.push(bid),
                Some(Decision::Lost(reason)) => losses.push((bid, reason)),
                None => {}
            }
        }
        let run = self.event.trails().get(trail);
        info!(
            trail = %run.id(),
            filled = run.successful_bid_count(),
            capacity = run.capacity(),
            "trail resolved"
        );
        TrailOutcome {
            trail,
            winners,
            losses,
        }
    }

    /// Decides one bid. `None` if it was already decided.
    fn run_bid(&mut self, key: Key<Bid>) -> Option<Decision> {
        let bid = self.event.bid(key);
        if !bid.status().is_pending() {
            return None;
        }
        let participant = bid.participant();
        let trail = self.event.trails().get(bid.trail());
        let hasher = self.event.participants().get(participant);

        let attending = trail
            .time_slot()
            .and_then(|time_slot| self.event.attending_trail(participant, time_slot));
        let decision = if trail.is_at_capacity() {
            trace!(
                participant = %hasher.id(),
                trail = %trail.id(),
                value = bid.value(),
                "trail full"
            );
            Decision::Lost(LossReason::TrailFull)
        } else if let Some(attending) = attending {
            trace!(
                participant = %hasher.id(),
                trail = %trail.id(),
                attending = %self.event.trails().get(attending).id(),
                "already attending"
            );
            Decision::Lost(LossReason::AlreadyAttending { trail: attending })
        } else {
            debug!(participant = %hasher.id(), trail = %trail.id(), value = bid.value(), "bid won");
            Decision::Won
        };

        match decision {
            Decision::Won => self.event.commit_win(key),
            Decision::Lost(reason) => self.event.set_status(key, BidStatus::Unresolved(reason)),
        }
        Some(decision)
    }
}
