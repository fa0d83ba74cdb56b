use core::fmt;

use crate::event::Event;
use crate::model::{BidStatus, LossReason, ParticipantId, TimeSlotId, TrailId};
use crate::store::Entity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Won,
    TrailFull,
    AlreadyAttending(TrailId),
    Pending,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Won => f.write_str("won"),
            Self::TrailFull => f.write_str("trail full"),
            Self::AlreadyAttending(trail) => write!(f, "already attending trail {trail}"),
            Self::Pending => f.write_str("pending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidExplanation {
    pub time_slot: Option<TimeSlotId>,
    pub trail: TrailId,
    pub value: u64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub participant: ParticipantId,
    pub name: String,
    pub bids: Vec<BidExplanation>,
}

/// What happened to each bid of one hasher, by time slot then highest
/// value first. `None` for an unknown hasher.
#[must_use]
pub fn explain(event: &Event, participant: ParticipantId) -> Option<Explanation> {
    let key = event.participants().key_of(&participant)?;
    let hasher = event.participants().get(key);

    let mut bids: Vec<_> = hasher
        .bids()
        .iter()
        .map(|&bid_key| {
            let bid = event.bid(bid_key);
            let time_slot = event.time_slot_of(bid_key).map(|slot| event.time_slots().get(slot));
            let verdict = match bid.status() {
                BidStatus::Pending => Verdict::Pending,
                BidStatus::Successful => Verdict::Won,
                BidStatus::Unresolved(LossReason::TrailFull) => Verdict::TrailFull,
                BidStatus::Unresolved(LossReason::AlreadyAttending { trail }) => {
                    Verdict::AlreadyAttending(event.trails().get(trail).id().clone())
                }
            };
            (
                time_slot.map(|slot| slot.sequence()),
                BidExplanation {
                    time_slot: time_slot.map(|slot| slot.id().clone()),
                    trail: event.trails().get(bid.trail()).id().clone(),
                    value: bid.value(),
                    verdict,
                },
            )
        })
        .collect();
    bids.sort_by(|(a_seq, a), (b_seq, b)| {
        (a_seq, &a.time_slot, core::cmp::Reverse(a.value), &a.trail)
            .cmp(&(b_seq, &b.time_slot, core::cmp::Reverse(b.value), &b.trail))
    });

    Some(Explanation {
        participant,
        name: hasher.name().to_owned(),
        bids: bids.into_iter().map(|(_, bid)| bid).collect(),
    })
}
