//! Allocation of capacity-limited trails to bidding hashers.
//!
//! Build an [`Event`], link every trail to its time slot, add the bids,
//! [`assign_fairness_ranks`] and then let the [`Allocator`] decide the
//! winners.

pub mod allocation;
pub mod comparator;
pub mod error;
pub mod event;
pub mod explain;
pub mod key;
pub mod model;
pub mod persist;
pub mod rank;
pub mod store;
pub mod view;

pub use allocation::{AllocationReport, Allocator, TimeSlotOutcome, TrailFill, TrailOutcome};
pub use comparator::EquitableKey;
pub use error::{BidError, DrawOrderError, LinkError, StoreError};
pub use event::{BidReceipt, Event, LinkOutcome};
pub use explain::{explain, BidExplanation, Explanation, Verdict};
pub use key::Key;
pub use model::{
    Bid, BidStatus, LossReason, Participant, ParticipantId, TimeSlot, TimeSlotId, Trail, TrailId,
};
pub use persist::DrawOrderStore;
pub use rank::{
    assign_fairness_ranks, DrawOrder, DrawSource, FairnessRank, RankAssignment, RankSummary,
};
pub use store::{Entity, InsertOutcome, Store};
pub use view::BidView;
