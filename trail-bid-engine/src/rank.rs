//! Fairness ranks.
//!
//! Ties between equal bids are broken by a rank combining a hasher's
//! registration sequence with their position in a random draw. The draw is
//! made once, persisted by [`DrawOrderStore`](crate::DrawOrderStore) and
//! replayed on later runs.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::error::DrawOrderError;
use crate::event::Event;
use crate::model::ParticipantId;
use crate::store::Entity;

/// Tie-break score of one hasher, lower wins.
///
/// Ordered by `sequence² × order` first and by the draw position itself
/// second. Draw positions are unique, so two hashers never share a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FairnessRank {
    score: u128,
    order: u32,
}

impl FairnessRank {
    #[must_use]
    pub const fn new(sequence: u32, order: u32) -> Self {
        let sequence = sequence as u128;
        Self {
            score: sequence * sequence * order as u128,
            order,
        }
    }

    /// Placeholder before any draw has been applied.
    pub(crate) const fn unassigned(sequence: u32) -> Self {
        Self {
            score: sequence as u128,
            order: 0,
        }
    }

    #[must_use]
    pub const fn score(self) -> u128 {
        self.score
    }

    #[must_use]
    pub const fn order(self) -> u32 {
        self.order
    }
}

/// Draw position for every hasher, a permutation of `1..=n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawOrder {
    positions: BTreeMap<ParticipantId, u32>,
    seed: Option<u64>,
}

impl DrawOrder {
    /// Shuffles `ids` uniformly. The result does not depend on the order
    /// the ids are passed in.
    pub fn draw<R: Rng + ?Sized>(
        ids: impl IntoIterator<Item = ParticipantId>,
        rng: &mut R,
    ) -> Self {
        let mut ids: Vec<_> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        ids.shuffle(rng);
        Self {
            positions: ids.into_iter().zip(1..).collect(),
            seed: None,
        }
    }

    #[must_use]
    pub fn seeded(ids: impl IntoIterator<Item = ParticipantId>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            seed: Some(seed),
            ..Self::draw(ids, &mut rng)
        }
    }

    /// Rebuilds a draw from persisted pairs, checking that the positions
    /// form a permutation of `1..=n`.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (ParticipantId, u32)>,
        seed: Option<u64>,
    ) -> Result<Self, DrawOrderError> {
        let mut positions = BTreeMap::new();
        let mut taken = BTreeSet::new();
        for (participant, order) in entries {
            if positions.insert(participant, order).is_some() {
                return Err(DrawOrderError::InvalidPermutation(format!(
                    "hasher {participant} appears twice"
                )));
            }
            if !taken.insert(order) {
                return Err(DrawOrderError::InvalidPermutation(format!(
                    "position {order} is used twice"
                )));
            }
        }
        let count = positions.len();
        if let Some(&out_of_range) = taken
            .iter()
            .find(|&&order| order == 0 || order as usize > count)
        {
            return Err(DrawOrderError::InvalidPermutation(format!(
                "position {out_of_range} is outside 1..={count}"
            )));
        }
        Ok(Self { positions, seed })
    }

    #[must_use]
    pub fn position(&self, participant: ParticipantId) -> Option<u32> {
        self.positions.get(&participant).copied()
    }

    /// The seed the draw was made with, if it was seeded.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Pairs in ascending hasher id order.
    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, u32)> + '_ {
        self.positions.iter().map(|(&participant, &order)| (participant, order))
    }
}

/// Where the draw for [`assign_fairness_ranks`] comes from.
#[derive(Debug, Clone)]
pub enum DrawSource {
    /// Reuse a persisted draw without consuming any randomness.
    Replay(DrawOrder),
    /// Draw a new permutation. Without a seed one is picked at random and
    /// recorded, so even an unseeded draw can be reproduced.
    Fresh { seed: Option<u64> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankSummary {
    pub replayed: bool,
    pub ranked: usize,
    /// Hashers missing from a replayed draw, ranked after everyone in it.
    pub late_entries: Vec<ParticipantId>,
    /// Entries of a replayed draw naming unknown hashers.
    pub stale_entries: usize,
}

#[derive(Debug, Clone)]
pub struct RankAssignment {
    /// The draw that was applied, to be persisted after a fresh draw.
    pub draw: DrawOrder,
    pub summary: RankSummary,
}

/// Gives every hasher of `event` a fairness rank.
pub fn assign_fairness_ranks(event: &mut Event, source: DrawSource) -> RankAssignment {
    let ids: Vec<_> = event.participants().iter().map(|(_, hasher)| *hasher.id()).collect();

    let (mut draw, replayed) = match source {
        DrawSource::Replay(draw) => (draw, true),
        DrawSource::Fresh { seed } => {
            let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
            (DrawOrder::seeded(ids.iter().copied(), seed), false)
        }
    };

    let known: BTreeSet<_> = ids.iter().copied().collect();
    let stale_entries = draw
        .positions
        .keys()
        .filter(|participant| !known.contains(participant))
        .count();

    let mut late_entries: Vec<_> = ids
        .iter()
        .copied()
        .filter(|&participant| draw.position(participant).is_none())
        .collect();
    late_entries.sort_unstable();
    let mut next = draw.positions.values().copied().max().unwrap_or(0);
    for &participant in &late_entries {
        next = next.saturating_add(1);
        draw.positions.insert(participant, next);
    }

    for hasher in event.participants_mut().iter_mut() {
        if let Some(order) = draw.position(*hasher.id()) {
            hasher.rank = FairnessRank::new(hasher.sequence(), order);
        }
    }

    if stale_entries > 0 {
        warn!(stale_entries, "draw order names hashers that are no longer registered");
    }
    if !late_entries.is_empty() {
        warn!(
            late_entries = late_entries.len(),
            "hashers missing from the draw order were ranked last"
        );
    }
    info!(
        replayed,
        seed = ?draw.seed(),
        hashers = ids.len(),
        "assigned fairness ranks"
    );

    RankAssignment {
        draw,
        summary: RankSummary {
            replayed,
            ranked: ids.len(),
            late_entries,
            stale_entries,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{assign_fairness_ranks, DrawOrder, DrawSource, FairnessRank};
    use crate::error::DrawOrderError;
    use crate::event::Event;
    use crate::model::{Participant, ParticipantId};
    use crate::store::Entity;

    fn ids(range: core::ops::RangeInclusive<u64>) -> Vec<ParticipantId> {
        range.map(ParticipantId).collect()
    }

    #[test]
    fn rank_orders_by_score_then_order() {
        assert!(FairnessRank::new(1, 4) < FairnessRank::new(2, 2));
        assert!(FairnessRank::new(3, 1) > FairnessRank::new(2, 2));
        // same score, order decides
        assert!(FairnessRank::new(0, 1) < FairnessRank::new(0, 2));
        assert_eq!(FairnessRank::new(u32::MAX, u32::MAX).order(), u32::MAX);
    }

    #[test]
    fn seeded_draw_is_a_reproducible_permutation() {
        let first = DrawOrder::seeded(ids(1..=50), 7);
        let second = DrawOrder::seeded(ids(1..=50).into_iter().rev(), 7);
        assert_eq!(first, second);
        let mut positions: Vec<_> = first.iter().map(|(_, order)| order).collect();
        positions.sort_unstable();
        assert_eq!(positions, (1..=50).collect::<Vec<u32>>());
        assert_eq!(first.seed(), Some(7));
    }

    #[test]
    fn from_entries_rejects_broken_permutations() {
        let pairs = [(ParticipantId(1), 1), (ParticipantId(2), 1)];
        assert!(matches!(
            DrawOrder::from_entries(pairs, None),
            Err(DrawOrderError::InvalidPermutation(_))
        ));
        let gap = [(ParticipantId(1), 1), (ParticipantId(2), 3)];
        assert!(matches!(
            DrawOrder::from_entries(gap, None),
            Err(DrawOrderError::InvalidPermutation(_))
        ));
        let twice = [(ParticipantId(1), 1), (ParticipantId(1), 2)];
        assert!(DrawOrder::from_entries(twice, None).is_err());
        assert!(DrawOrder::from_entries([], None).unwrap().is_empty());
    }

    fn event(hashers: &[(u64, u32)]) -> Event {
        let mut event = Event::new();
        for &(id, sequence) in hashers {
            event
                .add_participant(Participant::new(ParticipantId(id), sequence, "h"))
                .unwrap();
        }
        event
    }

    #[test]
    fn replay_applies_the_persisted_positions() {
        let mut event = event(&[(1, 2), (2, 1)]);
        let draw =
            DrawOrder::from_entries([(ParticipantId(1), 2), (ParticipantId(2), 1)], None).unwrap();
        let assignment = assign_fairness_ranks(&mut event, DrawSource::Replay(draw.clone()));
        assert!(assignment.summary.replayed);
        assert_eq!(assignment.draw, draw);

        let one = event.participants().get_by_id(&ParticipantId(1)).unwrap();
        assert_eq!(one.order(), 2);
        assert_eq!(one.rank(), FairnessRank::new(2, 2));
        let two = event.participants().get_by_id(&ParticipantId(2)).unwrap();
        assert_eq!(two.rank().score(), 1);
    }

    #[test]
    fn replay_ranks_late_entries_last_and_counts_stale_ones() {
        let mut event = event(&[(1, 1), (5, 1), (3, 1)]);
        let draw =
            DrawOrder::from_entries([(ParticipantId(1), 1), (ParticipantId(9), 2)], None).unwrap();
        let assignment = assign_fairness_ranks(&mut event, DrawSource::Replay(draw));
        assert_eq!(assignment.summary.late_entries, [ParticipantId(3), ParticipantId(5)]);
        assert_eq!(assignment.summary.stale_entries, 1);
        let order = |id| event.participants().get_by_id(&ParticipantId(id)).unwrap().order();
        assert_eq!((order(1), order(3), order(5)), (1, 3, 4));
    }

    #[test]
    fn fresh_draw_records_its_seed() {
        let mut event = event(&[(1, 1), (2, 2), (3, 3)]);
        let assignment = assign_fairness_ranks(&mut event, DrawSource::Fresh { seed: None });
        assert!(!assignment.summary.replayed);
        assert!(assignment.draw.seed().is_some());
        assert_eq!(assignment.draw.len(), 3);

        let mut again = Event::new();
        for (_, hasher) in event.participants().iter() {
            again
                .add_participant(Participant::new(*hasher.id(), hasher.sequence(), hasher.name()))
                .unwrap();
        }
        let replay = assign_fairness_ranks(&mut again, DrawSource::Fresh {
            seed: assignment.draw.seed(),
        });
        assert_eq!(replay.draw, assignment.draw);
    }

    #[test]
    fn ranks_are_unique() {
        let mut event = event(&[(1, 0), (2, 0), (3, 0), (4, 5)]);
        assign_fairness_ranks(&mut event, DrawSource::Fresh { seed: Some(3) });
        let mut ranks: Vec<_> = event
            .participants()
            .iter()
            .map(|(_, hasher)| hasher.rank())
            .collect();
        ranks.sort_unstable();
        ranks.dedup();
        assert_eq!(ranks.len(), 4);
    }
}
