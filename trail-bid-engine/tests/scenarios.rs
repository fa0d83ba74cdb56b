use core::num::NonZeroU32;

use trail_bid_engine::{
    assign_fairness_ranks, Allocator, BidError, BidStatus, DrawOrder, DrawSource, Entity, Event,
    LossReason, Participant, ParticipantId, TimeSlot, TimeSlotId, Trail, TrailId,
};

fn capacity(places: u32) -> NonZeroU32 {
    NonZeroU32::new(places).unwrap()
}

fn event_with(trails: &[(&str, &str, u32)], hashers: &[(u64, &str)]) -> Event {
    let mut event = Event::new();
    for &(slot, trail, places) in trails {
        if event.time_slots().key_of(&TimeSlotId::new(slot)).is_none() {
            let sequence = u32::try_from(event.time_slots().len()).unwrap();
            event
                .add_time_slot(TimeSlot::new(TimeSlotId::new(slot), sequence, slot))
                .unwrap();
        }
        event
            .add_trail(Trail::new(TrailId::new(trail), 0, trail, capacity(places)))
            .unwrap();
        event.link(&TimeSlotId::new(slot), &TrailId::new(trail)).unwrap();
    }
    for &(id, name) in hashers {
        event
            .add_participant(Participant::new(ParticipantId(id), 1, name))
            .unwrap();
    }
    event
}

fn status(event: &Event, hasher: u64, trail: &str) -> BidStatus {
    let participant = event.participants().key_of(&ParticipantId(hasher)).unwrap();
    let trail = event.trails().key_of(&TrailId::new(trail)).unwrap();
    event.bid(event.find_bid(participant, trail).unwrap()).status()
}

#[test]
fn equal_bids_are_split_by_fairness_rank() {
    for (a_order, b_order) in [(1, 2), (2, 1)] {
        let mut event = event_with(&[("S", "T", 2)], &[(1, "A"), (2, "B"), (3, "C")]);
        event.add_bid(ParticipantId(1), &TrailId::new("T"), 50, 100).unwrap();
        event.add_bid(ParticipantId(2), &TrailId::new("T"), 50, 100).unwrap();
        event.add_bid(ParticipantId(3), &TrailId::new("T"), 30, 100).unwrap();
        let draw = DrawOrder::from_entries(
            [
                (ParticipantId(1), a_order),
                (ParticipantId(2), b_order),
                (ParticipantId(3), 3),
            ],
            None,
        )
        .unwrap();
        assign_fairness_ranks(&mut event, DrawSource::Replay(draw));
        let report = Allocator::new(&mut event).resolve_all();

        assert_eq!(status(&event, 1, "T"), BidStatus::Successful);
        assert_eq!(status(&event, 2, "T"), BidStatus::Successful);
        assert_eq!(
            status(&event, 3, "T"),
            BidStatus::Unresolved(LossReason::TrailFull)
        );
        let trail = event.trails().get_by_id(&TrailId::new("T")).unwrap();
        assert_eq!(trail.successful_bid_count(), 2);

        // the lower rank is granted first
        let first = event.bid(report.time_slots[0].winners[0]).participant();
        let expected = if a_order < b_order { 1 } else { 2 };
        assert_eq!(event.participants().get(first).id().0, expected);
    }
}

#[test]
fn one_win_per_time_slot() {
    let mut event = event_with(
        &[("S", "T1", 3), ("S", "T2", 3), ("Other", "T3", 3)],
        &[(1, "P")],
    );
    event.add_bid(ParticipantId(1), &TrailId::new("T1"), 20, 100).unwrap();
    event.add_bid(ParticipantId(1), &TrailId::new("T2"), 20, 100).unwrap();
    event.add_bid(ParticipantId(1), &TrailId::new("T3"), 20, 100).unwrap();
    assign_fairness_ranks(&mut event, DrawSource::Fresh { seed: Some(4) });
    Allocator::new(&mut event).resolve_all();

    let hasher = event.participants().get_by_id(&ParticipantId(1)).unwrap();
    // one in S, one in Other
    assert_eq!(hasher.successful_bid_count(), 2);
    assert_eq!(status(&event, 1, "T3"), BidStatus::Successful);
    let s_wins = [status(&event, 1, "T1"), status(&event, 1, "T2")]
        .into_iter()
        .filter(|status| status.is_successful())
        .count();
    assert_eq!(s_wins, 1);
}

#[test]
fn capacity_that_never_binds() {
    let mut event = event_with(&[("S", "U", 5)], &[(1, "Q"), (2, "R"), (3, "S")]);
    event.add_bid(ParticipantId(1), &TrailId::new("U"), 10, 100).unwrap();
    event.add_bid(ParticipantId(2), &TrailId::new("U"), 90, 100).unwrap();
    event.add_bid(ParticipantId(3), &TrailId::new("U"), 80, 100).unwrap();
    for seed in 0..10 {
        let mut run = event.clone();
        assign_fairness_ranks(&mut run, DrawSource::Fresh { seed: Some(seed) });
        Allocator::new(&mut run).resolve_all();
        assert_eq!(status(&run, 1, "U"), BidStatus::Successful);
        assert_eq!(run.trails().get_by_id(&TrailId::new("U")).unwrap().vacancies(), 2);
    }
}

#[test]
fn duplicate_bid_leaves_stored_bid_alone() {
    let mut event = event_with(&[("S", "T", 1)], &[(1, "A")]);
    event.add_bid(ParticipantId(1), &TrailId::new("T"), 25, 100).unwrap();
    let err = event
        .add_bid(ParticipantId(1), &TrailId::new("T"), 75, 100)
        .unwrap_err();
    assert!(matches!(err, BidError::DuplicateBid { .. }));
    assert_eq!(event.bids().value(), 25);
    assert_eq!(event.bids().count(), 1);
}

#[test]
fn over_allowance_bids_still_compete() {
    let mut event = event_with(&[("S", "T1", 1), ("S", "T2", 1)], &[(1, "Greedy"), (2, "Modest")]);
    let first = event.add_bid(ParticipantId(1), &TrailId::new("T1"), 80, 100).unwrap();
    let second = event.add_bid(ParticipantId(1), &TrailId::new("T2"), 80, 100).unwrap();
    event.add_bid(ParticipantId(2), &TrailId::new("T2"), 10, 100).unwrap();
    assert!(!first.allowance_exceeded);
    assert!(second.allowance_exceeded);

    assign_fairness_ranks(&mut event, DrawSource::Fresh { seed: Some(0) });
    Allocator::new(&mut event).resolve_all();
    // T1 is less contested, so it is granted first
    assert_eq!(status(&event, 1, "T1"), BidStatus::Successful);
    assert_eq!(
        status(&event, 1, "T2"),
        BidStatus::Unresolved(LossReason::AlreadyAttending {
            trail: event.trails().key_of(&TrailId::new("T1")).unwrap(),
        })
    );
    assert_eq!(status(&event, 2, "T2"), BidStatus::Successful);
}

#[test]
fn wins_are_spread_across_hashers() {
    // after winning in the morning, equal afternoon bids favour the hasher
    // who has not won yet
    let mut event = event_with(&[("AM", "1", 1), ("PM", "2", 1)], &[(1, "Early"), (2, "Late")]);
    event.add_bid(ParticipantId(1), &TrailId::new("1"), 40, 100).unwrap();
    event.add_bid(ParticipantId(1), &TrailId::new("2"), 40, 100).unwrap();
    event.add_bid(ParticipantId(2), &TrailId::new("2"), 40, 100).unwrap();
    event.add_bid(ParticipantId(2), &TrailId::new("1"), 10, 100).unwrap();
    let draw =
        DrawOrder::from_entries([(ParticipantId(1), 1), (ParticipantId(2), 2)], None).unwrap();
    assign_fairness_ranks(&mut event, DrawSource::Replay(draw));
    Allocator::new(&mut event).resolve_all();

    assert_eq!(status(&event, 1, "1"), BidStatus::Successful);
    assert_eq!(status(&event, 2, "2"), BidStatus::Successful);
    assert_eq!(status(&event, 1, "2"), BidStatus::Unresolved(LossReason::TrailFull));
}
