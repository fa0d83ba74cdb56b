//! Plain text listings of an allocation.

use std::collections::BTreeMap;
use std::io::{self, Write};

use itertools::Itertools;
use trail_bid_engine::{
    AllocationReport, BidStatus, Entity, Event, Explanation, Key, LossReason, Participant,
};

/// Groups `(key, value)` pairs, keeping the values in input order.
fn group_pairs<A, B, I>(pairs: I) -> BTreeMap<A, Vec<B>>
where
    A: Ord,
    I: IntoIterator<Item = (A, B)>,
{
    pairs.into_iter().fold(BTreeMap::new(), |mut acc, (a, b)| {
        acc.entry(a).or_default().push(b);
        acc
    })
}

fn hasher_line(event: &Event, participant: Key<Participant>) -> String {
    event.participants().get(participant).to_string()
}

fn write_by_trail<W: Write>(
    out: &mut W,
    event: &Event,
    report: &AllocationReport,
    detail: bool,
) -> io::Result<()> {
    writeln!(out, "Results by trail")?;
    for outcome in &report.time_slots {
        let time_slot = event.time_slots().get(outcome.time_slot);
        writeln!(out, "{time_slot}")?;
        let winners = group_pairs(
            outcome
                .winners
                .iter()
                .map(|&bid| (event.bid(bid).trail(), bid)),
        );
        for fill in outcome
            .fill
            .iter()
            .sorted_by_key(|fill| {
                let trail = event.trails().get(fill.trail);
                (trail.sequence(), trail.id())
            })
        {
            let trail = event.trails().get(fill.trail);
            writeln!(out, "  {trail} ({}/{})", fill.filled, fill.capacity)?;
            let bids = winners.get(&fill.trail).map(Vec::as_slice).unwrap_or_default();
            let name = |bid| event.participants().get(event.bid(bid).participant()).name();
            for &bid in bids.iter().sorted_by_key(|&&bid| name(bid)) {
                let bid = event.bid(bid);
                if detail {
                    let hasher = hasher_line(event, bid.participant());
                    writeln!(out, "    {hasher} [{}]", bid.value())?;
                } else {
                    writeln!(out, "    {}", hasher_line(event, bid.participant()))?;
                }
            }
        }
    }
    Ok(())
}

fn write_by_hasher<W: Write>(out: &mut W, event: &Event) -> io::Result<()> {
    writeln!(out, "Results by hasher")?;
    for participant in event.participants().sorted_by_name() {
        let hasher = event.participants().get(participant);
        if hasher.successful_bid_count() == 0 {
            continue;
        }
        writeln!(out, "{hasher}")?;
        let wins = hasher
            .successful_bids()
            .iter()
            .map(|&bid| event.trails().get(event.bid(bid).trail()))
            .filter_map(|trail| {
                trail
                    .time_slot()
                    .map(|slot| (event.time_slots().get(slot), trail))
            })
            .sorted_by_key(|&(slot, trail)| (slot.sequence(), slot.id(), trail.id()));
        for (slot, trail) in wins {
            writeln!(out, "  {}: {trail}", slot.name())?;
        }
    }
    Ok(())
}

fn write_ranked_bids<W: Write>(
    out: &mut W,
    event: &Event,
    report: &AllocationReport,
) -> io::Result<()> {
    writeln!(out, "Ranked bids")?;
    for outcome in &report.time_slots {
        writeln!(out, "{}", event.time_slots().get(outcome.time_slot))?;
        for &bid in &outcome.ranked {
            let bid = event.bid(bid);
            let status = match bid.status() {
                BidStatus::Pending => "pending".to_owned(),
                BidStatus::Successful => "won".to_owned(),
                BidStatus::Unresolved(LossReason::TrailFull) => "trail full".to_owned(),
                BidStatus::Unresolved(LossReason::AlreadyAttending { trail }) => {
                    format!("already attending trail {}", event.trails().get(trail).id())
                }
            };
            writeln!(
                out,
                "  {:>6} {} -> {}: {status}",
                bid.value(),
                hasher_line(event, bid.participant()),
                event.trails().get(bid.trail()).id(),
            )?;
        }
    }
    Ok(())
}

fn write_hasher_list<W: Write>(
    out: &mut W,
    event: &Event,
    title: &str,
    hashers: &[Key<Participant>],
) -> io::Result<()> {
    writeln!(out, "{title} ({})", hashers.len())?;
    for &participant in hashers {
        writeln!(out, "  {}", hasher_line(event, participant))?;
    }
    Ok(())
}

/// Winners by trail, trails won by hasher, then the hashers who won
/// nothing and those who did not bid.
pub fn write_results<W: Write>(
    out: &mut W,
    event: &Event,
    report: &AllocationReport,
    detail: bool,
) -> io::Result<()> {
    write_by_trail(out, event, report, detail)?;
    writeln!(out)?;
    write_by_hasher(out, event)?;
    writeln!(out)?;
    write_hasher_list(out, event, "Unsuccessful hashers", &event.unsuccessful_participants())?;
    write_hasher_list(out, event, "Hashers without bids", &event.participants_without_bids())?;
    if detail {
        writeln!(out)?;
        write_ranked_bids(out, event, report)?;
    }
    Ok(())
}

pub fn write_explanation<W: Write>(out: &mut W, explanation: &Explanation) -> io::Result<()> {
    writeln!(out, "{}: {}", explanation.participant, explanation.name)?;
    if explanation.bids.is_empty() {
        writeln!(out, "  no bids")?;
    }
    for bid in &explanation.bids {
        let time_slot = bid.time_slot.as_ref().map_or_else(|| "-".to_owned(), ToString::to_string);
        writeln!(out, "  {time_slot} trail {} [{}]: {}", bid.trail, bid.value, bid.verdict)?;
    }
    Ok(())
}
