//! Synthetic hashers and bids for trying out an event directory.

use core::fmt;
use core::str::FromStr;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::IngestError;
use crate::rows::{read_rows, Row, RowOutcome};
use crate::{calendar_path, BIDS_FILE, HASHERS_FILE};

/// How the bid allowance is spread over the trails of a time slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distribution {
    /// One allowance-sized bid that drifts a unit at a time towards higher
    /// trails as hashers are added.
    Dribble,
    /// Allowance pooled on the lowest trail and levelled a unit per hasher
    /// towards its neighbours.
    Pool,
    /// A random subset of trails, with the allowance split randomly.
    #[default]
    Random,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dribble => "dribble",
            Self::Pool => "pool",
            Self::Random => "random",
        })
    }
}

impl FromStr for Distribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dribble" => Ok(Self::Dribble),
            "pool" => Ok(Self::Pool),
            "random" => Ok(Self::Random),
            other => Err(format!(
                "unknown distribution {other:?}, expected dribble, pool or random"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateSummary {
    pub hashers: u64,
    pub time_slots: usize,
    pub bids: usize,
}

#[derive(Deserialize)]
struct CalendarRow(String, u64);

/// Trails of each time slot in calendar order, trail ids ascending.
fn read_calendar(path: &Path) -> Result<Vec<(String, Vec<u64>)>, IngestError> {
    let mut time_slots: Vec<(String, Vec<u64>)> = Vec::new();
    read_rows(path, |Row { data, .. }: Row<CalendarRow>| {
        let CalendarRow(time_slot, trail) = data;
        match time_slots.iter_mut().find(|(id, _)| *id == time_slot) {
            Some((_, trails)) => trails.push(trail),
            None => time_slots.push((time_slot, vec![trail])),
        }
        Ok(RowOutcome::Loaded)
    })?;
    for (_, trails) in &mut time_slots {
        trails.sort_unstable();
        trails.dedup();
    }
    Ok(time_slots)
}

/// Bid values of every hasher, one entry per trail of the slot.
fn dribble(hashers: u64, trails: usize, allowance: u64) -> Vec<Vec<u64>> {
    let mut bids = vec![0; trails];
    bids[0] = allowance;
    let mut span = 0;
    let mut rows = Vec::new();
    for _ in 0..hashers {
        let mut span_min = 0;
        for mut trail in 0..=span {
            if bids[span_min] == 0 && span_min + 1 < trails {
                span_min += 1;
                trail = span_min;
            }
            if bids[span_min] > 0 {
                bids[span_min] -= 1;
                bids[trail] += 1;
            }
        }
        rows.push(bids.clone());
        span = (span + 1) % trails;
    }
    rows
}

fn pool(hashers: u64, trails: usize, allowance: u64) -> Vec<Vec<u64>> {
    let mut bids = vec![0; trails];
    bids[0] = allowance;
    let mut rows = Vec::new();
    for _ in 0..hashers {
        for trail in 0..trails - 1 {
            if bids[trail] >= bids[trail + 1] + 2 {
                bids[trail] -= 1;
                bids[trail + 1] += 1;
            }
        }
        rows.push(bids.clone());
    }
    rows
}

fn random<R: Rng + ?Sized>(
    hashers: u64,
    trails: usize,
    allowance: u64,
    rng: &mut R,
) -> Vec<Vec<u64>> {
    let mut rows = Vec::new();
    for _ in 0..hashers {
        let mut bids = vec![0; trails];
        let mut chosen: Vec<usize> = (0..trails).collect();
        chosen.shuffle(rng);
        chosen.truncate(rng.gen_range(1..=trails));

        // keep at least one unit for every trail still to come
        let mut reserve = (trails - 1) as u64;
        let mut balance = allowance;
        let last = chosen.len() - 1;
        for (position, &trail) in chosen.iter().enumerate() {
            let value = if position == last {
                balance
            } else {
                let room = balance.saturating_sub(reserve).max(1);
                rng.gen_range(1..=room).min(balance)
            };
            balance -= value;
            reserve = reserve.saturating_sub(1);
            bids[trail] = value;
        }
        rows.push(bids);
    }
    rows
}

fn write_err(file: &Path) -> impl Fn(csv::Error) -> IngestError + '_ {
    move |source| IngestError::Write {
        file: file.to_path_buf(),
        source,
    }
}

/// Writes `hashers.txt` and `bids.txt` for `hashers` synthetic hashers,
/// bidding over the trails of every time slot in the calendar. Trail ids
/// must be numeric.
pub fn generate<R: Rng + ?Sized>(
    event_directory: &Path,
    hashers: u64,
    distribution: Distribution,
    allowance: u64,
    rng: &mut R,
) -> Result<GenerateSummary, IngestError> {
    let time_slots = read_calendar(&calendar_path(event_directory))?;

    let hashers_path = event_directory.join(HASHERS_FILE);
    let mut writer = csv::Writer::from_path(&hashers_path).map_err(write_err(&hashers_path))?;
    writer
        .write_record(["hasherID", "sequence", "hasherName"])
        .map_err(write_err(&hashers_path))?;
    for id in 1..=hashers {
        writer
            .write_record([id.to_string(), id.to_string(), format!("Hasher {id:04}")])
            .map_err(write_err(&hashers_path))?;
    }
    writer.flush().map_err(|source| IngestError::Io {
        file: hashers_path.clone(),
        source,
    })?;

    let bids_path = event_directory.join(BIDS_FILE);
    let mut writer = csv::Writer::from_path(&bids_path).map_err(write_err(&bids_path))?;
    writer
        .write_record(["hasherID", "trailID", "bidAmount"])
        .map_err(write_err(&bids_path))?;
    let mut bids = 0;
    for (time_slot, trails) in &time_slots {
        let rows = match distribution {
            Distribution::Dribble => dribble(hashers, trails.len(), allowance),
            Distribution::Pool => pool(hashers, trails.len(), allowance),
            Distribution::Random => random(hashers, trails.len(), allowance, rng),
        };
        for (hasher, values) in (1..=hashers).zip(rows) {
            debug!(%time_slot, hasher, ?values, "generated bids");
            for (trail, value) in trails.iter().zip(values).filter(|&(_, value)| value != 0) {
                writer
                    .write_record([hasher.to_string(), trail.to_string(), value.to_string()])
                    .map_err(write_err(&bids_path))?;
                bids += 1;
            }
        }
    }
    writer.flush().map_err(|source| IngestError::Io {
        file: bids_path.clone(),
        source,
    })?;

    info!(hashers, time_slots = time_slots.len(), bids, %distribution, "generated event data");
    Ok(GenerateSummary {
        hashers,
        time_slots: time_slots.len(),
        bids,
    })
}
