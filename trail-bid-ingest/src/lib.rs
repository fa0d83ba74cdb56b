//! Builds an [`Event`] from the comma separated files of an event directory.

pub mod error;
pub mod generate;
mod rows;

use core::num::NonZeroU32;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};
use trail_bid_config::Config;
use trail_bid_engine::{
    BidError, Event, LinkError, LinkOutcome, Participant, ParticipantId, TimeSlot, TimeSlotId,
    Trail, TrailId,
};

pub use crate::error::IngestError;
pub use crate::generate::{generate, Distribution, GenerateSummary};
use crate::rows::{read_rows, Row, RowOutcome};
pub use crate::rows::FileSummary;

pub const TIME_SLOTS_FILE: &str = "timeSlots.txt";
pub const TRAILS_FILE: &str = "trails.txt";
pub const TRAIL_TIMES_FILE: &str = "trailTimes.txt";
pub const CALENDAR_FILE: &str = "calendar.txt";
pub const HASHERS_FILE: &str = "hashers.txt";
pub const BIDS_FILE: &str = "bids.txt";

#[derive(Deserialize)]
struct TimeSlotRow(String, u32, String);

#[derive(Deserialize)]
struct TrailRow(String, u32, String, u32);

#[derive(Deserialize)]
struct CalendarRow(String, String);

#[derive(Deserialize)]
struct HasherRow(u64, u32, String);

#[derive(Deserialize)]
struct BidRow(u64, String, u64);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub files: Vec<FileSummary>,
    /// Bids that took a hasher over the allowance of a time slot.
    pub advisories: usize,
}

impl LoadSummary {
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.files.iter().map(|file| file.skipped).sum()
    }
}

#[derive(Debug)]
pub struct Loaded {
    pub event: Event,
    pub summary: LoadSummary,
}

/// `trailTimes.txt` if present, else `calendar.txt`.
#[must_use]
pub fn calendar_path(event_directory: &Path) -> PathBuf {
    let trail_times = event_directory.join(TRAIL_TIMES_FILE);
    if trail_times.is_file() {
        trail_times
    } else {
        event_directory.join(CALENDAR_FILE)
    }
}

/// Loads time slots, trails, the calendar, hashers and, if present, bids.
///
/// Duplicates and rows naming unknown ids are logged and skipped. A row
/// with a malformed value aborts the load.
pub fn load_event(event_directory: &Path, config: &Config) -> Result<Loaded, IngestError> {
    let mut event = Event::new();
    let mut summary = LoadSummary::default();

    summary.files.push(load_time_slots(&mut event, &event_directory.join(TIME_SLOTS_FILE))?);
    summary.files.push(load_trails(&mut event, &event_directory.join(TRAILS_FILE))?);
    summary.files.push(load_calendar(&mut event, &calendar_path(event_directory))?);
    summary.files.push(load_hashers(&mut event, &event_directory.join(HASHERS_FILE))?);

    let bids = event_directory.join(BIDS_FILE);
    if bids.is_file() {
        let (file, advisories) = load_bids(&mut event, &bids, config.bid_allowance)?;
        summary.files.push(file);
        summary.advisories = advisories;
    } else {
        info!(file = %bids.display(), "no bids file");
    }

    for file in &summary.files {
        info!(file = %file.file, loaded = file.loaded, skipped = file.skipped, "loaded");
    }
    Ok(Loaded { event, summary })
}

fn load_time_slots(event: &mut Event, path: &Path) -> Result<FileSummary, IngestError> {
    read_rows(path, |Row { line, data, .. }: Row<TimeSlotRow>| {
        let TimeSlotRow(id, sequence, name) = data;
        Ok(match event.add_time_slot(TimeSlot::new(TimeSlotId::new(id), sequence, name)) {
            Ok(_) => RowOutcome::Loaded,
            Err(err) => {
                warn!(file = %path.display(), line, %err, "skipping time slot");
                RowOutcome::Skipped
            }
        })
    })
}

fn load_trails(event: &mut Event, path: &Path) -> Result<FileSummary, IngestError> {
    read_rows(path, |Row { line, data, .. }: Row<TrailRow>| {
        let TrailRow(id, sequence, name, capacity) = data;
        let Some(capacity) = NonZeroU32::new(capacity) else {
            return Err(IngestError::Malformed {
                file: path.to_path_buf(),
                line,
                reason: format!("trail {id} has no capacity"),
            });
        };
        Ok(match event.add_trail(Trail::new(TrailId::new(id), sequence, name, capacity)) {
            Ok(_) => RowOutcome::Loaded,
            Err(err) => {
                warn!(file = %path.display(), line, %err, "skipping trail");
                RowOutcome::Skipped
            }
        })
    })
}

fn load_calendar(event: &mut Event, path: &Path) -> Result<FileSummary, IngestError> {
    read_rows(path, |Row { line, first, data }: Row<CalendarRow>| {
        let time_slot = TimeSlotId::new(data.0);
        let trail = TrailId::new(data.1);
        Ok(match event.link(&time_slot, &trail) {
            Ok(LinkOutcome::Linked) => RowOutcome::Loaded,
            Ok(LinkOutcome::AlreadyLinked) => {
                debug!(file = %path.display(), line, %trail, %time_slot, "repeated calendar entry");
                RowOutcome::Skipped
            }
            Err(LinkError::UnknownTimeSlot(_) | LinkError::UnknownTrail(_))
                if first
                    && event.time_slots().key_of(&time_slot).is_none()
                    && event.trails().key_of(&trail).is_none() =>
            {
                RowOutcome::Ignored
            }
            Err(err) => {
                warn!(file = %path.display(), line, %err, "skipping calendar entry");
                RowOutcome::Skipped
            }
        })
    })
}

fn load_hashers(event: &mut Event, path: &Path) -> Result<FileSummary, IngestError> {
    read_rows(path, |Row { line, data, .. }: Row<HasherRow>| {
        let HasherRow(id, sequence, name) = data;
        Ok(match event.add_participant(Participant::new(ParticipantId(id), sequence, name)) {
            Ok(_) => RowOutcome::Loaded,
            Err(err) => {
                warn!(file = %path.display(), line, %err, "skipping hasher");
                RowOutcome::Skipped
            }
        })
    })
}

fn load_bids(
    event: &mut Event,
    path: &Path,
    allowance: u64,
) -> Result<(FileSummary, usize), IngestError> {
    let mut advisories = 0;
    let summary = read_rows(path, |Row { line, first, data }: Row<BidRow>| {
        let BidRow(hasher, trail, value) = data;
        let hasher = ParticipantId(hasher);
        let trail = TrailId::new(trail);
        Ok(match event.add_bid(hasher, &trail, value, allowance) {
            Ok(receipt) => {
                if receipt.allowance_exceeded {
                    advisories += 1;
                }
                RowOutcome::Loaded
            }
            Err(BidError::UnknownParticipant(_) | BidError::UnknownTrail(_))
                if first
                    && event.participants().key_of(&hasher).is_none()
                    && event.trails().key_of(&trail).is_none() =>
            {
                RowOutcome::Ignored
            }
            Err(err) => {
                warn!(file = %path.display(), line, %err, "skipping bid");
                RowOutcome::Skipped
            }
        })
    })?;
    Ok((summary, advisories))
}
