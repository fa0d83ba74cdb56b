use std::path::PathBuf;

use thiserror::Error;

use crate::model::{ParticipantId, TimeSlotId, TrailId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: String },
}

/// Failure to tie a trail to a time slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("unknown time slot {0}")]
    UnknownTimeSlot(TimeSlotId),
    #[error("unknown trail {0}")]
    UnknownTrail(TrailId),
    #[error("trail {trail} already has time slot {existing}, refusing {requested}")]
    DuplicateRelation {
        trail: TrailId,
        existing: TimeSlotId,
        requested: TimeSlotId,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BidError {
    #[error("unknown hasher {0}")]
    UnknownParticipant(ParticipantId),
    #[error("unknown trail {0}")]
    UnknownTrail(TrailId),
    #[error("trail {0} does not belong to a time slot")]
    UnlinkedTrail(TrailId),
    #[error("duplicate bid for trail {trail} by hasher {participant}")]
    DuplicateBid {
        participant: ParticipantId,
        trail: TrailId,
    },
}

/// Failure to read, write or replay a persisted fairness draw.
#[derive(Error, Debug)]
pub enum DrawOrderError {
    #[error("io error on draw order file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("draw order file {path} is not valid json: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("draw order was made for dataset {found:?}, not {expected:?}")]
    DatasetMismatch { expected: String, found: String },
    #[error("unsupported draw order version {0}")]
    UnsupportedVersion(u32),
    #[error("draw order is not a permutation: {0}")]
    InvalidPermutation(String),
}
