use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("missing input file {0}")]
    MissingFile(PathBuf),
    #[error("failed to read {file}: {source}")]
    Read {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write {file}: {source}")]
    Write {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{file}:{line}: {reason}")]
    Malformed {
        file: PathBuf,
        line: u64,
        reason: String,
    },
}
