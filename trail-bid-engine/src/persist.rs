use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DrawOrderError;
use crate::model::ParticipantId;
use crate::rank::DrawOrder;

const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct DrawOrderRecord {
    version: u32,
    dataset: String,
    seed: Option<u64>,
    entries: Vec<DrawEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DrawEntry {
    participant: ParticipantId,
    order: u32,
}

/// Versioned JSON file holding the fairness draw of one dataset.
#[derive(Debug, Clone)]
pub struct DrawOrderStore {
    path: PathBuf,
    dataset: String,
}

impl DrawOrderStore {
    pub fn new(path: impl Into<PathBuf>, dataset: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dataset: dataset.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// `Ok(None)` if nothing has been persisted yet.
    pub fn load(&self) -> Result<Option<DrawOrder>, DrawOrderError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DrawOrderError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let record: DrawOrderRecord =
            serde_json::from_str(&contents).map_err(|source| DrawOrderError::Json {
                path: self.path.clone(),
                source,
            })?;
        if record.version != VERSION {
            return Err(DrawOrderError::UnsupportedVersion(record.version));
        }
        if record.dataset != self.dataset {
            return Err(DrawOrderError::DatasetMismatch {
                expected: self.dataset.clone(),
                found: record.dataset,
            });
        }
        let draw = DrawOrder::from_entries(
            record
                .entries
                .into_iter()
                .map(|entry| (entry.participant, entry.order)),
            record.seed,
        )?;
        info!(path = %self.path.display(), entries = draw.len(), "loaded draw order");
        Ok(Some(draw))
    }

    pub fn save(&self, draw: &DrawOrder) -> Result<(), DrawOrderError> {
        let record = DrawOrderRecord {
            version: VERSION,
            dataset: self.dataset.clone(),
            seed: draw.seed(),
            entries: draw
                .iter()
                .map(|(participant, order)| DrawEntry { participant, order })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&record).map_err(|source| DrawOrderError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|source| DrawOrderError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), entries = draw.len(), "saved draw order");
        Ok(())
    }

    /// Deletes the persisted draw so the next run draws afresh. Returns
    /// whether there was anything to delete.
    pub fn remove(&self) -> Result<bool, DrawOrderError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "removed draw order");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(DrawOrderError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::DrawOrderStore;
    use crate::error::DrawOrderError;
    use crate::model::ParticipantId;
    use crate::rank::DrawOrder;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DrawOrderStore::new(dir.path().join("order.json"), "event");
        assert!(store.load().unwrap().is_none());
        assert!(!store.remove().unwrap());
    }

    #[test]
    fn save_then_load_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = DrawOrderStore::new(dir.path().join("order.json"), "event");
        let draw = DrawOrder::seeded((1..=20).map(ParticipantId), 99);
        store.save(&draw).unwrap();
        assert_eq!(store.load().unwrap(), Some(draw));
        assert!(store.remove().unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn record_is_bound_to_its_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.json");
        DrawOrderStore::new(&path, "spring")
            .save(&DrawOrder::seeded([ParticipantId(1)], 1))
            .unwrap();
        let err = DrawOrderStore::new(&path, "autumn").load().unwrap_err();
        assert!(matches!(
            err,
            DrawOrderError::DatasetMismatch { ref expected, ref found }
                if expected == "autumn" && found == "spring"
        ));
    }

    #[test]
    fn rejects_other_versions_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.json");
        let store = DrawOrderStore::new(&path, "event");

        fs::write(&path, r#"{"version":2,"dataset":"event","seed":null,"entries":[]}"#).unwrap();
        assert!(matches!(store.load(), Err(DrawOrderError::UnsupportedVersion(2))));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(store.load(), Err(DrawOrderError::Json { .. })));

        fs::write(
            &path,
            r#"{"version":1,"dataset":"event","seed":null,"entries":[{"participant":4,"order":2}]}"#,
        )
        .unwrap();
        assert!(matches!(store.load(), Err(DrawOrderError::InvalidPermutation(_))));
    }
}
