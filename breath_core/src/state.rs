//! Persisted exercise selection.
//!
//! The selected exercise survives restarts in `selection.json` under the
//! data directory. Reads take a shared lock; writes go through a locked
//! temp file that is renamed over the original.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SELECTION_FILE: &str = "selection.json";

/// Last exercise the user picked
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SelectionState {
    pub exercise_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SelectionState {
    /// Location of the selection file inside `data_dir`
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(SELECTION_FILE)
    }

    /// Load the selection with a shared lock
    ///
    /// A missing, unreadable or corrupted file yields the default selection.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No selection file at {:?}, starting at 0", path);
            return Ok(Self::default());
        }

        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open selection file {:?}: {}", path, e);
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock selection file {:?}: {}", path, e);
            return Ok(Self::default());
        }
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents);
        file.unlock()?;

        if let Err(e) = read {
            tracing::warn!("Failed to read selection file {:?}: {}", path, e);
            return Ok(Self::default());
        }

        match serde_json::from_str::<SelectionState>(&contents) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!("Corrupted selection file {:?}: {}", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save atomically: locked temp file, fsync, rename
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("{:?} has no parent directory", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        tracing::debug!("Saved selection {} to {:?}", self.exercise_index, path);
        Ok(())
    }

    /// Store `index` as the current selection
    pub fn record(path: &Path, index: usize) -> Result<Self> {
        let state = Self {
            exercise_index: index,
            updated_at: Some(Utc::now()),
        };
        state.save(path)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = SelectionState::path_in(dir.path());

        SelectionState::record(&path, 3).unwrap();
        let loaded = SelectionState::load(&path).unwrap();

        assert_eq!(loaded.exercise_index, 3);
        assert!(loaded.updated_at.is_some());
    }

    #[test]
    fn test_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let state = SelectionState::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(state, SelectionState::default());
    }

    #[test]
    fn test_corrupted_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = SelectionState::path_in(dir.path());
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(SelectionState::load(&path).unwrap().exercise_index, 0);
    }

    #[test]
    fn test_save_creates_dirs_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let path = SelectionState::path_in(&data_dir);

        SelectionState::record(&path, 1).unwrap();
        SelectionState::record(&path, 2).unwrap();

        let names: Vec<_> = std::fs::read_dir(&data_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![SELECTION_FILE.to_string()]);
        assert_eq!(SelectionState::load(&path).unwrap().exercise_index, 2);
    }
}
