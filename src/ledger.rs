//! Persisted record of story ids already attempted.
//!
//! The ledger is a JSON array of ids in a single file. It is read at the
//! start of every cycle and rewritten in full at the end of it. An id that
//! made it into the ledger is never fetched again, whether or not its upload
//! went through.
//!
//! A missing file (or missing directory) is the first-run case and reads as
//! an empty ledger.

use crate::error::{MinerError, Result};
use crate::models::StoryId;
use itertools::Itertools;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every id recorded so far.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<HashSet<StoryId>> {
        let ids = self.read_ids().await?;
        debug!(count = ids.len(), "Loaded ledger");
        Ok(ids.into_iter().collect())
    }

    /// Merge `ids` into the persisted ledger and rewrite the file.
    ///
    /// Existing order is kept, new ids go to the end, duplicates are dropped.
    /// The file is written next to the ledger first and then renamed over it.
    ///
    /// # Arguments
    ///
    /// * `ids` - Ids attempted this cycle; may be empty
    ///
    /// # Returns
    ///
    /// The number of ids in the ledger afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`MinerError::Ledger`] if the existing file cannot be read or
    /// the new one cannot be written, and [`MinerError::Decode`] if the
    /// existing file is not a JSON array of ids.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), adding = ids.len()))]
    pub async fn append(&self, ids: &[StoryId]) -> Result<usize> {
        let existing = self.read_ids().await?;
        let merged: Vec<StoryId> = existing
            .into_iter()
            .chain(ids.iter().copied())
            .unique()
            .collect();

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string(&merged)
            .map_err(|e| MinerError::decode("ledger contents", e))?;

        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).await.map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        info!(total = merged.len(), "Ledger saved");
        Ok(merged.len())
    }

    async fn read_ids(&self) -> Result<Vec<StoryId>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ledger yet; starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            MinerError::decode(format!("ledger {}", self.path.display()), e)
        })
    }

    fn io_error(&self, source: std::io::Error) -> MinerError {
        MinerError::Ledger {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("nested/never/seen.json"));
        assert!(ledger.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("data/seen.json"));

        assert_eq!(ledger.append(&[1, 2, 3]).await.unwrap(), 3);
        let seen = ledger.load().await.unwrap();
        assert_eq!(seen, HashSet::from([1, 2, 3]));

        assert_eq!(ledger.append(&[3, 4]).await.unwrap(), 4);
        let seen = ledger.load().await.unwrap();
        assert_eq!(seen, HashSet::from([1, 2, 3, 4]));
    }

    #[tokio::test]
    async fn test_file_is_a_json_array_in_first_seen_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        let ledger = Ledger::new(&path);

        ledger.append(&[9, 4]).await.unwrap();
        ledger.append(&[4, 7, 7]).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "[9,4,7]");
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_append_empty_creates_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        let ledger = Ledger::new(&path);

        assert_eq!(ledger.append(&[]).await.unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "{not json").unwrap();
        let ledger = Ledger::new(&path);

        assert!(matches!(ledger.load().await, Err(MinerError::Decode { .. })));
        assert!(ledger.append(&[1]).await.is_err());
    }

    #[tokio::test]
    async fn test_blank_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "\n").unwrap();
        assert!(Ledger::new(&path).load().await.unwrap().is_empty());
    }
}
