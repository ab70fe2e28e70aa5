//! Resumable progress for collection runs
//!
//! A checkpoint records every subnet resolved so far together with its
//! result. It is rewritten after each subnet, always through a temporary
//! file in the same directory that is persisted over the old one, so an
//! interrupted write leaves the previous checkpoint intact.

use crate::error::{CollectorError, Result};
use crate::resolution::ResolutionResult;
use crate::subnet::Subnet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Progress of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Identifier of the run, shared with its report files
    pub run_id: String,
    /// Subnets already resolved
    pub processed_subnets: BTreeSet<Subnet>,
    /// Results of the processed subnets
    pub results: BTreeMap<Subnet, ResolutionResult>,
}

impl Checkpoint {
    /// An empty checkpoint for a run
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Self::default()
        }
    }

    /// Whether a subnet was already resolved
    pub fn is_processed(&self, subnet: &Subnet) -> bool {
        self.processed_subnets.contains(subnet)
    }

    /// Record a resolved subnet; a later result for the same subnet replaces the earlier one
    pub fn record(&mut self, result: ResolutionResult) {
        self.processed_subnets.insert(result.subnet);
        self.results.insert(result.subnet, result);
    }

    /// Number of processed subnets
    pub fn len(&self) -> usize {
        self.processed_subnets.len()
    }

    /// Whether nothing has been processed yet
    pub fn is_empty(&self) -> bool {
        self.processed_subnets.is_empty()
    }

    /// Results keyed by subnet
    pub fn results_map(&self) -> HashMap<Subnet, ResolutionResult> {
        self.results
            .iter()
            .map(|(subnet, result)| (*subnet, result.clone()))
            .collect()
    }
}

/// File name of a run's checkpoint
pub fn checkpoint_file_name(prefix: &str, run_id: &str) -> String {
    format!("{prefix}_checkpoint_{run_id}.json")
}

/// Sole reader and writer of one checkpoint file
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    run_id: String,
}

impl CheckpointStore {
    /// Store for a run's checkpoint in `dir`
    pub fn for_run(dir: &Path, prefix: &str, run_id: &str) -> Self {
        Self {
            path: dir.join(checkpoint_file_name(prefix, run_id)),
            run_id: run_id.to_string(),
        }
    }

    /// Most recent checkpoint in `dir` for `prefix`, if any
    ///
    /// Run ids are timestamps, so the lexicographically greatest one is
    /// the newest.
    pub fn find_latest(dir: &Path, prefix: &str) -> Option<Self> {
        let head = format!("{prefix}_checkpoint_");
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot scan {} for checkpoints: {e}", dir.display());
                return None;
            }
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let run_id = name.strip_prefix(&head)?.strip_suffix(".json")?;
                Some(run_id.to_string())
            })
            .max()
            .map(|run_id| Self::for_run(dir, prefix, &run_id))
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run id this store belongs to
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Load the checkpoint, falling back to an empty one
    ///
    /// A missing file is a fresh start. An unreadable or corrupt file is
    /// logged and also treated as a fresh start.
    pub fn load(&self) -> Checkpoint {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no checkpoint at {}", self.path.display());
                return Checkpoint::new(&self.run_id);
            }
            Err(e) => {
                warn!("cannot read checkpoint {}: {e}; starting fresh", self.path.display());
                return Checkpoint::new(&self.run_id);
            }
        };
        match serde_json::from_str::<Checkpoint>(&text) {
            Ok(mut checkpoint) => {
                // Results without a processed marker were never committed
                checkpoint
                    .results
                    .retain(|subnet, _| checkpoint.processed_subnets.contains(subnet));
                checkpoint.run_id.clone_from(&self.run_id);
                checkpoint
            }
            Err(e) => {
                warn!("corrupt checkpoint {}: {e}; starting fresh", self.path.display());
                Checkpoint::new(&self.run_id)
            }
        }
    }

    /// Persist the checkpoint atomically
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let json = serde_json::to_vec_pretty(checkpoint)?;
        let err = |e: std::io::Error| CollectorError::Checkpoint {
            path: self.path.display().to_string(),
            message: e.to_string(),
        };
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(err)?;
        tmp.write_all(&json).map_err(err)?;
        tmp.as_file().sync_all().map_err(err)?;
        tmp.persist(&self.path).map_err(|e| err(e.error))?;
        Ok(())
    }

    /// Remove the checkpoint after a completed run
    pub fn discard(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(CollectorError::Checkpoint {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::SourceKind;
    use tempfile::TempDir;

    fn result(subnet: &str, asn: Option<u32>) -> ResolutionResult {
        ResolutionResult {
            subnet: subnet.parse().unwrap(),
            asn,
            asn_desc: asn.map(|_| "EXAMPLE".to_string()),
            country: asn.map(|_| "BR".to_string()),
            source: asn.map(|_| SourceKind::Cymru),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::for_run(dir.path(), "run", "20240101_000000");
        let cp = store.load();
        assert!(cp.is_empty());
        assert_eq!(cp.run_id, "20240101_000000");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::for_run(dir.path(), "run", "20240101_000000");

        let mut cp = Checkpoint::new(store.run_id());
        cp.record(result("45.164.0.0/16", Some(268592)));
        cp.record(result("203.0.0.0/16", None));
        store.save(&cp).unwrap();

        let loaded = store.load();
        assert_eq!(loaded, cp);
        assert!(loaded.is_processed(&"45.164.0.0/16".parse().unwrap()));
        assert_eq!(loaded.results_map().len(), 2);
        // No temp file left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::for_run(dir.path(), "run", "x");
        fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_previous_checkpoint() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::for_run(dir.path(), "run", "x");
        let mut cp = Checkpoint::new("x");
        cp.record(result("45.164.0.0/16", Some(268592)));
        store.save(&cp).unwrap();

        // A store whose target is a non-empty directory cannot be replaced
        let blocked = CheckpointStore::for_run(dir.path(), "blocked", "x");
        fs::create_dir(blocked.path()).unwrap();
        fs::write(blocked.path().join("keep"), "").unwrap();
        let mut next = cp.clone();
        next.record(result("8.8.0.0/16", Some(15169)));
        let err = blocked.save(&next).unwrap_err();
        assert!(matches!(err, CollectorError::Checkpoint { .. }));

        // The failed write left neither a temp file nor damage behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
        assert_eq!(store.load(), cp);
    }

    #[test]
    fn test_unwritable_directory_is_error() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::for_run(&dir.path().join("missing"), "run", "x");
        assert!(matches!(
            store.save(&Checkpoint::new("x")),
            Err(CollectorError::Checkpoint { .. })
        ));
    }

    #[test]
    fn test_discard() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::for_run(dir.path(), "run", "x");
        store.save(&Checkpoint::new("x")).unwrap();
        assert!(store.path().exists());
        store.discard().unwrap();
        assert!(!store.path().exists());
        // Discarding twice is fine
        store.discard().unwrap();
    }

    #[test]
    fn test_find_latest() {
        let dir = TempDir::new().unwrap();
        assert!(CheckpointStore::find_latest(dir.path(), "run").is_none());

        for id in ["20240101_000000", "20240301_120000", "20240201_000000"] {
            CheckpointStore::for_run(dir.path(), "run", id)
                .save(&Checkpoint::new(id))
                .unwrap();
        }
        CheckpointStore::for_run(dir.path(), "other", "20991231_000000")
            .save(&Checkpoint::new("z"))
            .unwrap();

        let latest = CheckpointStore::find_latest(dir.path(), "run").unwrap();
        assert_eq!(latest.run_id(), "20240301_120000");
    }

    #[test]
    fn test_json_layout() {
        let mut cp = Checkpoint::new("r1");
        cp.record(result("45.164.0.0/16", Some(268592)));
        let value = serde_json::to_value(&cp).unwrap();
        assert_eq!(value["processed_subnets"][0], "45.164.0.0/16");
        assert_eq!(value["results"]["45.164.0.0/16"]["asn"], 268592);
        assert_eq!(value["results"]["45.164.0.0/16"]["source"], "cymru");
    }
}
