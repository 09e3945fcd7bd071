//! Filesystem-backed checkpoint ledger.

use super::atomic::{is_temp_name, write_atomic};
use super::{
    CheckpointError, CheckpointStatus, RunKey, RunLock, RunManifest, StageCheckpoint,
    StageMetadata, CHECKPOINT_VERSION,
};
use crate::stage::Stage;
use chrono::Utc;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const MANIFEST_FILE: &str = "run.json";
const STAGES_DIR: &str = "stages";

/// Ledger store rooted at a directory holding one sub-directory per run.
///
/// Layout:
///
/// ```text
/// <root>/
///   <run key>.lock
///   <run key>/
///     run.json
///     stages/01-scan-confirm.json
///     stages/02-dependency-resolution.json
/// ```
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$REMODEL_CHECKPOINT_DIR`, else `<local data dir>/remodel/checkpoints`.
    pub fn default_root() -> PathBuf {
        if let Some(dir) = std::env::var_os("REMODEL_CHECKPOINT_DIR") {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("remodel")
            .join("checkpoints")
    }

    /// Store and key addressing an existing ledger directory.
    pub fn for_run_dir(run_dir: &Path) -> Option<(Self, RunKey)> {
        let name = run_dir.file_name()?.to_string_lossy().into_owned();
        let root = run_dir.parent()?.to_path_buf();
        Some((Self::new(root), RunKey::from_dir_name(name)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, key: &RunKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn stages_dir(&self, key: &RunKey) -> PathBuf {
        self.run_dir(key).join(STAGES_DIR)
    }

    fn stage_path(&self, key: &RunKey, stage: Stage) -> PathBuf {
        self.stages_dir(key)
            .join(format!("{:02}-{}.json", stage.position(), stage.name()))
    }

    /// Take the run's exclusive lock.
    pub fn lock(&self, key: &RunKey) -> Result<RunLock, CheckpointError> {
        RunLock::acquire(&self.root.join(format!("{}.lock", key.as_str())))
    }

    /// Whether at least one completed stage is recorded for the run.
    pub fn exists(&self, key: &RunKey) -> bool {
        self.load(key).map(|c| !c.is_empty()).unwrap_or(false)
    }

    /// Completed checkpoints in pipeline order; empty when none exist.
    ///
    /// Temporary files from interrupted writes are ignored, as are records
    /// that fail to parse.
    pub fn load(&self, key: &RunKey) -> Result<Vec<StageCheckpoint>, CheckpointError> {
        let dir = self.stages_dir(key);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CheckpointError::io(&dir, e)),
        };

        let mut checkpoints: Vec<StageCheckpoint> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CheckpointError::io(&dir, e))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if is_temp_name(&file_name) || !file_name.ends_with(".json") {
                continue;
            }

            match read_record(&entry.path()) {
                Ok(checkpoint) => {
                    if checkpoint.version > CHECKPOINT_VERSION {
                        return Err(CheckpointError::UnsupportedVersion {
                            found: checkpoint.version,
                            supported: CHECKPOINT_VERSION,
                        });
                    }
                    if checkpoints.iter().all(|c| c.stage != checkpoint.stage) {
                        checkpoints.push(checkpoint);
                    }
                }
                Err(err) => warn!(error = %err, "Ignoring unreadable checkpoint record"),
            }
        }

        checkpoints.sort_by_key(|c| c.stage.index());
        Ok(checkpoints)
    }

    /// Persist completion of `stage`, replacing any previous record for it.
    pub fn record_stage_complete(
        &self,
        key: &RunKey,
        stage: Stage,
        metadata: StageMetadata,
    ) -> Result<StageCheckpoint, CheckpointError> {
        let checkpoint = StageCheckpoint {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4().to_string(),
            run_key: key.clone(),
            stage,
            status: CheckpointStatus::Completed,
            completed_at: Utc::now(),
            metadata,
        };

        let json = serde_json::to_vec_pretty(&checkpoint)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;
        let path = self.stage_path(key, stage);
        write_atomic(&path, &json).map_err(|e| CheckpointError::io(&path, e))?;

        info!(
            run = %key,
            stage = %stage,
            files = checkpoint.metadata.files.len(),
            "Checkpoint recorded"
        );
        Ok(checkpoint)
    }

    /// Remove the record for `stage` and every later stage.
    ///
    /// Later stages are removed first so an interruption leaves a valid
    /// prefix. Returns the checkpoints that were removed.
    pub fn delete_from(
        &self,
        key: &RunKey,
        stage: Stage,
    ) -> Result<Vec<StageCheckpoint>, CheckpointError> {
        let existing = self.load(key)?;
        let mut removed = Vec::new();

        for checkpoint in existing
            .into_iter()
            .rev()
            .filter(|c| c.stage.index() >= stage.index())
        {
            self.delete_stage(key, checkpoint.stage)?;
            removed.push(checkpoint);
        }

        if !removed.is_empty() {
            debug!(run = %key, from = %stage, count = removed.len(), "Deleted checkpoints");
        }
        removed.reverse();
        Ok(removed)
    }

    /// Remove the record for exactly one stage; missing records are fine.
    pub fn delete_stage(&self, key: &RunKey, stage: Stage) -> Result<(), CheckpointError> {
        let path = self.stage_path(key, stage);
        remove_if_exists(&path)
    }

    /// Remove every record, the manifest and the run directory.
    pub fn delete_all(&self, key: &RunKey) -> Result<(), CheckpointError> {
        let run_dir = self.run_dir(key);
        if !run_dir.exists() {
            return Ok(());
        }

        self.delete_from(key, Stage::ALL[0])?;
        match fs::remove_dir_all(&run_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(CheckpointError::io(&run_dir, e)),
        }

        debug!(run = %key, "Deleted run ledger");
        Ok(())
    }

    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<(), CheckpointError> {
        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;
        let path = self.run_dir(&manifest.run_key).join(MANIFEST_FILE);
        write_atomic(&path, &json).map_err(|e| CheckpointError::io(&path, e))
    }

    pub fn load_manifest(&self, key: &RunKey) -> Result<Option<RunManifest>, CheckpointError> {
        let path = self.run_dir(key).join(MANIFEST_FILE);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                CheckpointError::DeserializationFailed {
                    path,
                    message: e.to_string(),
                }
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CheckpointError::io(&path, e)),
        }
    }
}

fn read_record(path: &Path) -> Result<StageCheckpoint, CheckpointError> {
    let bytes = fs::read(path).map_err(|e| CheckpointError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| CheckpointError::DeserializationFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn remove_if_exists(path: &Path) -> Result<(), CheckpointError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CheckpointError::io(path, e)),
    }
}
