//! Undoing what a run wrote.
//!
//! Rollback works from the run ledger alone: the manifest says where the
//! output lives and each checkpoint lists the files its stage wrote. The
//! source project is never touched.

pub mod error;

pub use error::RollbackError;

use crate::checkpoint::{CheckpointStore, RunKey, RunManifest, StageCheckpoint};
use crate::config::paths_overlap;
use crate::stage::Stage;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path};
use tracing::{info, warn};

/// What a rollback removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RollbackSummary {
    /// Stages whose checkpoints were removed, in pipeline order
    pub stages: Vec<Stage>,
    /// Output files deleted
    pub files_removed: usize,
}

/// Roll a run back to just before `stage_name` executed.
///
/// Stages are undone latest first: a stage's files are deleted, then its
/// checkpoint. Checkpoints of earlier stages are never touched, so the run
/// resumes at `stage_name`.
pub fn rollback_to_stage(
    checkpoint_dir: &Path,
    stage_name: &str,
) -> Result<RollbackSummary, RollbackError> {
    let target: Stage = stage_name.parse()?;
    if !checkpoint_dir.exists() {
        return Ok(RollbackSummary::default());
    }
    let (store, key) = CheckpointStore::for_run_dir(checkpoint_dir)
        .ok_or_else(|| RollbackError::InvalidCheckpointDir(checkpoint_dir.to_path_buf()))?;
    let _lock = store.lock(&key)?;

    let checkpoints: Vec<_> = store
        .load(&key)?
        .into_iter()
        .filter(|c| c.stage >= target)
        .collect();
    if checkpoints.is_empty() {
        info!(run = %key, stage = %target, "Nothing to roll back");
        return Ok(RollbackSummary::default());
    }

    let manifest = store
        .load_manifest(&key)?
        .ok_or_else(|| RollbackError::MissingManifest(checkpoint_dir.to_path_buf()))?;

    let summary = discard_stages(&store, &key, &checkpoints, &manifest)?;
    store.delete_from(&key, target)?;

    info!(
        run = %key,
        stage = %target,
        stages = summary.stages.len(),
        files = summary.files_removed,
        "Rolled back to stage"
    );
    Ok(summary)
}

/// Delete the whole output tree and the run ledger.
///
/// Succeeds as a no-op when the ledger is already gone.
pub fn rollback_all(checkpoint_dir: &Path) -> Result<RollbackSummary, RollbackError> {
    if !checkpoint_dir.exists() {
        return Ok(RollbackSummary::default());
    }
    let (store, key) = CheckpointStore::for_run_dir(checkpoint_dir)
        .ok_or_else(|| RollbackError::InvalidCheckpointDir(checkpoint_dir.to_path_buf()))?;
    let _lock = store.lock(&key)?;

    let stages: Vec<Stage> = store.load(&key)?.iter().map(|c| c.stage).collect();

    if let Some(manifest) = store.load_manifest(&key)? {
        ensure_safe_output(&manifest)?;
        match fs::remove_dir_all(&manifest.output_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(RollbackError::Io {
                    path: manifest.output_path.clone(),
                    source,
                })
            }
        }
    } else if !stages.is_empty() {
        return Err(RollbackError::MissingManifest(checkpoint_dir.to_path_buf()));
    }

    store.delete_all(&key)?;
    info!(run = %key, stages = stages.len(), "Rolled back entire run");

    Ok(RollbackSummary {
        stages,
        files_removed: 0,
    })
}

/// Delete the files `checkpoints` recorded under the manifest's output
/// directory, latest stage first, dropping each stage's record once its files
/// are gone. The caller holds the run lock.
pub(crate) fn discard_stages(
    store: &CheckpointStore,
    key: &RunKey,
    checkpoints: &[StageCheckpoint],
    manifest: &RunManifest,
) -> Result<RollbackSummary, RollbackError> {
    ensure_safe_output(manifest)?;

    let mut summary = RollbackSummary::default();
    for checkpoint in checkpoints.iter().rev() {
        for file in checkpoint.metadata.files.iter().rev() {
            if !is_contained(&file.path) {
                warn!(file = %file.path, "Skipping recorded path outside the output directory");
                continue;
            }
            let path = manifest.output_path.join(&file.path);
            if remove_file(&path)? {
                summary.files_removed += 1;
            }
            prune_empty_parents(&path, &manifest.output_path);
        }
        store.delete_stage(key, checkpoint.stage)?;
        summary.stages.push(checkpoint.stage);
    }
    summary.stages.reverse();
    Ok(summary)
}

fn ensure_safe_output(manifest: &RunManifest) -> Result<(), RollbackError> {
    if paths_overlap(&manifest.output_path, &manifest.source_path) {
        return Err(RollbackError::UnsafeOutputPath {
            output: manifest.output_path.clone(),
        });
    }
    Ok(())
}

/// Relative path that cannot escape its base directory.
fn is_contained(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Delete one file; `false` when it was already gone.
fn remove_file(path: &Path) -> Result<bool, RollbackError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(RollbackError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Remove directories left empty by deleting `file`, stopping at `root`.
fn prune_empty_parents(file: &Path, root: &Path) {
    let mut current = file.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        // Fails on non-empty directories, which is where we stop.
        if fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}
