//! Durable per-stage checkpoints for migration runs.
//!
//! Each run owns a ledger directory named by its [`RunKey`], derived from the
//! source path alone, so re-invoking the tool against the same source finds
//! the same ledger. The ledger holds a `run.json` manifest and one record
//! per completed stage; records are only ever written via tmp file + rename.

pub(crate) mod atomic;
pub mod error;
mod lock;
mod store;

pub use error::CheckpointError;
pub use lock::RunLock;
pub use store::CheckpointStore;

use crate::deps::DependencyReport;
use crate::inventory::ProjectInventory;
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Stable identity of a run's ledger, derived from the source path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunKey(String);

impl RunKey {
    /// Key for `source`: `<sanitized dir name>-<16 hex chars of sha256(absolute path)>`.
    ///
    /// The path is canonicalized when possible so `./svc` and `/abs/svc`
    /// share a ledger.
    pub fn for_source(source: &Path) -> Self {
        let absolute = std::fs::canonicalize(source).unwrap_or_else(|_| {
            if source.is_absolute() {
                source.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(source))
                    .unwrap_or_else(|_| source.to_path_buf())
            }
        });

        let digest = sha256_hex(absolute.to_string_lossy().as_bytes());
        let stem: String = absolute
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        let stem = if stem.is_empty() {
            "project".to_string()
        } else {
            stem
        };

        Self(format!("{}-{}", stem, &digest[..16]))
    }

    /// Key of an existing ledger directory (its final path component).
    pub fn from_dir_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One file a stage wrote, relative to the output directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

impl GeneratedFile {
    pub fn from_contents(path: impl Into<String>, contents: &[u8]) -> Self {
        Self {
            path: path.into(),
            sha256: sha256_hex(contents),
            bytes: contents.len() as u64,
        }
    }

    /// Whether the file under `output` still has the recorded contents.
    pub fn matches_on_disk(&self, output: &Path) -> bool {
        std::fs::read(output.join(&self.path))
            .map(|contents| sha256_hex(&contents) == self.sha256)
            .unwrap_or(false)
    }
}

/// Stage-specific data recorded alongside completion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMetadata {
    /// Files written by the stage, in write order
    pub files: Vec<GeneratedFile>,
    /// Code-generation requests the stage issued
    pub generation_calls: usize,
    /// Fingerprint of the inventory and dependency report the stage consumed
    pub input_fingerprint: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Completed,
}

/// Durable proof that one stage of a run completed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageCheckpoint {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    pub run_key: RunKey,

    pub stage: Stage,

    pub status: CheckpointStatus,

    /// When the stage completed
    pub completed_at: DateTime<Utc>,

    pub metadata: StageMetadata,
}

impl StageCheckpoint {
    /// Recorded files that are missing or changed under `output`.
    pub fn stale_files<'a>(&'a self, output: &Path) -> Vec<&'a GeneratedFile> {
        self.metadata
            .files
            .iter()
            .filter(|f| !f.matches_on_disk(output))
            .collect()
    }
}

/// Run-level facts needed to roll back without the original config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub version: u32,
    pub run_key: RunKey,
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub tool_version: String,
    pub created_at: DateTime<Utc>,
}

/// Fingerprint of a run's inputs.
pub fn input_fingerprint(
    inventory: &ProjectInventory,
    report: &DependencyReport,
) -> Result<String, CheckpointError> {
    let bytes = serde_json::to_vec(&(inventory, report))
        .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;
    Ok(sha256_hex(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn run_key_is_deterministic_and_path_specific() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("orders service");
        let b = dir.path().join("billing");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();

        assert_eq!(RunKey::for_source(&a), RunKey::for_source(&a));
        assert_ne!(RunKey::for_source(&a), RunKey::for_source(&b));
        assert!(RunKey::for_source(&a).as_str().starts_with("orders-service-"));
    }

    #[test]
    fn generated_file_detects_changes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("A.java"), b"class A {}").unwrap();
        let file = GeneratedFile::from_contents("A.java", b"class A {}");

        assert!(file.matches_on_disk(dir.path()));
        std::fs::write(dir.path().join("A.java"), b"class B {}").unwrap();
        assert!(!file.matches_on_disk(dir.path()));
        std::fs::remove_file(dir.path().join("A.java")).unwrap();
        assert!(!file.matches_on_disk(dir.path()));
    }

    #[test]
    fn sha256_matches_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
