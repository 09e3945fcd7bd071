//! Run results.

use crate::checkpoint::RunKey;
use crate::core::MigrationState;
use crate::deps::DependencyReport;
use crate::inventory::InventoryCounts;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Ran and was checkpointed in this invocation
    Executed,
    /// Already checkpointed; outputs verified and reused
    Skipped,
    /// Dry run: what would have been produced
    Planned,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
    /// Output files, relative to the output directory
    pub files: Vec<String>,
    pub generation_calls: usize,
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub run_key: RunKey,
    pub state: MigrationState,
    pub dry_run: bool,
    pub inventory: InventoryCounts,
    pub dependencies: DependencyReport,
    pub stages: Vec<StageOutcome>,
    /// `None` when verification was skipped or no verifier is attached
    pub build_verified: Option<bool>,
}

impl MigrationReport {
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|o| o.stage == stage)
    }

    /// Generation requests issued by this invocation.
    pub fn generation_calls(&self) -> usize {
        self.stages
            .iter()
            .filter(|o| o.status == StageStatus::Executed)
            .map(|o| o.generation_calls)
            .sum()
    }

    pub fn stages_with(&self, status: StageStatus) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.stage)
            .collect()
    }
}
