//! The fixed migration pipeline.
//!
//! Stages are a closed, totally ordered set. Each stage turns the inventory,
//! the dependency report and the planned outputs of earlier stages into a
//! [`StagePlan`]; the [`StageExecutor`] materializes a plan on disk.

mod assembly;
pub mod error;
mod executor;
mod plan;

pub use error::{StageError, UnknownStageError};
pub use executor::{StageExecutor, StageOutput};
pub use plan::{plan_pipeline, GenerationTask, PlanContext, StagePlan, WorkItem};
pub(crate) use plan::plan_stage;

use crate::inventory::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One unit of the pipeline, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    ScanConfirm,
    DependencyResolution,
    DataModel,
    Persistence,
    SharedServices,
    ApiLayer,
    Workers,
    Assembly,
}

impl Stage {
    /// Every stage, in pipeline order.
    pub const ALL: [Stage; 8] = [
        Stage::ScanConfirm,
        Stage::DependencyResolution,
        Stage::DataModel,
        Stage::Persistence,
        Stage::SharedServices,
        Stage::ApiLayer,
        Stage::Workers,
        Stage::Assembly,
    ];

    /// Zero-based position in the pipeline.
    pub fn index(self) -> usize {
        self as usize
    }

    /// One-based position, as shown to users and used in ledger file names.
    pub fn position(self) -> usize {
        self.index() + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ScanConfirm => "scan-confirm",
            Self::DependencyResolution => "dependency-resolution",
            Self::DataModel => "data-model",
            Self::Persistence => "persistence",
            Self::SharedServices => "shared-services",
            Self::ApiLayer => "api-layer",
            Self::Workers => "workers",
            Self::Assembly => "assembly",
        }
    }

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Target module written by a code-generating stage.
    pub fn module(self) -> Option<&'static str> {
        match self {
            Self::DataModel => Some("domain"),
            Self::Persistence => Some("persistence"),
            Self::SharedServices => Some("shared"),
            Self::ApiLayer => Some("api"),
            Self::Workers => Some("worker"),
            _ => None,
        }
    }

    /// Inventory categories a code-generating stage transforms.
    pub fn artifact_kinds(self) -> &'static [ArtifactKind] {
        match self {
            Self::DataModel => &[ArtifactKind::Entity],
            Self::Persistence => &[ArtifactKind::Repository],
            Self::SharedServices => &[ArtifactKind::Service],
            Self::ApiLayer => &[ArtifactKind::Controller],
            Self::Workers => &[ArtifactKind::ScheduledJob, ArtifactKind::EventListener],
            _ => &[],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = UnknownStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|stage| stage.name() == wanted)
            .ok_or_else(|| UnknownStageError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_total_and_indexed() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
            assert_eq!(stage.position(), i + 1);
        }
        assert!(Stage::ScanConfirm < Stage::Assembly);
        assert_eq!(Stage::Workers.next(), Some(Stage::Assembly));
        assert_eq!(Stage::Assembly.next(), None);
    }

    #[test]
    fn names_parse_back() {
        for stage in Stage::ALL {
            assert_eq!(stage.name().parse::<Stage>().unwrap(), stage);
        }
        assert_eq!("API_LAYER".parse::<Stage>().unwrap(), Stage::ApiLayer);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "deploy".parse::<Stage>().unwrap_err();
        assert_eq!(err.0, "deploy");
        assert!(err.to_string().contains("scan-confirm"));
    }

    #[test]
    fn serde_uses_stage_names() {
        assert_eq!(
            serde_json::to_string(&Stage::SharedServices).unwrap(),
            "\"shared-services\""
        );
    }
}
