//! Remodel: a checkpointed, resumable migration engine
//!
//! Remodel restructures a monolithic JVM service into a fixed multi-module
//! layout. A run scans the source project, classifies its dependencies and
//! then drives an external code generator through eight fixed stages. Every
//! completed stage is checkpointed, so an interrupted run resumes without
//! paying for finished work again, and any run can be rolled back to an
//! earlier stage or torn down entirely.
//!
//! # Core Concepts
//!
//! - **Scanner**: read-only walk producing a [`ProjectInventory`]
//! - **Classifier**: pure partition of dependencies into a [`DependencyReport`]
//! - **Stages**: the fixed pipeline, planned purely and executed by a [`StageExecutor`]
//! - **Checkpoints**: one durable record per completed stage in a [`CheckpointStore`]
//! - **Migrator**: the state machine tying the above together
//!
//! # Example
//!
//! ```rust,no_run
//! use remodel::{CodeGenerator, GeneratedSource, GenerationError, Migrator, RunConfig, TransformRequest};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Backend;
//!
//! #[async_trait]
//! impl CodeGenerator for Backend {
//!     async fn validate_credentials(&self) -> Result<(), GenerationError> {
//!         Ok(())
//!     }
//!
//!     async fn transform(&self, request: &TransformRequest) -> Result<GeneratedSource, GenerationError> {
//!         Ok(GeneratedSource::new(request.source.clone()))
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::builder()
//!     .source("./legacy-shop")
//!     .output("./shop-modular")
//!     .resume(true)
//!     .build()?;
//!
//! let mut migrator = Migrator::new(config, Arc::new(Backend));
//! let report = migrator.run().await?;
//! println!("{} generation calls", report.generation_calls());
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod deps;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod migrator;
pub mod rollback;
pub mod scanner;
pub mod stage;

// Re-export commonly used types
pub use ai::{CodeGenerator, GeneratedSource, GenerationError, RetryPolicy, TransformRequest};
pub use checkpoint::{CheckpointError, CheckpointStore, RunKey, StageCheckpoint};
pub use config::{ConfigError, ExecutionSettings, RunConfig, RunConfigBuilder};
pub use crate::core::{MigrationState, RunHistory, StateTransition};
pub use deps::{classify, CompatibilityTable, DependencyClassifier, DependencyReport, Verdict};
pub use error::MigrationError;
pub use inventory::{Artifact, ArtifactKind, BuildSystem, Dependency, ProjectInventory};
pub use migrator::{
    AutoConfirm, BuildVerifier, Confirmation, MigrationReport, Migrator, StageOutcome, StageStatus,
};
pub use rollback::{rollback_all, rollback_to_stage, RollbackError, RollbackSummary};
pub use scanner::{scan, ScanError};
pub use stage::{plan_pipeline, Stage, StageError, StageExecutor, StagePlan};
