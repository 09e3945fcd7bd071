//! Run orchestration.
//!
//! The [`Migrator`] drives one run through its states: obtain the inventory
//! and dependency report, reconcile the checkpoint ledger, then execute every
//! stage that is not already complete, checkpointing each one as soon as its
//! outputs are on disk.

mod collaborators;
mod report;

pub use collaborators::{AutoConfirm, BuildVerifier, Confirmation};
pub use report::{MigrationReport, StageOutcome, StageStatus};

use crate::ai::{CodeGenerator, GenerationError};
use crate::checkpoint::{
    input_fingerprint, CheckpointStore, RunKey, RunManifest, StageCheckpoint, StageMetadata,
    CHECKPOINT_VERSION,
};
use crate::config::RunConfig;
use crate::core::{MigrationState, RunHistory, StateTransition};
use crate::deps::{CompatibilityTable, DependencyClassifier, DependencyReport};
use crate::error::MigrationError;
use crate::inventory::ProjectInventory;
use crate::rollback;
use crate::scanner::{self, ScanError};
use crate::stage::{plan_stage, PlanContext, Stage, StageError, StageExecutor, StagePlan};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Executes migration runs for one source project.
pub struct Migrator {
    config: RunConfig,
    generator: Arc<dyn CodeGenerator>,
    classifier: DependencyClassifier,
    store: CheckpointStore,
    key: RunKey,
    confirmer: Arc<dyn Confirmation>,
    verifier: Option<Arc<dyn BuildVerifier>>,
    cancel: CancellationToken,
    state: MigrationState,
    history: RunHistory,
}

impl Migrator {
    pub fn new(config: RunConfig, generator: Arc<dyn CodeGenerator>) -> Self {
        let store = CheckpointStore::new(config.checkpoint_root());
        let key = RunKey::for_source(config.source());
        Self {
            config,
            generator,
            classifier: DependencyClassifier::default(),
            store,
            key,
            confirmer: Arc::new(AutoConfirm),
            verifier: None,
            cancel: CancellationToken::new(),
            state: MigrationState::NotStarted,
            history: RunHistory::new(),
        }
    }

    /// Prompt through `confirmer` when the config is interactive.
    pub fn with_confirmation(mut self, confirmer: Arc<dyn Confirmation>) -> Self {
        self.confirmer = confirmer;
        self
    }

    /// Verify the output tree after the final stage unless skipped.
    pub fn with_verifier(mut self, verifier: Arc<dyn BuildVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Classify dependencies against `table` instead of the built-in one.
    pub fn with_compatibility_table(mut self, table: CompatibilityTable) -> Self {
        self.classifier = DependencyClassifier::new(table);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the run: no new generation calls are issued and
    /// in-flight ones are abandoned.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run_key(&self) -> &RunKey {
        &self.key
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    /// Ledger directory for this source path.
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.store.run_dir(&self.key)
    }

    /// Whether any completed stage is recorded for this source path.
    pub fn has_checkpoint(&self) -> bool {
        self.store.exists(&self.key)
    }

    /// Execute one run to a final state.
    pub async fn run(&mut self) -> Result<MigrationReport, MigrationError> {
        self.state = MigrationState::NotStarted;
        self.history = RunHistory::new();

        info!(
            source = %self.config.source().display(),
            output = %self.config.output().display(),
            run = %self.key,
            dry_run = self.config.dry_run(),
            resume = self.config.resume(),
            "Starting migration"
        );

        let result = self.execute().await;
        if let Err(err) = &result {
            let next = match err {
                MigrationError::Aborted { .. } | MigrationError::Cancelled { .. } => {
                    MigrationState::Aborted
                }
                other => MigrationState::Failed(other.stage().or(self.state.stage())),
            };
            self.transition(next);
            error!(state = %self.state, error = %err, "Migration stopped");
        }
        result
    }

    async fn execute(&mut self) -> Result<MigrationReport, MigrationError> {
        let dry_run = self.config.dry_run();
        let _lock = if dry_run {
            None
        } else {
            Some(self.store.lock(&self.key)?)
        };

        let (inventory, report) = self.load_inputs().await?;
        let fingerprint = input_fingerprint(&inventory, &report)?;

        if !dry_run {
            if !self.config.resume() {
                self.discard_previous_run()?;
            }
            self.write_manifest()?;
        }

        let trusted = if self.config.resume() {
            self.verified_checkpoints(&fingerprint, dry_run)?
        } else {
            HashMap::new()
        };

        let plans = self.plan(&inventory, &report)?;
        let pending: Vec<&StagePlan> = plans
            .iter()
            .filter(|p| !trusted.contains_key(&p.stage))
            .collect();

        if !dry_run {
            if let Some(first) = pending.iter().find(|p| p.generation_calls() > 0) {
                self.check_credentials(first.stage).await?;
            }
        }

        let executor = StageExecutor::new(
            Arc::clone(&self.generator),
            self.config.execution().clone(),
            self.config.source(),
            self.config.output(),
            self.cancel.clone(),
        );

        let mut outcomes = Vec::with_capacity(plans.len());
        for plan in &plans {
            let stage = plan.stage;

            if let Some(checkpoint) = trusted.get(&stage) {
                debug!(stage = %stage, "Skipping checkpointed stage");
                outcomes.push(StageOutcome {
                    stage,
                    status: StageStatus::Skipped,
                    files: checkpoint.metadata.files.iter().map(|f| f.path.clone()).collect(),
                    generation_calls: checkpoint.metadata.generation_calls,
                });
                continue;
            }

            if self.cancel.is_cancelled() {
                return Err(MigrationError::Cancelled { stage: Some(stage) });
            }
            if !dry_run {
                self.confirm(stage, &inventory, &report)?;
            }

            self.transition(MigrationState::Running(stage));
            info!(
                stage = %stage,
                position = stage.position(),
                files = plan.items.len(),
                generation_calls = plan.generation_calls(),
                "Running stage"
            );

            if dry_run {
                outcomes.push(StageOutcome {
                    stage,
                    status: StageStatus::Planned,
                    files: plan.files().into_iter().map(str::to_string).collect(),
                    generation_calls: plan.generation_calls(),
                });
                continue;
            }

            let output = executor
                .execute(plan)
                .await
                .map_err(|e| MigrationError::from_stage(stage, e))?;

            self.store.record_stage_complete(
                &self.key,
                stage,
                StageMetadata {
                    files: output.files.clone(),
                    generation_calls: output.generation_calls,
                    input_fingerprint: fingerprint.clone(),
                },
            )?;

            outcomes.push(StageOutcome {
                stage,
                status: StageStatus::Executed,
                files: output.files.into_iter().map(|f| f.path).collect(),
                generation_calls: output.generation_calls,
            });
        }

        let build_verified = self.verify_build(dry_run).await;

        self.transition(MigrationState::Completed);
        info!(run = %self.key, "Migration completed");

        Ok(MigrationReport {
            run_key: self.key.clone(),
            state: self.state,
            dry_run,
            inventory: inventory.counts(),
            dependencies: report.as_ref().clone(),
            stages: outcomes,
            build_verified,
        })
    }

    /// Supplied inputs are used as-is; otherwise scan and classify.
    async fn load_inputs(
        &mut self,
    ) -> Result<(Arc<ProjectInventory>, Arc<DependencyReport>), MigrationError> {
        let inventory = match self.config.inventory() {
            Some(inventory) => {
                debug!("Using supplied inventory");
                Arc::clone(inventory)
            }
            None => {
                self.transition(MigrationState::Scanning);
                let source = self.config.source().to_path_buf();
                let inventory = tokio::task::spawn_blocking(move || scanner::scan(&source))
                    .await
                    .map_err(|e| ScanError::Interrupted(e.to_string()))??;
                Arc::new(inventory)
            }
        };

        let report = match self.config.report() {
            Some(report) => {
                debug!("Using supplied dependency report");
                Arc::clone(report)
            }
            None => {
                self.transition(MigrationState::Analyzing);
                let report = self.classifier.classify(&inventory.dependencies);
                info!(
                    compatible = report.compatible.len(),
                    replaceable = report.replaceable.len(),
                    unsupported = report.unsupported.len(),
                    "Classified dependencies"
                );
                Arc::new(report)
            }
        };

        Ok((inventory, report))
    }

    /// Remove an earlier run's recorded outputs, then its ledger.
    ///
    /// Files the ledger does not attribute to a stage are left alone.
    fn discard_previous_run(&self) -> Result<(), MigrationError> {
        let checkpoints = self.store.load(&self.key)?;
        if !checkpoints.is_empty() {
            match self.store.load_manifest(&self.key)? {
                Some(manifest) => {
                    let summary =
                        rollback::discard_stages(&self.store, &self.key, &checkpoints, &manifest)?;
                    info!(
                        run = %self.key,
                        stages = summary.stages.len(),
                        files = summary.files_removed,
                        "Removed outputs of the previous run"
                    );
                }
                None => warn!(
                    run = %self.key,
                    "Previous checkpoints have no manifest; leaving their outputs in place"
                ),
            }
        }
        self.store.delete_all(&self.key)?;
        Ok(())
    }

    fn write_manifest(&self) -> Result<(), MigrationError> {
        let created_at = self
            .store
            .load_manifest(&self.key)?
            .map(|m| m.created_at)
            .unwrap_or_else(Utc::now);

        self.store.write_manifest(&RunManifest {
            version: CHECKPOINT_VERSION,
            run_key: self.key.clone(),
            source_path: self.config.source().to_path_buf(),
            output_path: self.config.output().to_path_buf(),
            tool_version: self.config.tool_version().to_string(),
            created_at,
        })?;
        Ok(())
    }

    /// The contiguous prefix of checkpoints whose outputs are unchanged.
    ///
    /// The first missing or changed stage and everything after it are
    /// dropped from the ledger (left alone in a dry run).
    fn verified_checkpoints(
        &self,
        fingerprint: &str,
        dry_run: bool,
    ) -> Result<HashMap<Stage, StageCheckpoint>, MigrationError> {
        let checkpoints = self.store.load(&self.key)?;
        let output = self.config.output();
        let mut trusted = HashMap::new();
        let mut invalid_from = None;
        let mut inputs_changed = false;

        for stage in Stage::ALL {
            let Some(checkpoint) = checkpoints.iter().find(|c| c.stage == stage) else {
                invalid_from = Some(stage);
                break;
            };

            let stale = checkpoint.stale_files(output);
            if let Some(first) = stale.first() {
                warn!(
                    stage = %stage,
                    stale = stale.len(),
                    file = %first.path,
                    "Recorded outputs are missing or modified; re-running from this stage"
                );
                invalid_from = Some(stage);
                break;
            }

            inputs_changed |= checkpoint.metadata.input_fingerprint != fingerprint;
            trusted.insert(stage, checkpoint.clone());
        }

        if inputs_changed {
            warn!("Source inventory changed since the checkpoints were recorded; reusing them anyway");
        }

        if let Some(stage) = invalid_from {
            if !dry_run && checkpoints.iter().any(|c| c.stage >= stage) {
                self.store.delete_from(&self.key, stage)?;
            }
        }

        info!(run = %self.key, reused = trusted.len(), "Resuming from checkpoints");
        Ok(trusted)
    }

    fn plan(
        &self,
        inventory: &ProjectInventory,
        report: &DependencyReport,
    ) -> Result<Vec<StagePlan>, MigrationError> {
        let ctx = PlanContext {
            inventory,
            report,
            include_tests: self.config.include_tests(),
            tool_version: self.config.tool_version(),
        };

        let mut prior = Vec::new();
        let mut plans = Vec::with_capacity(Stage::ALL.len());
        for stage in Stage::ALL {
            let plan =
                plan_stage(stage, ctx, &prior).map_err(|e| MigrationError::from_stage(stage, e))?;
            prior.extend(plan.files().into_iter().map(str::to_string));
            plans.push(plan);
        }
        Ok(plans)
    }

    async fn check_credentials(&self, stage: Stage) -> Result<(), MigrationError> {
        let call_timeout = self.config.execution().call_timeout;
        let result = tokio::select! {
            _ = self.cancel.cancelled() => return Err(MigrationError::Cancelled { stage: Some(stage) }),
            result = tokio::time::timeout(call_timeout, self.generator.validate_credentials()) => {
                result.unwrap_or(Err(GenerationError::Timeout(call_timeout)))
            }
        };

        match result {
            Ok(()) => {
                debug!(generator = self.generator.name(), "Credentials accepted");
                Ok(())
            }
            Err(e) if e.is_authentication() => Err(MigrationError::Authentication {
                stage: None,
                message: e.to_string(),
            }),
            Err(source) => Err(MigrationError::from_stage(
                stage,
                StageError::Generation {
                    artifact: "credential check".to_string(),
                    source,
                },
            )),
        }
    }

    fn confirm(
        &self,
        stage: Stage,
        inventory: &ProjectInventory,
        report: &DependencyReport,
    ) -> Result<(), MigrationError> {
        if !self.config.interactive() {
            return Ok(());
        }

        let prompt = match stage {
            Stage::ScanConfirm => {
                let counts = inventory.counts();
                Some(format!(
                    "Found {} entities, {} repositories, {} services, {} controllers, {} scheduled jobs and {} event listeners in '{}'. Start the migration?",
                    counts.entities,
                    counts.repositories,
                    counts.services,
                    counts.controllers,
                    counts.scheduled_jobs,
                    counts.event_listeners,
                    inventory.name
                ))
            }
            Stage::DependencyResolution if report.has_unsupported() => {
                let names: Vec<String> = report
                    .unsupported
                    .iter()
                    .map(|u| u.dependency.coordinate())
                    .collect();
                Some(format!(
                    "{} dependencies have no known equivalent and will need manual work: {}. Continue?",
                    names.len(),
                    names.join(", ")
                ))
            }
            _ => None,
        };

        match prompt {
            Some(prompt) if !self.confirmer.confirm(&prompt) => Err(MigrationError::Aborted {
                stage: Some(stage),
                reason: "confirmation declined".to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn verify_build(&self, dry_run: bool) -> Option<bool> {
        if dry_run || self.config.skip_post_build() {
            return None;
        }
        let verifier = self.verifier.as_ref()?;

        match verifier.verify(self.config.output()).await {
            Ok(()) => {
                info!("Post-build verification passed");
                Some(true)
            }
            Err(message) => {
                warn!(error = %message, "Post-build verification failed");
                Some(false)
            }
        }
    }

    fn transition(&mut self, to: MigrationState) {
        if !self.state.can_transition_to(&to) {
            warn!(from = %self.state, to = %to, "Ignoring invalid state transition");
            return;
        }
        debug!(from = %self.state, to = %to, "State transition");
        self.history = self.history.record(StateTransition {
            from: self.state,
            to,
            timestamp: Utc::now(),
        });
        self.state = to;
    }
}
