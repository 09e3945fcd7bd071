//! Materializes a [`StagePlan`] under the output directory.

use super::{GenerationTask, Stage, StageError, StagePlan, WorkItem};
use crate::ai::{generate_with_retry, CodeGenerator, TransformRequest};
use crate::checkpoint::{atomic, GeneratedFile};
use crate::config::ExecutionSettings;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What a successfully executed stage produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageOutput {
    pub files: Vec<GeneratedFile>,
    pub generation_calls: usize,
}

/// Runs stage plans against a code generator.
///
/// Generation requests of one stage run concurrently, bounded by
/// `max_concurrency`. Nothing is written until every request has succeeded,
/// so a failed stage leaves no new files behind.
#[derive(Clone)]
pub struct StageExecutor {
    generator: Arc<dyn CodeGenerator>,
    settings: ExecutionSettings,
    source_root: PathBuf,
    output_root: PathBuf,
    cancel: CancellationToken,
}

impl StageExecutor {
    pub fn new(
        generator: Arc<dyn CodeGenerator>,
        settings: ExecutionSettings,
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            generator,
            settings,
            source_root: source_root.into(),
            output_root: output_root.into(),
            cancel,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub async fn execute(&self, plan: &StagePlan) -> Result<StageOutput, StageError> {
        if self.cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }

        let mut contents: Vec<Option<String>> = vec![None; plan.items.len()];
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, item) in plan.items.iter().enumerate() {
            match item {
                WorkItem::Static { contents: text, .. } => contents[index] = Some(text.clone()),
                WorkItem::Generate(task) => {
                    let request = self.request(plan, task)?;
                    let generator = Arc::clone(&self.generator);
                    let semaphore = Arc::clone(&semaphore);
                    let cancel = self.cancel.clone();
                    let policy = self.settings.retry.clone();
                    let call_timeout = self.settings.call_timeout;

                    tasks.spawn(async move {
                        let _permit = semaphore
                            .acquire_owned()
                            .await
                            .map_err(|e| StageError::TaskFailed(e.to_string()))?;
                        if cancel.is_cancelled() {
                            return Err(StageError::Cancelled);
                        }

                        let generated = tokio::select! {
                            _ = cancel.cancelled() => return Err(StageError::Cancelled),
                            result = generate_with_retry(generator.as_ref(), &request, &policy, call_timeout) => result,
                        };

                        generated
                            .map(|source| (index, source.content))
                            .map_err(|source| StageError::Generation {
                                artifact: request.artifact.clone(),
                                source,
                            })
                    });
                }
            }
        }

        let mut generation_calls = 0;
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(StageError::TaskFailed(e.to_string())),
            };
            match outcome {
                Ok((index, text)) => {
                    generation_calls += 1;
                    contents[index] = Some(text);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }

        let mut files = Vec::with_capacity(plan.items.len());
        for (item, text) in plan.items.iter().zip(contents) {
            let text = text.ok_or_else(|| {
                StageError::TaskFailed(format!("no output for {}", item.target_path()))
            })?;
            let path = self.output_root.join(item.target_path());
            atomic::write_atomic(&path, text.as_bytes())
                .map_err(|source| StageError::Write { path, source })?;
            debug!(file = item.target_path(), "Wrote stage output");
            files.push(GeneratedFile::from_contents(item.target_path(), text.as_bytes()));
        }

        info!(
            stage = %plan.stage,
            files = files.len(),
            generation_calls,
            "Stage outputs written"
        );

        Ok(StageOutput {
            files,
            generation_calls,
        })
    }

    fn request(&self, plan: &StagePlan, task: &GenerationTask) -> Result<TransformRequest, StageError> {
        let path = self.source_root.join(&task.artifact.path);
        let source = std::fs::read_to_string(&path)
            .map_err(|source| StageError::SourceRead { path, source })?;

        Ok(TransformRequest {
            stage: plan.stage,
            kind: task.kind,
            artifact: task.artifact.name.clone(),
            source_path: task.artifact.path.clone(),
            source,
            target_path: task.target_path.clone(),
            target_package: task.target_package.clone(),
            language: task.artifact.language,
            test: task.test,
            instructions: task.instructions.clone(),
            context: context_for(plan.stage, &plan.context),
        })
    }
}

/// Earlier outputs worth showing the generator: source files only, not
/// reports or build scripts.
fn context_for(stage: Stage, prior: &[String]) -> Vec<String> {
    if stage.module().is_none() {
        return Vec::new();
    }
    prior
        .iter()
        .filter(|path| path.starts_with("modules/"))
        .cloned()
        .collect()
}
