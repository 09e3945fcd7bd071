//! Pure stage planning.
//!
//! A plan lists every file a stage will produce and how: rendered locally or
//! requested from the code generator. Planning never touches the disk, so a
//! dry run can show the whole pipeline.

use super::{assembly, Stage, StageError};
use crate::deps::DependencyReport;
use crate::inventory::{Artifact, ArtifactKind, BrokerKind, DatabaseFamily, ProjectInventory};
use std::collections::HashMap;

/// Inputs shared by every stage plan.
#[derive(Clone, Copy, Debug)]
pub struct PlanContext<'a> {
    pub inventory: &'a ProjectInventory,
    pub report: &'a DependencyReport,
    pub include_tests: bool,
    pub tool_version: &'a str,
}

/// One request to the code generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationTask {
    /// Source class to transform
    pub artifact: Artifact,
    /// Category of the production class this task belongs to
    pub kind: ArtifactKind,
    pub test: bool,
    /// Destination, relative to the output root
    pub target_path: String,
    pub target_package: String,
    pub instructions: String,
}

/// One output file of a stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkItem {
    Generate(GenerationTask),
    /// Rendered without the code generator
    Static { path: String, contents: String },
}

impl WorkItem {
    pub fn target_path(&self) -> &str {
        match self {
            Self::Generate(task) => &task.target_path,
            Self::Static { path, .. } => path,
        }
    }
}

/// Everything one stage will write, in write order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagePlan {
    pub stage: Stage,
    pub items: Vec<WorkItem>,
    /// Files planned by earlier stages
    pub context: Vec<String>,
}

impl StagePlan {
    pub fn files(&self) -> Vec<&str> {
        self.items.iter().map(WorkItem::target_path).collect()
    }

    pub fn generation_calls(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, WorkItem::Generate(_)))
            .count()
    }
}

/// Plan all eight stages in order.
pub fn plan_pipeline(ctx: PlanContext<'_>) -> Result<Vec<StagePlan>, StageError> {
    let mut prior: Vec<String> = Vec::new();
    let mut plans = Vec::with_capacity(Stage::ALL.len());

    for stage in Stage::ALL {
        let plan = plan_stage(stage, ctx, &prior)?;
        prior.extend(plan.files().into_iter().map(str::to_string));
        plans.push(plan);
    }

    Ok(plans)
}

/// Plan a single stage given the files planned before it.
pub(crate) fn plan_stage(
    stage: Stage,
    ctx: PlanContext<'_>,
    prior: &[String],
) -> Result<StagePlan, StageError> {
    let items = match stage {
        Stage::ScanConfirm => vec![WorkItem::Static {
            path: "migration/inventory.json".to_string(),
            contents: to_json(ctx.inventory)?,
        }],
        Stage::DependencyResolution => vec![WorkItem::Static {
            path: "migration/dependency-report.json".to_string(),
            contents: to_json(ctx.report)?,
        }],
        Stage::Assembly => assembly::render(ctx)
            .into_iter()
            .map(|(path, contents)| WorkItem::Static { path, contents })
            .collect(),
        _ => generation_items(stage, ctx)?,
    };

    Ok(StagePlan {
        stage,
        items,
        context: prior.to_vec(),
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StageError> {
    let mut json =
        serde_json::to_string_pretty(value).map_err(|e| StageError::Render(e.to_string()))?;
    json.push('\n');
    Ok(json)
}

fn generation_items(stage: Stage, ctx: PlanContext<'_>) -> Result<Vec<WorkItem>, StageError> {
    let Some(module) = stage.module() else {
        return Ok(Vec::new());
    };
    let root = ctx.inventory.root_package();
    let module_package = format!("{}.{}", ctx.inventory.base_package(), module);

    let mut items = Vec::new();
    let mut claimed: HashMap<String, String> = HashMap::new();
    let mut claim = |task: GenerationTask| -> Result<WorkItem, StageError> {
        if let Some(first) = claimed.get(&task.target_path) {
            return Err(StageError::DuplicateTarget {
                path: task.target_path,
                first: first.clone(),
                second: task.artifact.path,
            });
        }
        claimed.insert(task.target_path.clone(), task.artifact.path.clone());
        Ok(WorkItem::Generate(task))
    };

    for &kind in stage.artifact_kinds() {
        for artifact in ctx.inventory.artifacts(kind) {
            let package = target_package(&module_package, artifact, &root);
            items.push(claim(GenerationTask {
                artifact: artifact.clone(),
                kind,
                test: false,
                target_path: target_path(module, "main", &package, artifact),
                target_package: package.clone(),
                instructions: instructions(stage, kind, ctx.inventory),
            })?);

            if !ctx.include_tests {
                continue;
            }
            if let Some(test) = ctx.inventory.test_for(artifact) {
                items.push(claim(GenerationTask {
                    artifact: test.clone(),
                    kind,
                    test: true,
                    target_path: target_path(module, "test", &package, test),
                    target_package: package.clone(),
                    instructions: format!(
                        "Port the tests for {} so they exercise the migrated class in the {} module.",
                        artifact.name, module
                    ),
                })?);
            }
        }
    }
    Ok(items)
}

/// `module_package` extended by the artifact's package below `root`, so
/// same-named classes from different packages stay apart.
fn target_package(module_package: &str, artifact: &Artifact, root: &str) -> String {
    let Some(package) = artifact.package.as_deref() else {
        return module_package.to_string();
    };
    let below = if root.is_empty() {
        package
    } else if package == root {
        ""
    } else {
        package
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(package)
    };

    if below.is_empty() {
        module_package.to_string()
    } else {
        format!("{}.{}", module_package, below)
    }
}

fn target_path(module: &str, source_set: &str, package: &str, artifact: &Artifact) -> String {
    format!(
        "modules/{}/src/{}/{}/{}/{}.{}",
        module,
        source_set,
        artifact.language.source_dir(),
        package.replace('.', "/"),
        artifact.name,
        artifact.language.extension()
    )
}

fn instructions(stage: Stage, kind: ArtifactKind, inventory: &ProjectInventory) -> String {
    let infra = &inventory.infrastructure;
    match stage {
        Stage::DataModel => "Move this entity into the shared domain module. Keep field \
                             mappings and validation annotations unchanged."
            .to_string(),
        Stage::Persistence => {
            let store = match infra.database {
                Some(DatabaseFamily::Document) => "a document store",
                Some(DatabaseFamily::Relational) | None => "a relational database",
            };
            format!(
                "Move this repository into the persistence module backed by {}. \
                 Reference entities from the domain module.",
                store
            )
        }
        Stage::SharedServices => {
            let mut text = "Move this service into the shared services module. Depend on \
                            repositories through the persistence module."
                .to_string();
            if infra.cache {
                text.push_str(" Preserve existing cache annotations.");
            }
            text
        }
        Stage::ApiLayer => "Move this controller into the api module. Call services from \
                            the shared module and keep request mappings stable."
            .to_string(),
        Stage::Workers => {
            let trigger = match kind {
                ArtifactKind::ScheduledJob => "schedule".to_string(),
                _ => match infra.broker {
                    Some(BrokerKind::Kafka) => "Kafka subscription".to_string(),
                    Some(BrokerKind::RabbitMq) => "RabbitMQ subscription".to_string(),
                    Some(BrokerKind::ActiveMq) => "ActiveMQ subscription".to_string(),
                    None => "event subscription".to_string(),
                },
            };
            format!(
                "Move this {} into the worker module and keep its {}.",
                kind, trigger
            )
        }
        _ => String::new(),
    }
}
