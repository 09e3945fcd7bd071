//! Read-only project scanner.
//!
//! [`scan`] walks a source project once and produces a [`ProjectInventory`].
//! The walk is sorted, so an unchanged tree always yields an identical
//! inventory.

mod descriptor;
pub mod error;
mod infra;
mod sources;

pub use error::ScanError;

use crate::inventory::{Artifact, ArtifactKind, BuildSystem, ProjectInventory, SourceLanguage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

const IGNORED_DIRS: &[&str] = &[
    "target",
    "build",
    "out",
    ".git",
    ".gradle",
    ".idea",
    ".mvn",
    "node_modules",
];

fn is_ignored(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| IGNORED_DIRS.contains(&name))
            .unwrap_or(false)
}

fn detect_build_system(root: &Path) -> Option<BuildSystem> {
    [
        BuildSystem::Maven,
        BuildSystem::GradleKotlin,
        BuildSystem::Gradle,
    ]
    .into_iter()
    .find(|system| root.join(system.descriptor()).is_file())
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_descriptor(path: PathBuf) -> Result<String, ScanError> {
    fs::read_to_string(&path).map_err(|source| ScanError::Io { path, source })
}

/// Scan `source` into a [`ProjectInventory`].
///
/// Fails with [`ScanError`] when `source` is not a directory or has no
/// Maven/Gradle build descriptor at its root. Unreadable source files are
/// logged and skipped.
pub fn scan(source: &Path) -> Result<ProjectInventory, ScanError> {
    if !source.is_dir() {
        return Err(ScanError::NotFound(source.to_path_buf()));
    }

    let build_system = detect_build_system(source)
        .ok_or_else(|| ScanError::NoBuildDescriptor(source.to_path_buf()))?;

    let descriptor_text = read_descriptor(source.join(build_system.descriptor()))?;
    let descriptor = match build_system {
        BuildSystem::Maven => descriptor::parse_maven(&descriptor_text),
        BuildSystem::Gradle | BuildSystem::GradleKotlin => {
            let mut parsed = descriptor::parse_gradle(&descriptor_text);
            parsed.name = ["settings.gradle", "settings.gradle.kts"]
                .iter()
                .map(|f| source.join(f))
                .filter(|p| p.is_file())
                .find_map(|p| fs::read_to_string(p).ok())
                .and_then(|settings| descriptor::gradle_project_name(&settings));
            parsed
        }
    };

    let dir_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    let mut inventory =
        ProjectInventory::empty(descriptor.name.unwrap_or(dir_name), build_system);
    inventory.group_id = descriptor.group_id;
    inventory.runtime_version = descriptor.runtime_version;

    let mut dependencies = Vec::with_capacity(descriptor.dependencies.len());
    for dep in descriptor.dependencies {
        if !dependencies.contains(&dep) {
            dependencies.push(dep);
        }
    }
    infra::detect_from_dependencies(&dependencies, &mut inventory.infrastructure);
    inventory.dependencies = dependencies;

    let walker = WalkDir::new(source).sort_by_file_name().into_iter();
    for entry in walker.filter_entry(|e| e.depth() == 0 || !is_ignored(e)) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                debug!(error = %err, "Skipping inaccessible path");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let relative = relative_path(source, entry.path());

        if infra::is_config_file(&file_name) && !sources::is_test_path(&relative) {
            match fs::read_to_string(entry.path()) {
                Ok(content) => infra::detect_from_config(&content, &mut inventory.infrastructure),
                Err(err) => warn!(path = %relative, error = %err, "Unreadable config file"),
            }
            continue;
        }

        let Some(language) = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SourceLanguage::from_extension)
        else {
            continue;
        };

        let content = match fs::read(entry.path()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                warn!(path = %relative, error = %err, "Unreadable source file");
                continue;
            }
        };

        let name = entry
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let artifact = Artifact {
            package: sources::package_of(&content),
            name,
            path: relative,
            language,
        };

        if sources::is_test_path(&artifact.path) {
            inventory.test_classes.push(artifact);
            continue;
        }

        match sources::classify(&artifact.name, &content) {
            Some(ArtifactKind::Entity) => inventory.entities.push(artifact),
            Some(ArtifactKind::Repository) => inventory.repositories.push(artifact),
            Some(ArtifactKind::Service) => inventory.services.push(artifact),
            Some(ArtifactKind::Controller) => inventory.controllers.push(artifact),
            Some(ArtifactKind::ScheduledJob) => inventory.scheduled_jobs.push(artifact),
            Some(ArtifactKind::EventListener) => inventory.event_listeners.push(artifact),
            None => {}
        }
    }

    for group in [
        &mut inventory.entities,
        &mut inventory.repositories,
        &mut inventory.services,
        &mut inventory.controllers,
        &mut inventory.scheduled_jobs,
        &mut inventory.event_listeners,
        &mut inventory.test_classes,
    ] {
        group.sort();
    }

    let counts = inventory.counts();
    info!(
        project = %inventory.name,
        entities = counts.entities,
        repositories = counts.repositories,
        services = counts.services,
        controllers = counts.controllers,
        scheduled_jobs = counts.scheduled_jobs,
        event_listeners = counts.event_listeners,
        dependencies = inventory.dependencies.len(),
        "Scanned source project"
    );

    Ok(inventory)
}
