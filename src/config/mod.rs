//! Run configuration.
//!
//! A [`RunConfig`] is frozen before a run starts. It is only produced by
//! [`RunConfigBuilder::build`], which checks every field at once and reports
//! all problems together.

pub mod error;

pub use error::{ConfigError, ConfigViolation};

use crate::ai::RetryPolicy;
use crate::checkpoint::CheckpointStore;
use crate::deps::DependencyReport;
use crate::inventory::ProjectInventory;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::warn;

pub const ENV_MAX_CONCURRENCY: &str = "REMODEL_MAX_CONCURRENCY";
pub const ENV_CALL_TIMEOUT_SECS: &str = "REMODEL_CALL_TIMEOUT_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "REMODEL_MAX_ATTEMPTS";

/// How generation calls are issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSettings {
    /// Concurrent generation calls within one stage
    pub max_concurrency: usize,
    /// Upper bound on a single generation attempt
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            call_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

impl ExecutionSettings {
    /// Defaults overridden by `REMODEL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(value) = parse_var::<usize>(&lookup, ENV_MAX_CONCURRENCY) {
            settings.max_concurrency = value;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_CALL_TIMEOUT_SECS) {
            settings.call_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = parse_var::<u32>(&lookup, ENV_MAX_ATTEMPTS) {
            settings.retry.max_attempts = value;
        }

        settings
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

/// Frozen parameters for one migration attempt.
#[derive(Debug, Clone)]
pub struct RunConfig {
    source: PathBuf,
    output: PathBuf,
    checkpoint_root: PathBuf,
    dry_run: bool,
    interactive: bool,
    resume: bool,
    include_tests: bool,
    verbose: bool,
    debug: bool,
    skip_post_build: bool,
    tool_version: String,
    inventory: Option<Arc<ProjectInventory>>,
    report: Option<Arc<DependencyReport>>,
    execution: ExecutionSettings,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn checkpoint_root(&self) -> &Path {
        &self.checkpoint_root
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn resume(&self) -> bool {
        self.resume
    }

    pub fn include_tests(&self) -> bool {
        self.include_tests
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn skip_post_build(&self) -> bool {
        self.skip_post_build
    }

    pub fn tool_version(&self) -> &str {
        &self.tool_version
    }

    /// Inventory supplied by the caller, if any
    pub fn inventory(&self) -> Option<&Arc<ProjectInventory>> {
        self.inventory.as_ref()
    }

    /// Dependency report supplied by the caller, if any
    pub fn report(&self) -> Option<&Arc<DependencyReport>> {
        self.report.as_ref()
    }

    pub fn execution(&self) -> &ExecutionSettings {
        &self.execution
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    checkpoint_root: Option<PathBuf>,
    dry_run: bool,
    interactive: bool,
    resume: bool,
    include_tests: bool,
    verbose: bool,
    debug: bool,
    skip_post_build: bool,
    tool_version: String,
    inventory: Option<Arc<ProjectInventory>>,
    report: Option<Arc<DependencyReport>>,
    execution: ExecutionSettings,
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RunConfigBuilder {
    /// Empty builder whose execution settings honor the `REMODEL_*`
    /// environment overrides.
    pub fn new() -> Self {
        Self {
            source: None,
            output: None,
            checkpoint_root: None,
            dry_run: false,
            interactive: false,
            resume: false,
            include_tests: false,
            verbose: false,
            debug: false,
            skip_post_build: false,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            inventory: None,
            report: None,
            execution: ExecutionSettings::from_env(),
        }
    }

    /// Root of the project to migrate (required).
    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Directory the new layout is written to (required).
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Where run ledgers live. Defaults to [`CheckpointStore::default_root`].
    pub fn checkpoint_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_root = Some(path.into());
        self
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn interactive(mut self, enabled: bool) -> Self {
        self.interactive = enabled;
        self
    }

    pub fn resume(mut self, enabled: bool) -> Self {
        self.resume = enabled;
        self
    }

    pub fn include_tests(mut self, enabled: bool) -> Self {
        self.include_tests = enabled;
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn skip_post_build(mut self, enabled: bool) -> Self {
        self.skip_post_build = enabled;
        self
    }

    pub fn tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = version.into();
        self
    }

    /// Use an already-computed inventory instead of scanning.
    pub fn inventory(mut self, inventory: ProjectInventory) -> Self {
        self.inventory = Some(Arc::new(inventory));
        self
    }

    /// Use an already-computed dependency report instead of classifying.
    pub fn report(mut self, report: DependencyReport) -> Self {
        self.report = Some(Arc::new(report));
        self
    }

    /// Replace the execution settings, environment overrides included.
    pub fn execution(mut self, settings: ExecutionSettings) -> Self {
        self.execution = settings;
        self
    }

    /// Validate every field and freeze the configuration.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        match self.validate() {
            Validation::Success(_) => {}
            Validation::Failure(errors) => {
                return Err(ConfigError::Invalid {
                    violations: errors.iter().cloned().collect(),
                })
            }
        }

        let (Some(source), Some(output)) = (self.source, self.output) else {
            return Err(ConfigError::Invalid {
                violations: vec![ConfigViolation::MissingSource, ConfigViolation::MissingOutput],
            });
        };

        Ok(RunConfig {
            source,
            output,
            checkpoint_root: self
                .checkpoint_root
                .unwrap_or_else(CheckpointStore::default_root),
            dry_run: self.dry_run,
            interactive: self.interactive,
            resume: self.resume,
            include_tests: self.include_tests,
            verbose: self.verbose,
            debug: self.debug,
            skip_post_build: self.skip_post_build,
            tool_version: self.tool_version,
            inventory: self.inventory,
            report: self.report,
            execution: self.execution,
        })
    }

    fn validate(&self) -> Validation<(), NonEmptyVec<ConfigViolation>> {
        let overlap = match (&self.source, &self.output) {
            (Some(source), Some(output)) => paths_overlap(source, output),
            _ => false,
        };

        let checks = vec![
            check(self.source.is_some(), ConfigViolation::MissingSource),
            check(self.output.is_some(), ConfigViolation::MissingOutput),
            check(
                !overlap,
                ConfigViolation::OutputOverlapsSource {
                    output: self.output.clone().unwrap_or_default(),
                },
            ),
            check(
                self.report.is_none() || self.inventory.is_some(),
                ConfigViolation::ReportWithoutInventory,
            ),
            check(
                !self.tool_version.trim().is_empty(),
                ConfigViolation::EmptyToolVersion,
            ),
            check(
                self.execution.max_concurrency > 0,
                ConfigViolation::ZeroConcurrency,
            ),
            check(
                self.execution.retry.max_attempts > 0,
                ConfigViolation::ZeroAttempts,
            ),
            check(
                !self.execution.call_timeout.is_zero(),
                ConfigViolation::ZeroTimeout,
            ),
        ];

        Validation::all_vec(checks).map(|_| ())
    }
}

fn check(ok: bool, violation: ConfigViolation) -> Validation<(), NonEmptyVec<ConfigViolation>> {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation)
    }
}

/// Whether either path contains the other, after resolving symlinks of the
/// parts that exist.
pub(crate) fn paths_overlap(a: &Path, b: &Path) -> bool {
    let a = resolve(a);
    let b = resolve(b);
    a.starts_with(&b) || b.starts_with(&a)
}

/// Canonicalize the longest existing prefix of `path` and append the rest
/// lexically.
fn resolve(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let absolute = normalize(&absolute);
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for part in rest.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::BuildSystem;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn builds_with_required_fields() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::builder()
            .source(dir.path().join("app"))
            .output(dir.path().join("out"))
            .checkpoint_root(dir.path().join("ledger"))
            .resume(true)
            .build()
            .unwrap();

        assert!(config.resume());
        assert!(!config.dry_run());
        assert_eq!(config.checkpoint_root(), dir.path().join("ledger"));
        assert_eq!(config.tool_version(), env!("CARGO_PKG_VERSION"));
        assert_eq!(config.execution().max_concurrency, 4);
    }

    #[test]
    fn builder_starts_from_environment_settings() {
        assert_eq!(RunConfigBuilder::new().execution, ExecutionSettings::from_env());
    }

    #[test]
    fn reports_every_violation_at_once() {
        let err = RunConfig::builder()
            .tool_version("  ")
            .execution(ExecutionSettings {
                max_concurrency: 0,
                ..ExecutionSettings::default()
            })
            .build()
            .unwrap_err();

        let violations = err.violations();
        assert_eq!(violations.len(), 4);
        assert!(violations.contains(&ConfigViolation::MissingSource));
        assert!(violations.contains(&ConfigViolation::MissingOutput));
        assert!(violations.contains(&ConfigViolation::EmptyToolVersion));
        assert!(violations.contains(&ConfigViolation::ZeroConcurrency));
        assert!(err.to_string().contains("; "));
    }

    #[test]
    fn output_inside_source_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = RunConfig::builder()
            .source(dir.path())
            .output(dir.path().join("migrated"))
            .build()
            .unwrap_err();

        assert!(matches!(
            err.violations(),
            [ConfigViolation::OutputOverlapsSource { .. }]
        ));
    }

    #[test]
    fn sibling_paths_do_not_overlap() {
        let dir = TempDir::new().unwrap();
        assert!(!paths_overlap(&dir.path().join("app"), &dir.path().join("app-out")));
        assert!(paths_overlap(
            &dir.path().join("app"),
            &dir.path().join("app/./x/../y")
        ));
    }

    #[test]
    fn report_requires_inventory() {
        let dir = TempDir::new().unwrap();
        let err = RunConfig::builder()
            .source(dir.path().join("app"))
            .output(dir.path().join("out"))
            .report(DependencyReport::default())
            .build()
            .unwrap_err();
        assert_eq!(err.violations(), &[ConfigViolation::ReportWithoutInventory]);

        let ok = RunConfig::builder()
            .source(dir.path().join("app"))
            .output(dir.path().join("out"))
            .inventory(ProjectInventory::empty("app", BuildSystem::Maven))
            .report(DependencyReport::default())
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        let vars: HashMap<&str, &str> = [
            (ENV_MAX_CONCURRENCY, "8"),
            (ENV_CALL_TIMEOUT_SECS, "soon"),
            (ENV_MAX_ATTEMPTS, "5"),
        ]
        .into_iter()
        .collect();

        let settings = ExecutionSettings::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.max_concurrency, 8);
        assert_eq!(settings.call_timeout, Duration::from_secs(120));
        assert_eq!(settings.retry.max_attempts, 5);
    }
}
