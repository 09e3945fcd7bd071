//! Project inventory produced by the scanner.
//!
//! A [`ProjectInventory`] is an immutable snapshot of what a monolithic
//! source project contains. It is created once per run (or injected by a
//! caller that already scanned) and only read afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Build tool that owns the project root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildSystem {
    Maven,
    Gradle,
    GradleKotlin,
}

impl BuildSystem {
    /// File name of the descriptor at the project root.
    pub fn descriptor(&self) -> &'static str {
        match self {
            Self::Maven => "pom.xml",
            Self::Gradle => "build.gradle",
            Self::GradleKotlin => "build.gradle.kts",
        }
    }
}

/// Language of a source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLanguage {
    Java,
    Kotlin,
}

impl SourceLanguage {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "java" => Some(Self::Java),
            "kt" => Some(Self::Kotlin),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Kotlin => "kt",
        }
    }

    /// Source-set directory name (`src/main/<dir>`).
    pub fn source_dir(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Kotlin => "kotlin",
        }
    }
}

/// Recognized artifact categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Entity,
    Repository,
    Service,
    Controller,
    ScheduledJob,
    EventListener,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Entity => "entity",
            Self::Repository => "repository",
            Self::Service => "service",
            Self::Controller => "controller",
            Self::ScheduledJob => "scheduled job",
            Self::EventListener => "event listener",
        };
        f.write_str(label)
    }
}

/// One classified source file.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Artifact {
    /// Class name (file stem)
    pub name: String,
    /// Declared package, if any
    pub package: Option<String>,
    /// Path relative to the project root, `/`-separated
    pub path: String,
    pub language: SourceLanguage,
}

/// A declared external library.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    pub group: Option<String>,
    pub name: String,
    pub version: Option<String>,
}

impl Dependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            group: None,
            name: name.into(),
            version: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// `group:name[:version]`, or just the name when no group is known.
    pub fn coordinate(&self) -> String {
        let mut out = match &self.group {
            Some(group) => format!("{}:{}", group, self.name),
            None => self.name.clone(),
        };
        if let Some(version) = &self.version {
            out.push(':');
            out.push_str(version);
        }
        out
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.coordinate())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseFamily {
    Relational,
    Document,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    Kafka,
    RabbitMq,
    ActiveMq,
}

/// Detected infrastructure usage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infrastructure {
    pub database: Option<DatabaseFamily>,
    pub broker: Option<BrokerKind>,
    pub cache: bool,
}

/// Per-category artifact counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCounts {
    pub entities: usize,
    pub repositories: usize,
    pub services: usize,
    pub controllers: usize,
    pub scheduled_jobs: usize,
    pub event_listeners: usize,
}

/// Immutable snapshot of a scanned project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInventory {
    pub name: String,
    pub group_id: Option<String>,
    pub runtime_version: Option<String>,
    pub build_system: BuildSystem,
    pub entities: Vec<Artifact>,
    pub repositories: Vec<Artifact>,
    pub services: Vec<Artifact>,
    pub controllers: Vec<Artifact>,
    pub scheduled_jobs: Vec<Artifact>,
    pub event_listeners: Vec<Artifact>,
    pub test_classes: Vec<Artifact>,
    pub infrastructure: Infrastructure,
    pub dependencies: Vec<Dependency>,
}

impl ProjectInventory {
    /// An inventory with no artifacts, as a starting point for builders.
    pub fn empty(name: impl Into<String>, build_system: BuildSystem) -> Self {
        Self {
            name: name.into(),
            group_id: None,
            runtime_version: None,
            build_system,
            entities: Vec::new(),
            repositories: Vec::new(),
            services: Vec::new(),
            controllers: Vec::new(),
            scheduled_jobs: Vec::new(),
            event_listeners: Vec::new(),
            test_classes: Vec::new(),
            infrastructure: Infrastructure::default(),
            dependencies: Vec::new(),
        }
    }

    pub fn artifacts(&self, kind: ArtifactKind) -> &[Artifact] {
        match kind {
            ArtifactKind::Entity => &self.entities,
            ArtifactKind::Repository => &self.repositories,
            ArtifactKind::Service => &self.services,
            ArtifactKind::Controller => &self.controllers,
            ArtifactKind::ScheduledJob => &self.scheduled_jobs,
            ArtifactKind::EventListener => &self.event_listeners,
        }
    }

    pub fn counts(&self) -> InventoryCounts {
        InventoryCounts {
            entities: self.entities.len(),
            repositories: self.repositories.len(),
            services: self.services.len(),
            controllers: self.controllers.len(),
            scheduled_jobs: self.scheduled_jobs.len(),
            event_listeners: self.event_listeners.len(),
        }
    }

    /// Group used for generated packages, falling back to `com.example`.
    pub fn base_package(&self) -> &str {
        self.group_id.as_deref().unwrap_or("com.example")
    }

    /// Longest package prefix shared by every production class.
    ///
    /// Empty when the classes share no package segment or declare none.
    pub fn root_package(&self) -> String {
        let mut packages = self
            .production()
            .filter_map(|a| a.package.as_deref());
        let Some(first) = packages.next() else {
            return String::new();
        };

        let mut common: Vec<&str> = first.split('.').collect();
        for package in packages {
            let shared = common
                .iter()
                .zip(package.split('.'))
                .take_while(|(a, b)| **a == *b)
                .count();
            common.truncate(shared);
        }
        common.join(".")
    }

    fn production(&self) -> impl Iterator<Item = &Artifact> {
        [
            &self.entities,
            &self.repositories,
            &self.services,
            &self.controllers,
            &self.scheduled_jobs,
            &self.event_listeners,
        ]
        .into_iter()
        .flat_map(|group| group.iter())
    }

    /// The test class covering `artifact` (`<Name>Test` or `<Name>Tests`).
    pub fn test_for(&self, artifact: &Artifact) -> Option<&Artifact> {
        let single = format!("{}Test", artifact.name);
        let plural = format!("{}Tests", artifact.name);
        self.test_classes
            .iter()
            .find(|t| t.name == single || t.name == plural)
    }

    /// Dominant source language, Java when tied or empty.
    pub fn primary_language(&self) -> SourceLanguage {
        let kotlin = self.production().fold((0usize, 0usize), |(java, kt), a| match a.language {
            SourceLanguage::Java => (java + 1, kt),
            SourceLanguage::Kotlin => (java, kt + 1),
        });

        if kotlin.1 > kotlin.0 {
            SourceLanguage::Kotlin
        } else {
            SourceLanguage::Java
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str) -> Artifact {
        Artifact {
            name: name.to_string(),
            package: None,
            path: format!("src/main/java/{}.java", name),
            language: SourceLanguage::Java,
        }
    }

    #[test]
    fn coordinate_includes_group_and_version() {
        let dep = Dependency::new("guava")
            .with_group("com.google.guava")
            .with_version("33.0");
        assert_eq!(dep.coordinate(), "com.google.guava:guava:33.0");
        assert_eq!(Dependency::new("libX").coordinate(), "libX");
    }

    #[test]
    fn test_for_matches_both_suffixes() {
        let mut inventory = ProjectInventory::empty("shop", BuildSystem::Maven);
        inventory.test_classes = vec![artifact("OrderTest"), artifact("CustomerTests")];

        assert!(inventory.test_for(&artifact("Order")).is_some());
        assert!(inventory.test_for(&artifact("Customer")).is_some());
        assert!(inventory.test_for(&artifact("Invoice")).is_none());
    }

    #[test]
    fn counts_reflect_categories() {
        let mut inventory = ProjectInventory::empty("shop", BuildSystem::Gradle);
        inventory.entities = vec![artifact("Order"), artifact("Customer")];
        inventory.controllers = vec![artifact("OrderController")];

        let counts = inventory.counts();
        assert_eq!(counts.entities, 2);
        assert_eq!(counts.controllers, 1);
        assert_eq!(counts.repositories, 0);
    }

    #[test]
    fn artifacts_sort_by_name_then_language() {
        let kotlin = Artifact {
            language: SourceLanguage::Kotlin,
            ..artifact("Order")
        };
        let mut artifacts = vec![kotlin.clone(), artifact("Order"), artifact("Invoice")];
        artifacts.sort();

        assert_eq!(artifacts, vec![artifact("Invoice"), artifact("Order"), kotlin]);
    }

    #[test]
    fn root_package_is_the_shared_prefix() {
        let packaged = |name: &str, package: &str| Artifact {
            package: Some(package.to_string()),
            ..artifact(name)
        };
        let mut inventory = ProjectInventory::empty("shop", BuildSystem::Maven);
        assert_eq!(inventory.root_package(), "");

        inventory.entities = vec![packaged("Order", "com.acme.shop")];
        inventory.services = vec![packaged("BillingService", "com.acme.shop")];
        assert_eq!(inventory.root_package(), "com.acme.shop");

        inventory.entities.push(packaged("Order", "com.acme.legacy"));
        assert_eq!(inventory.root_package(), "com.acme");

        inventory.controllers = vec![packaged("Api", "org.other")];
        assert_eq!(inventory.root_package(), "");
    }

    #[test]
    fn base_package_falls_back() {
        let inventory = ProjectInventory::empty("shop", BuildSystem::Maven);
        assert_eq!(inventory.base_package(), "com.example");
    }
}
