//! Structural classification of source files.
//!
//! Files are sorted into artifact categories by annotations and naming
//! conventions. No semantic parsing takes place.

use crate::inventory::ArtifactKind;
use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    package: Regex,
    entity: Regex,
    repository: Regex,
    repository_base: Regex,
    controller: Regex,
    listener: Regex,
    scheduled: Regex,
    service: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |p: &str| Regex::new(p).expect("source pattern is valid");
        Patterns {
            package: compile(r"(?m)^\s*package\s+([A-Za-z_][\w.]*)\s*;?"),
            entity: compile(r"@(?:Entity|Document|Table|MappedSuperclass)\b"),
            repository: compile(r"@Repository\b"),
            repository_base: compile(
                r"\b(?:JpaRepository|CrudRepository|MongoRepository|PagingAndSortingRepository|ReactiveCrudRepository)\s*<",
            ),
            controller: compile(r"@(?:RestController|Controller)\b"),
            listener: compile(
                r"@(?:KafkaListener|RabbitListener|JmsListener|EventListener|StreamListener|SqsListener)\b",
            ),
            scheduled: compile(r"@Scheduled\b"),
            service: compile(r"@(?:Service|Component)\b"),
        }
    })
}

/// Category of a main-source file, or `None` when it fits no category.
///
/// Categories are exclusive and checked in priority order:
/// entity, repository, controller, event listener, scheduled job, service.
pub(crate) fn classify(name: &str, content: &str) -> Option<ArtifactKind> {
    let p = patterns();

    if p.entity.is_match(content) {
        Some(ArtifactKind::Entity)
    } else if p.repository.is_match(content)
        || p.repository_base.is_match(content)
        || name.ends_with("Repository")
    {
        Some(ArtifactKind::Repository)
    } else if p.controller.is_match(content) {
        Some(ArtifactKind::Controller)
    } else if p.listener.is_match(content) {
        Some(ArtifactKind::EventListener)
    } else if p.scheduled.is_match(content) {
        Some(ArtifactKind::ScheduledJob)
    } else if p.service.is_match(content) || name.ends_with("Service") {
        Some(ArtifactKind::Service)
    } else {
        None
    }
}

/// Declared package of a source file.
pub(crate) fn package_of(content: &str) -> Option<String> {
    patterns()
        .package
        .captures(content)
        .map(|c| c[1].to_string())
}

/// Whether a root-relative path lives in a test source set.
pub(crate) fn is_test_path(relative: &str) -> bool {
    relative.starts_with("src/test/") || relative.contains("/src/test/")
}
