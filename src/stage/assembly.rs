//! Rendering of the final multi-module build files and migration report.
//!
//! Output is a pure function of the plan context; it carries no timestamps
//! so repeated runs produce identical bytes.

use super::PlanContext;
use crate::inventory::{ProjectInventory, SourceLanguage};
use std::fmt::Write;

const DEFAULT_RUNTIME: u32 = 17;

/// `(module, modules it depends on)`, in build order.
const MODULE_GRAPH: [(&str, &[&str]); 5] = [
    ("domain", &[]),
    ("persistence", &["domain"]),
    ("shared", &["domain", "persistence"]),
    ("api", &["domain", "shared"]),
    ("worker", &["domain", "shared"]),
];

/// All assembly files as `(relative path, contents)`, in write order.
pub(super) fn render(ctx: PlanContext<'_>) -> Vec<(String, String)> {
    let modules = modules(ctx.inventory);

    let mut files = vec![
        ("settings.gradle".to_string(), settings_gradle(ctx.inventory, &modules)),
        ("build.gradle".to_string(), root_build_gradle(ctx)),
    ];
    for (module, deps) in MODULE_GRAPH
        .iter()
        .filter(|(name, _)| modules.contains(name))
    {
        files.push((
            format!("modules/{}/build.gradle", module),
            module_build_gradle(deps),
        ));
    }
    files.push(("MIGRATION_REPORT.md".to_string(), report(ctx, &modules)));
    files
}

/// Target modules, dropping the worker module when there is nothing to run.
fn modules(inventory: &ProjectInventory) -> Vec<&'static str> {
    let has_workers = !inventory.scheduled_jobs.is_empty() || !inventory.event_listeners.is_empty();
    MODULE_GRAPH
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| *name != "worker" || has_workers)
        .collect()
}

/// Major runtime version: `1.8` is 8, `21.0.2` is 21.
pub(crate) fn runtime_major(version: Option<&str>) -> u32 {
    let Some(version) = version else {
        return DEFAULT_RUNTIME;
    };
    let mut parts = version.trim().split('.');
    let first = parts.next().and_then(|p| p.parse::<u32>().ok());
    match first {
        Some(1) => parts
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_RUNTIME),
        Some(major) => major,
        None => DEFAULT_RUNTIME,
    }
}

fn settings_gradle(inventory: &ProjectInventory, modules: &[&str]) -> String {
    let mut out = format!("rootProject.name = '{}'\n\n", inventory.name);
    for module in modules {
        let _ = writeln!(out, "include 'modules:{}'", module);
    }
    out
}

fn root_build_gradle(ctx: PlanContext<'_>) -> String {
    let inventory = ctx.inventory;
    let runtime = runtime_major(inventory.runtime_version.as_deref());
    let kotlin = inventory.primary_language() == SourceLanguage::Kotlin;

    let mut out = String::new();
    out.push_str("plugins {\n    id 'java'\n");
    if kotlin {
        out.push_str("    id 'org.jetbrains.kotlin.jvm' apply false\n");
    }
    out.push_str("}\n\n");

    let _ = write!(
        out,
        "allprojects {{\n    group = '{}'\n    version = '0.1.0'\n\n    repositories {{\n        mavenCentral()\n    }}\n}}\n\n",
        inventory.base_package()
    );

    out.push_str("subprojects {\n    apply plugin: 'java-library'\n");
    if kotlin {
        out.push_str("    apply plugin: 'org.jetbrains.kotlin.jvm'\n");
    }
    let _ = write!(
        out,
        "\n    java {{\n        toolchain {{\n            languageVersion = JavaLanguageVersion.of({})\n        }}\n    }}\n\n",
        runtime
    );

    out.push_str("    dependencies {\n");
    for dep in &ctx.report.compatible {
        let _ = writeln!(out, "        implementation '{}'", dep.coordinate());
    }
    for replacement in &ctx.report.replaceable {
        let _ = writeln!(
            out,
            "        implementation '{}' // replaces {}",
            replacement.equivalent,
            replacement.dependency.coordinate()
        );
    }
    for unsupported in &ctx.report.unsupported {
        let _ = writeln!(
            out,
            "        // unsupported: {} ({})",
            unsupported.dependency.coordinate(),
            unsupported.reason
        );
    }
    out.push_str("    }\n}\n");
    out
}

fn module_build_gradle(deps: &[&str]) -> String {
    let mut out = String::from("dependencies {\n");
    for dep in deps {
        let _ = writeln!(out, "    api project(':modules:{}')", dep);
    }
    out.push_str("}\n");
    out
}

fn report(ctx: PlanContext<'_>, modules: &[&str]) -> String {
    let inventory = ctx.inventory;
    let counts = inventory.counts();

    let mut out = format!("# Migration report: {}\n\n", inventory.name);
    let _ = writeln!(out, "Generated by remodel {}.\n", ctx.tool_version);
    let _ = writeln!(
        out,
        "Source build: `{}`\n",
        inventory.build_system.descriptor()
    );

    out.push_str("## Inventory\n\n| Category | Count |\n|---|---|\n");
    for (label, count) in [
        ("Entities", counts.entities),
        ("Repositories", counts.repositories),
        ("Services", counts.services),
        ("Controllers", counts.controllers),
        ("Scheduled jobs", counts.scheduled_jobs),
        ("Event listeners", counts.event_listeners),
        ("Test classes", inventory.test_classes.len()),
    ] {
        let _ = writeln!(out, "| {} | {} |", label, count);
    }

    out.push_str("\n## Modules\n\n");
    for module in modules {
        let _ = writeln!(out, "- `modules/{}`", module);
    }

    let report = ctx.report;
    let _ = write!(
        out,
        "\n## Dependencies\n\n{} compatible, {} replaced, {} unsupported.\n",
        report.compatible.len(),
        report.replaceable.len(),
        report.unsupported.len()
    );

    if !report.replaceable.is_empty() {
        out.push_str("\n### Replaced\n\n");
        for r in &report.replaceable {
            let _ = writeln!(out, "- `{}` -> `{}`", r.dependency.coordinate(), r.equivalent);
        }
    }

    if report.has_unsupported() {
        out.push_str("\n### Needs manual work\n\n");
        for u in &report.unsupported {
            let _ = writeln!(out, "- `{}`: {}", u.dependency.coordinate(), u.reason);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::{self, DependencyReport};
    use crate::inventory::{Artifact, BuildSystem, Dependency};

    fn inventory(with_worker: bool) -> ProjectInventory {
        let mut inv = ProjectInventory::empty("shop", BuildSystem::Gradle);
        inv.group_id = Some("com.acme".into());
        inv.runtime_version = Some("1.8".into());
        if with_worker {
            inv.scheduled_jobs = vec![Artifact {
                name: "NightlyJob".into(),
                package: None,
                path: "src/main/java/NightlyJob.java".into(),
                language: SourceLanguage::Java,
            }];
        }
        inv
    }

    fn files(inv: &ProjectInventory, report: &DependencyReport) -> Vec<(String, String)> {
        render(PlanContext {
            inventory: inv,
            report,
            include_tests: false,
            tool_version: "1.2.3",
        })
    }

    #[test]
    fn runtime_versions() {
        assert_eq!(runtime_major(Some("1.8")), 8);
        assert_eq!(runtime_major(Some("21.0.2")), 21);
        assert_eq!(runtime_major(Some("11")), 11);
        assert_eq!(runtime_major(Some("latest")), 17);
        assert_eq!(runtime_major(None), 17);
    }

    #[test]
    fn worker_module_only_when_needed() {
        let report = DependencyReport::default();

        let without = files(&inventory(false), &report);
        assert!(!without.iter().any(|(p, _)| p == "modules/worker/build.gradle"));
        assert!(!without[0].1.contains("modules:worker"));

        let with = files(&inventory(true), &report);
        assert!(with.iter().any(|(p, _)| p == "modules/worker/build.gradle"));
        assert!(with[0].1.contains("include 'modules:worker'"));
    }

    #[test]
    fn root_build_lists_dependencies_by_verdict() {
        let report = deps::classify(&[
            Dependency::new("spring-boot-starter-web").with_group("org.springframework.boot"),
            Dependency::new("springfox-swagger2").with_group("io.springfox"),
            Dependency::new("mystery-lib"),
        ]);
        let files = files(&inventory(false), &report);
        let root = &files[1].1;

        assert!(root.contains("JavaLanguageVersion.of(8)"));
        assert!(root.contains("implementation 'org.springframework.boot:spring-boot-starter-web'"));
        assert!(root.contains("// replaces io.springfox:springfox-swagger2"));
        assert!(root.contains("// unsupported: mystery-lib (no known equivalent)"));
    }

    #[test]
    fn report_is_stable_and_ends_the_stage() {
        let report = DependencyReport::default();
        let a = files(&inventory(true), &report);
        let b = files(&inventory(true), &report);
        assert_eq!(a, b);

        let (path, text) = a.last().unwrap();
        assert_eq!(path, "MIGRATION_REPORT.md");
        assert!(text.contains("| Scheduled jobs | 1 |"));
        assert!(text.contains("remodel 1.2.3"));
    }
}
