//! Dependency classification.
//!
//! [`DependencyClassifier::classify`] partitions a dependency list into
//! compatible, replaceable and unsupported buckets using a static
//! [`CompatibilityTable`]. It is pure: no I/O, no network, and every input
//! entry lands in exactly one bucket.

pub mod error;
mod table;

pub use error::ClassificationError;
pub use table::{CompatibilityTable, Matcher, Rule};

use crate::inventory::Dependency;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Verdict for one external dependency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Usable as-is in the target layout
    Compatible,
    /// Must be swapped for the named equivalent
    Replaceable { equivalent: String },
    /// No equivalent; needs manual work
    Unsupported { reason: String },
}

/// A dependency paired with its verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyVerdict {
    pub dependency: Dependency,
    pub verdict: Verdict,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub dependency: Dependency,
    pub equivalent: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedDependency {
    pub dependency: Dependency,
    pub reason: String,
}

/// Partition of a dependency list into the three verdict groups.
///
/// Each group keeps the input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    pub compatible: Vec<Dependency>,
    pub replaceable: Vec<Replacement>,
    pub unsupported: Vec<UnsupportedDependency>,
}

impl DependencyReport {
    pub fn total(&self) -> usize {
        self.compatible.len() + self.replaceable.len() + self.unsupported.len()
    }

    pub fn has_unsupported(&self) -> bool {
        !self.unsupported.is_empty()
    }

    /// Every entry as a [`DependencyVerdict`], grouped by bucket.
    pub fn verdicts(&self) -> Vec<DependencyVerdict> {
        let compatible = self.compatible.iter().map(|d| DependencyVerdict {
            dependency: d.clone(),
            verdict: Verdict::Compatible,
        });
        let replaceable = self.replaceable.iter().map(|r| DependencyVerdict {
            dependency: r.dependency.clone(),
            verdict: Verdict::Replaceable {
                equivalent: r.equivalent.clone(),
            },
        });
        let unsupported = self.unsupported.iter().map(|u| DependencyVerdict {
            dependency: u.dependency.clone(),
            verdict: Verdict::Unsupported {
                reason: u.reason.clone(),
            },
        });
        compatible.chain(replaceable).chain(unsupported).collect()
    }

    fn push(&mut self, dependency: Dependency, verdict: Verdict) {
        match verdict {
            Verdict::Compatible => self.compatible.push(dependency),
            Verdict::Replaceable { equivalent } => self.replaceable.push(Replacement {
                dependency,
                equivalent,
            }),
            Verdict::Unsupported { reason } => {
                self.unsupported.push(UnsupportedDependency { dependency, reason })
            }
        }
    }
}

const UNKNOWN_REASON: &str = "no known equivalent";

fn validate(dep: &Dependency) -> Result<(), ClassificationError> {
    if dep.name.trim().is_empty() {
        return Err(ClassificationError::EmptyName);
    }
    let has_whitespace = dep.name.chars().any(char::is_whitespace)
        || dep
            .group
            .as_deref()
            .map(|g| g.chars().any(char::is_whitespace))
            .unwrap_or(false);
    if has_whitespace {
        return Err(ClassificationError::Malformed {
            entry: dep.coordinate(),
        });
    }
    Ok(())
}

/// Classifies dependencies against a compatibility table.
#[derive(Clone, Debug)]
pub struct DependencyClassifier {
    table: CompatibilityTable,
}

impl Default for DependencyClassifier {
    fn default() -> Self {
        Self::new(CompatibilityTable::builtin())
    }
}

impl DependencyClassifier {
    pub fn new(table: CompatibilityTable) -> Self {
        Self { table }
    }

    /// Verdict for a single dependency.
    pub fn verdict(&self, dep: &Dependency) -> Verdict {
        if let Err(err) = validate(dep) {
            warn!(entry = %dep.coordinate(), error = %err, "Classifying malformed dependency as unsupported");
            return Verdict::Unsupported {
                reason: err.to_string(),
            };
        }

        self.table
            .lookup(dep)
            .cloned()
            .unwrap_or_else(|| Verdict::Unsupported {
                reason: UNKNOWN_REASON.to_string(),
            })
    }

    /// Partition `dependencies` into a [`DependencyReport`].
    pub fn classify(&self, dependencies: &[Dependency]) -> DependencyReport {
        let mut report = DependencyReport::default();
        for dep in dependencies {
            report.push(dep.clone(), self.verdict(dep));
        }
        report
    }
}

/// Classify with the built-in table.
pub fn classify(dependencies: &[Dependency]) -> DependencyReport {
    DependencyClassifier::default().classify(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> DependencyClassifier {
        DependencyClassifier::new(
            CompatibilityTable::new()
                .compatible("libX")
                .replaceable("libY", "equivY"),
        )
    }

    #[test]
    fn partitions_into_three_buckets() {
        let deps = vec![
            Dependency::new("libX"),
            Dependency::new("libY"),
            Dependency::new("libZ"),
        ];
        let report = classifier().classify(&deps);

        assert_eq!(report.compatible, vec![Dependency::new("libX")]);
        assert_eq!(report.replaceable.len(), 1);
        assert_eq!(report.replaceable[0].dependency.name, "libY");
        assert_eq!(report.replaceable[0].equivalent, "equivY");
        assert_eq!(report.unsupported.len(), 1);
        assert_eq!(report.unsupported[0].dependency.name, "libZ");
        assert_eq!(report.unsupported[0].reason, UNKNOWN_REASON);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn malformed_entries_are_unsupported() {
        let deps = vec![Dependency::new(""), Dependency::new("lib X")];
        let report = classifier().classify(&deps);

        assert_eq!(report.unsupported.len(), 2);
        assert!(report.compatible.is_empty());
    }

    #[test]
    fn verdicts_cover_every_entry() {
        let deps = vec![Dependency::new("libZ"), Dependency::new("libX")];
        let verdicts = classifier().classify(&deps).verdicts();
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].verdict, Verdict::Compatible);
    }

    #[test]
    fn builtin_table_knows_spring() {
        let report = classify(&[
            Dependency::new("spring-boot-starter-web").with_group("org.springframework.boot"),
            Dependency::new("springfox-swagger2").with_group("io.springfox"),
        ]);
        assert_eq!(report.compatible.len(), 1);
        assert_eq!(
            report.replaceable[0].equivalent,
            "springdoc-openapi-starter-webmvc-ui"
        );
    }

    #[test]
    fn verdict_serializes_with_tag() {
        let json = serde_json::to_string(&Verdict::Replaceable {
            equivalent: "equivY".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"verdict":"replaceable","equivalent":"equivY"}"#);
    }
}
