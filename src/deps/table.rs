//! Static compatibility knowledge.

use super::Verdict;
use crate::inventory::Dependency;

/// How a rule selects dependencies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Matcher {
    /// Exact artifact name, any group
    Name(String),
    /// Exact `group` and artifact name
    Coordinate { group: String, name: String },
    /// Any artifact whose group starts with the prefix
    GroupPrefix(String),
}

impl Matcher {
    fn matches(&self, dep: &Dependency) -> bool {
        match self {
            Self::Name(name) => dep.name == *name,
            Self::Coordinate { group, name } => {
                dep.group.as_deref() == Some(group.as_str()) && dep.name == *name
            }
            Self::GroupPrefix(prefix) => dep
                .group
                .as_deref()
                .map(|g| g == prefix || g.starts_with(&format!("{}.", prefix)))
                .unwrap_or(false),
        }
    }

    /// Exact rules are consulted before group prefixes.
    fn precedence(&self) -> usize {
        match self {
            Self::Coordinate { .. } => 0,
            Self::Name(_) => 1,
            Self::GroupPrefix(_) => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub matcher: Matcher,
    pub verdict: Verdict,
}

/// Ordered rule set mapping dependencies to verdicts.
///
/// Lookup tries coordinate rules, then name rules, then group prefixes;
/// within a tier the first declared rule wins.
#[derive(Clone, Debug, Default)]
pub struct CompatibilityTable {
    rules: Vec<Rule>,
}

impl CompatibilityTable {
    /// An empty table: every dependency is unknown.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rule(mut self, matcher: Matcher, verdict: Verdict) -> Self {
        self.rules.push(Rule { matcher, verdict });
        self
    }

    pub fn compatible(self, name: impl Into<String>) -> Self {
        self.rule(Matcher::Name(name.into()), Verdict::Compatible)
    }

    pub fn compatible_group(self, prefix: impl Into<String>) -> Self {
        self.rule(Matcher::GroupPrefix(prefix.into()), Verdict::Compatible)
    }

    pub fn replaceable(self, name: impl Into<String>, equivalent: impl Into<String>) -> Self {
        self.rule(
            Matcher::Name(name.into()),
            Verdict::Replaceable {
                equivalent: equivalent.into(),
            },
        )
    }

    pub fn unsupported(self, name: impl Into<String>, reason: impl Into<String>) -> Self {
        self.rule(
            Matcher::Name(name.into()),
            Verdict::Unsupported {
                reason: reason.into(),
            },
        )
    }

    pub fn lookup(&self, dep: &Dependency) -> Option<&Verdict> {
        (0..3).find_map(|tier| {
            self.rules
                .iter()
                .filter(|r| r.matcher.precedence() == tier)
                .find(|r| r.matcher.matches(dep))
                .map(|r| &r.verdict)
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Built-in knowledge for Spring-style JVM services.
    pub fn builtin() -> Self {
        let mut table = Self::new();

        for group in [
            "org.springframework.boot",
            "org.springframework",
            "jakarta",
            "org.projectlombok",
            "com.fasterxml.jackson",
            "org.slf4j",
            "ch.qos.logback",
            "org.junit",
            "org.mockito",
            "org.assertj",
            "org.postgresql",
            "com.mysql",
            "org.mariadb",
            "com.h2database",
            "org.flywaydb",
            "org.liquibase",
            "io.micrometer",
            "org.mapstruct",
            "com.google.guava",
            "org.apache.commons",
            "org.hibernate.orm",
            "org.testcontainers",
        ] {
            table = table.compatible_group(group);
        }

        table
            .replaceable("javax.persistence-api", "jakarta.persistence-api")
            .replaceable("persistence-api", "jakarta.persistence-api")
            .replaceable("validation-api", "jakarta.validation-api")
            .replaceable("javax.servlet-api", "jakarta.servlet-api")
            .replaceable("springfox-swagger2", "springdoc-openapi-starter-webmvc-ui")
            .replaceable("springfox-swagger-ui", "springdoc-openapi-starter-webmvc-ui")
            .replaceable("springfox-boot-starter", "springdoc-openapi-starter-webmvc-ui")
            .replaceable("spring-cloud-starter-netflix-hystrix", "resilience4j-spring-boot3")
            .replaceable(
                "spring-cloud-starter-netflix-ribbon",
                "spring-cloud-starter-loadbalancer",
            )
            .replaceable("spring-cloud-starter-netflix-zuul", "spring-cloud-starter-gateway")
            .replaceable("mysql-connector-java", "mysql-connector-j")
            .replaceable("junit", "junit-jupiter")
            .replaceable("log4j", "logback-classic")
            .replaceable("commons-lang", "commons-lang3")
            .replaceable("jjwt", "jjwt-api")
            .unsupported("struts2-core", "Struts actions have no module equivalent")
            .unsupported("axis", "SOAP stack requires manual port")
            .unsupported("axis2", "SOAP stack requires manual port")
            .unsupported("ojdbc6", "legacy proprietary driver")
            .unsupported("wicket-core", "server-side UI framework")
            .unsupported("jboss-seam", "legacy application framework")
    }
}
