//! Build descriptor parsing for Maven and Gradle projects.
//!
//! Parsing is pattern based rather than a full XML/Groovy parse: it
//! extracts coordinates, the runtime version and the declared dependency
//! list, which is all the migration needs.

use crate::inventory::Dependency;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Facts extracted from a build descriptor.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Descriptor {
    pub name: Option<String>,
    pub group_id: Option<String>,
    pub runtime_version: Option<String>,
    pub dependencies: Vec<Dependency>,
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("descriptor pattern is valid"))
}

fn xml_comment() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"(?s)<!--.*?-->")
}

fn maven_dependency() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"(?s)<dependency>(.*?)</dependency>")
}

fn maven_property() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"(?s)<([A-Za-z0-9_.\-]+)>\s*([^<]*?)\s*</([A-Za-z0-9_.\-]+)>")
}

fn gradle_group() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r#"(?m)^\s*group\s*=\s*['"]([^'"]+)['"]"#)
}

fn gradle_source_compat() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(
        &CELL,
        r#"sourceCompatibility\s*=\s*['"]?(?:JavaVersion\.VERSION_)?([0-9][0-9_.]*)"#,
    )
}

fn gradle_toolchain() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"JavaLanguageVersion\.of\(\s*(\d+)\s*\)")
}

fn gradle_dependency() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(
        &CELL,
        r#"(?m)^\s*(?:implementation|api|compile|compileOnly|runtimeOnly|testImplementation|testRuntimeOnly|annotationProcessor|kapt)\s*\(?\s*['"]([^'"]+)['"]"#,
    )
}

fn gradle_root_name() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r#"rootProject\.name\s*=\s*['"]([^'"]+)['"]"#)
}

/// Text of the first `<tag>…</tag>` in `xml`, trimmed.
fn first_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    let value = xml[start..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `xml` with every `<tag>…</tag>` section removed.
fn strip_sections(xml: &str, tag: &str) -> String {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;

    while let Some(start) = rest.find(&open) {
        out.push_str(&rest[..start]);
        match rest[start..].find(&close) {
            Some(end) => rest = &rest[start + end + close.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve `${name}` placeholders against the `<properties>` block.
fn resolve(value: String, properties: &HashMap<String, String>) -> String {
    match value
        .strip_prefix("${")
        .and_then(|v| v.strip_suffix('}'))
        .and_then(|key| properties.get(key))
    {
        Some(resolved) => resolved.clone(),
        None => value,
    }
}

pub(crate) fn parse_maven(content: &str) -> Descriptor {
    let pom = xml_comment().replace_all(content, "").into_owned();

    let properties: HashMap<String, String> = first_section(&pom, "properties")
        .map(|block| {
            maven_property()
                .captures_iter(&block)
                .filter(|c| c[1] == c[3])
                .map(|c| (c[1].to_string(), c[2].to_string()))
                .collect()
        })
        .unwrap_or_default();

    let parent_group = first_section(&pom, "parent").and_then(|p| first_tag(&p, "groupId"));

    let mut project = pom.clone();
    for section in [
        "parent",
        "dependencyManagement",
        "dependencies",
        "build",
        "profiles",
        "properties",
        "reporting",
    ] {
        project = strip_sections(&project, section);
    }

    let body = strip_sections(
        &strip_sections(&strip_sections(&pom, "dependencyManagement"), "build"),
        "profiles",
    );
    let dependencies = maven_dependency()
        .captures_iter(&body)
        .filter_map(|c| {
            let block = &c[1];
            let name = first_tag(block, "artifactId")?;
            Some(Dependency {
                group: first_tag(block, "groupId").map(|g| resolve(g, &properties)),
                name,
                version: first_tag(block, "version").map(|v| resolve(v, &properties)),
            })
        })
        .collect();

    let runtime_version = ["java.version", "maven.compiler.release", "maven.compiler.source"]
        .iter()
        .find_map(|key| properties.get(*key).cloned());

    Descriptor {
        name: first_tag(&project, "artifactId"),
        group_id: first_tag(&project, "groupId").or(parent_group),
        runtime_version,
        dependencies,
    }
}

fn first_section(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].to_string())
}

pub(crate) fn parse_gradle(content: &str) -> Descriptor {
    let group_id = gradle_group()
        .captures(content)
        .map(|c| c[1].to_string());

    let runtime_version = gradle_toolchain()
        .captures(content)
        .map(|c| c[1].to_string())
        .or_else(|| {
            gradle_source_compat()
                .captures(content)
                .map(|c| c[1].replace('_', "."))
        });

    let dependencies = gradle_dependency()
        .captures_iter(content)
        .filter_map(|c| parse_gradle_coordinate(&c[1]))
        .collect();

    Descriptor {
        name: None,
        group_id,
        runtime_version,
        dependencies,
    }
}

fn parse_gradle_coordinate(notation: &str) -> Option<Dependency> {
    let mut parts = notation.split(':');
    let group = parts.next()?.trim();
    let name = parts.next()?.trim();
    if group.is_empty() || name.is_empty() {
        return None;
    }
    let version = parts.next().map(str::trim).filter(|v| !v.is_empty());

    Some(Dependency {
        group: Some(group.to_string()),
        name: name.to_string(),
        version: version.map(str::to_string),
    })
}

/// `rootProject.name` from a `settings.gradle(.kts)` file.
pub(crate) fn gradle_project_name(settings: &str) -> Option<String> {
    gradle_root_name()
        .captures(settings)
        .map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"
<project>
  <parent>
    <groupId>org.springframework.boot</groupId>
    <artifactId>spring-boot-starter-parent</artifactId>
  </parent>
  <groupId>com.acme</groupId>
  <artifactId>orders</artifactId>
  <properties>
    <java.version>17</java.version>
    <guava.version>33.0.0-jre</guava.version>
  </properties>
  <!-- <dependency><artifactId>commented</artifactId></dependency> -->
  <dependencies>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
      <version>${guava.version}</version>
    </dependency>
    <dependency>
      <groupId>org.postgresql</groupId>
      <artifactId>postgresql</artifactId>
    </dependency>
  </dependencies>
  <build>
    <plugins>
      <plugin>
        <dependencies>
          <dependency><artifactId>plugin-only</artifactId></dependency>
        </dependencies>
      </plugin>
    </plugins>
  </build>
</project>
"#;

    #[test]
    fn maven_extracts_coordinates_and_dependencies() {
        let descriptor = parse_maven(POM);

        assert_eq!(descriptor.name.as_deref(), Some("orders"));
        assert_eq!(descriptor.group_id.as_deref(), Some("com.acme"));
        assert_eq!(descriptor.runtime_version.as_deref(), Some("17"));

        let names: Vec<_> = descriptor.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["guava", "postgresql"]);
        assert_eq!(
            descriptor.dependencies[0].version.as_deref(),
            Some("33.0.0-jre")
        );
    }

    #[test]
    fn maven_group_falls_back_to_parent() {
        let pom = "<project><parent><groupId>com.parent</groupId></parent><artifactId>x</artifactId></project>";
        assert_eq!(parse_maven(pom).group_id.as_deref(), Some("com.parent"));
    }

    #[test]
    fn gradle_extracts_dependencies_and_version() {
        let build = r#"
plugins { id 'java' }
group = 'com.acme'
java { toolchain { languageVersion = JavaLanguageVersion.of(21) } }
dependencies {
    implementation 'org.springframework.boot:spring-boot-starter-web'
    implementation("com.google.guava:guava:33.0.0-jre")
    testImplementation 'junit:junit:4.13.2'
}
"#;
        let descriptor = parse_gradle(build);

        assert_eq!(descriptor.group_id.as_deref(), Some("com.acme"));
        assert_eq!(descriptor.runtime_version.as_deref(), Some("21"));
        assert_eq!(descriptor.dependencies.len(), 3);
        assert_eq!(descriptor.dependencies[1].name, "guava");
        assert_eq!(descriptor.dependencies[0].version, None);
    }

    #[test]
    fn gradle_source_compatibility_is_normalized() {
        let build = "sourceCompatibility = JavaVersion.VERSION_1_8\n";
        assert_eq!(parse_gradle(build).runtime_version.as_deref(), Some("1.8"));
    }

    #[test]
    fn settings_name_is_read() {
        let settings = "rootProject.name = 'billing'\n";
        assert_eq!(gradle_project_name(settings).as_deref(), Some("billing"));
    }
}
