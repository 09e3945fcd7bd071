//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use remodel::{
    CodeGenerator, Confirmation, ExecutionSettings, GeneratedSource, GenerationError,
    RetryPolicy, RunConfigBuilder, Stage, TransformRequest,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub const POM: &str = r#"<project>
  <groupId>com.acme</groupId>
  <artifactId>shop</artifactId>
  <properties>
    <java.version>17</java.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.springframework.boot</groupId>
      <artifactId>spring-boot-starter-web</artifactId>
    </dependency>
    <dependency>
      <groupId>io.springfox</groupId>
      <artifactId>springfox-swagger2</artifactId>
      <version>2.9.2</version>
    </dependency>
    <dependency>
      <groupId>org.apache.struts</groupId>
      <artifactId>struts2-core</artifactId>
      <version>2.5.30</version>
    </dependency>
  </dependencies>
</project>
"#;

const SOURCES: &[(&str, &str)] = &[
    (
        "src/main/java/com/acme/shop/Customer.java",
        "package com.acme.shop;\n\n@Entity\npublic class Customer {\n    @Id Long id;\n}\n",
    ),
    (
        "src/main/java/com/acme/shop/Order.java",
        "package com.acme.shop;\n\n@Entity\n@Table(name = \"orders\")\npublic class Order {\n    @Id Long id;\n}\n",
    ),
    (
        "src/main/java/com/acme/shop/CustomerRepository.java",
        "package com.acme.shop;\n\npublic interface CustomerRepository extends JpaRepository<Customer, Long> {}\n",
    ),
    (
        "src/main/java/com/acme/shop/BillingService.java",
        "package com.acme.shop;\n\n@Service\npublic class BillingService {}\n",
    ),
    (
        "src/main/java/com/acme/shop/OrderController.java",
        "package com.acme.shop;\n\n@RestController\npublic class OrderController {}\n",
    ),
    (
        "src/main/java/com/acme/shop/NightlyReportJob.java",
        "package com.acme.shop;\n\n@Component\npublic class NightlyReportJob {\n    @Scheduled(cron = \"0 0 2 * * *\")\n    void run() {}\n}\n",
    ),
    (
        "src/test/java/com/acme/shop/CustomerTest.java",
        "package com.acme.shop;\n\nclass CustomerTest {}\n",
    ),
    (
        "src/main/resources/application.properties",
        "spring.datasource.url=jdbc:postgresql://localhost/shop\n",
    ),
];

/// Generation requests the fixture project needs without tests.
pub const FIXTURE_CALLS: usize = 6;

/// A scratch area with a small Maven project, an output directory and a
/// checkpoint root side by side.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("shop");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("pom.xml"), POM).unwrap();
        for (path, contents) in SOURCES {
            let path = source.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        Self { dir }
    }

    /// Add (or replace) a file in the source project.
    pub fn add_source(&self, relative: &str, contents: &str) {
        let path = self.source().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn source(&self) -> PathBuf {
        self.dir.path().join("shop")
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("shop-modular")
    }

    pub fn ledger_root(&self) -> PathBuf {
        self.dir.path().join("ledger")
    }

    /// Config builder wired to this fixture with fast retries.
    pub fn config(&self) -> RunConfigBuilder {
        RunConfigBuilder::new()
            .source(self.source())
            .output(self.output())
            .checkpoint_root(self.ledger_root())
            .tool_version("0.1.0-test")
            .execution(ExecutionSettings {
                max_concurrency: 2,
                call_timeout: Duration::from_secs(5),
                retry: RetryPolicy {
                    max_attempts: 2,
                    initial_backoff: Duration::from_millis(1),
                    max_backoff: Duration::from_millis(2),
                    multiplier: 2,
                },
            })
    }
}

/// Every file under `root` with its bytes, keyed by relative path.
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    if !root.exists() {
        return files;
    }
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            files.insert(relative, fs::read(entry.path()).unwrap());
        }
    }
    files
}

/// Deterministic stand-in for a real code-generation backend.
#[derive(Default)]
pub struct FakeGenerator {
    calls: AtomicUsize,
    credential_checks: AtomicUsize,
    fail_stage: Mutex<Option<(Stage, GenerationError)>>,
    reject_credentials: bool,
    cancel_at: Option<(Stage, CancellationToken)>,
    requests: Mutex<Vec<TransformRequest>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request in `stage` fails with `error`.
    pub fn failing_at(stage: Stage, error: GenerationError) -> Self {
        Self {
            fail_stage: Mutex::new(Some((stage, error))),
            ..Self::default()
        }
    }

    /// The first request in `stage` cancels `token` and then never answers.
    pub fn cancelling_at(stage: Stage, token: CancellationToken) -> Self {
        Self {
            cancel_at: Some((stage, token)),
            ..Self::default()
        }
    }

    pub fn rejecting_credentials() -> Self {
        Self {
            reject_credentials: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn credential_checks(&self) -> usize {
        self.credential_checks.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransformRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeGenerator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn validate_credentials(&self) -> Result<(), GenerationError> {
        self.credential_checks.fetch_add(1, Ordering::SeqCst);
        if self.reject_credentials {
            return Err(GenerationError::auth("API key revoked"));
        }
        Ok(())
    }

    async fn transform(
        &self,
        request: &TransformRequest,
    ) -> Result<GeneratedSource, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some((stage, token)) = &self.cancel_at {
            if *stage == request.stage {
                token.cancel();
                std::future::pending::<()>().await;
            }
        }

        if let Some((stage, error)) = self.fail_stage.lock().unwrap().as_ref() {
            if *stage == request.stage {
                return Err(error.clone());
            }
        }

        Ok(GeneratedSource::new(format!(
            "package {};\n\n// migrated from {}\n{}",
            request.target_package, request.source_path, request.source
        )))
    }
}

/// Declines every prompt.
pub struct Decline;

impl Confirmation for Decline {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Accepts every prompt and remembers it.
#[derive(Default)]
pub struct RecordingConfirm {
    prompts: Mutex<Vec<String>>,
}

impl RecordingConfirm {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirmation for RecordingConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        true
    }
}
