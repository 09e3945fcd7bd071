//! Interactive and post-build collaborators of the migrator.

use async_trait::async_trait;
use std::path::Path;

/// Asks the user whether to continue.
pub trait Confirmation: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Agrees to everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoConfirm;

impl Confirmation for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Checks that the generated tree builds.
#[async_trait]
pub trait BuildVerifier: Send + Sync {
    /// `Err` carries the build tool's complaint.
    async fn verify(&self, output: &Path) -> Result<(), String>;
}
