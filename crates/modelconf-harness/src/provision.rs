//! Dependency provisioning — the one environment-mutating seam.
//!
//! Some model families need extra runtime dependencies installed before
//! the model can be constructed. That install is an external, idempotent
//! step keyed by a requirements manifest; it must succeed (zero exit)
//! before construction proceeds, and it is the only process-wide side
//! effect the harness performs.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::HarnessError;

/// Runs the external installer for a requirements manifest.
///
/// The default command is `pip install -r <manifest>`; tests inject a
/// different program via [`Provisioner::with_command`].
#[derive(Debug, Clone)]
pub struct Provisioner {
    program: String,
    args_prefix: Vec<String>,
}

impl Default for Provisioner {
    fn default() -> Self {
        Self {
            program: "pip".to_string(),
            args_prefix: vec!["install".to_string(), "-r".to_string()],
        }
    }
}

impl Provisioner {
    /// Provisioner running the default installer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisioner running `program` with `args_prefix` before the
    /// manifest path. Used by tests to stand in for the real installer.
    pub fn with_command(program: impl Into<String>, args_prefix: Vec<String>) -> Self {
        Self { program: program.into(), args_prefix }
    }

    /// Install the dependencies named by `manifest`.
    ///
    /// Idempotent by contract of the installer, so calling this for every
    /// scenario of a family is safe. The child inherits this process's
    /// environment. Non-zero exit or spawn failure is
    /// [`HarnessError::Provisioning`].
    pub fn ensure(&self, manifest: &Path) -> Result<(), HarnessError> {
        let command = format!(
            "{} {} {}",
            self.program,
            self.args_prefix.join(" "),
            manifest.display()
        );
        debug!(command = %command, "provisioning dependencies");

        let output = Command::new(&self.program)
            .args(&self.args_prefix)
            .arg(manifest)
            .output()
            .map_err(|e| HarnessError::Provisioning {
                command: command.clone(),
                status: format!("failed to spawn: {e}"),
                stderr: String::new(),
            })?;

        if !output.status.success() {
            warn!(command = %command, status = %output.status, "provisioning failed, no retry");
            return Err(HarnessError::Provisioning {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        info!(manifest = %manifest.display(), "dependencies provisioned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_succeeds() {
        let manifest = tempfile::NamedTempFile::new().unwrap();
        let p = Provisioner::with_command("true", vec![]);
        assert!(p.ensure(manifest.path()).is_ok());
    }

    #[test]
    fn nonzero_exit_is_fatal() {
        let manifest = tempfile::NamedTempFile::new().unwrap();
        let p = Provisioner::with_command("false", vec![]);
        let err = p.ensure(manifest.path()).unwrap_err();
        match err {
            HarnessError::Provisioning { command, status, .. } => {
                assert!(command.starts_with("false"));
                assert!(status.contains("1"), "status was {status}");
            }
            other => panic!("expected Provisioning, got {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_a_spawn_failure() {
        let manifest = tempfile::NamedTempFile::new().unwrap();
        let p = Provisioner::with_command("modelconf-no-such-installer", vec![]);
        let err = p.ensure(manifest.path()).unwrap_err();
        match err {
            HarnessError::Provisioning { status, stderr, .. } => {
                assert!(status.contains("failed to spawn"));
                assert!(stderr.is_empty());
            }
            other => panic!("expected Provisioning, got {other:?}"),
        }
    }

    #[test]
    fn repeated_invocation_is_idempotent() {
        let manifest = tempfile::NamedTempFile::new().unwrap();
        let p = Provisioner::with_command("true", vec![]);
        assert!(p.ensure(manifest.path()).is_ok());
        assert!(p.ensure(manifest.path()).is_ok());
    }

    #[test]
    fn stderr_is_captured() {
        let manifest = tempfile::NamedTempFile::new().unwrap();
        // `cat` on a directory prints to stderr and exits non-zero.
        let p = Provisioner::with_command("cat", vec![]);
        let err = p.ensure(manifest.path().parent().unwrap()).unwrap_err();
        match err {
            HarnessError::Provisioning { stderr, .. } => {
                assert!(!stderr.is_empty());
            }
            other => panic!("expected Provisioning, got {other:?}"),
        }
    }
}
