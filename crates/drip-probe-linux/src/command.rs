//! Command execution seam
//!
//! The probe never spawns processes directly; it goes through a
//! [`CommandRunner`] so that parsing and command sequencing can be tested
//! without touching the host.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use crate::error::ProbeError;

/// Runs external programs on behalf of the probe
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program and return its stdout
    ///
    /// A non-zero exit status is reported as [`ProbeError::Failed`].
    async fn output(&self, program: &str, args: &[&str]) -> Result<String, ProbeError>;

    /// Run a program and report only whether it exited successfully
    async fn succeeds(&self, program: &str, args: &[&str]) -> bool {
        self.output(program, args).await.is_ok()
    }
}

/// Runs programs with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let command = render(program, args);
        trace!("Running `{}`", command);

        let output = Command::new(program)
            .args(args)
            .env("LC_ALL", "C")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ProbeError::parse(command, e))
    }
}

/// Render a command line for logs and error messages
pub fn render(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
