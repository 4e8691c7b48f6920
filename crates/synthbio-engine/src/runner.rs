//! Child-process execution of the engine CLI.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::{Duration, Instant};

use synthbio_core::{ConfigurationError, EngineError, QueryError};
use tokio::process::Command;
use tracing::debug;

use crate::invocation::EngineInvocation;

/// Captured result of one engine process.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Exit code (`-1` when killed by a signal).
    pub exit_code: i32,

    pub stdout: String,

    pub stderr: String,

    pub duration_ms: u64,

    pub success: bool,
}

impl RunOutput {
    /// Whether the process exited cleanly.
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Most useful diagnostic text: stderr, or stdout when stderr is empty.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }

    /// Convert a non-zero exit into an [`EngineError::Failed`].
    pub fn into_success(self) -> Result<Self, EngineError> {
        if self.passed() {
            Ok(self)
        } else {
            Err(EngineError::Failed {
                code: self.exit_code,
                detail: self.diagnostic(),
            })
        }
    }
}

/// Spawns engine processes.
pub struct EngineRunner;

impl EngineRunner {
    /// Run `invocation` to completion and capture its output.
    ///
    /// The child is killed if the timeout expires or the returned future is
    /// dropped. A missing executable is a configuration problem, not an
    /// engine failure.
    pub async fn execute(invocation: &EngineInvocation) -> Result<RunOutput, QueryError> {
        let start = Instant::now();

        if invocation.program.trim().is_empty() {
            return Err(EngineError::Process("empty engine command".to_string()).into());
        }

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = invocation.current_dir.as_ref() {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| -> QueryError {
            if e.kind() == ErrorKind::NotFound {
                ConfigurationError::EngineNotFound(invocation.program.clone()).into()
            } else {
                EngineError::Process(format!("failed to spawn {}: {e}", invocation.program)).into()
            }
        })?;

        let waited = if invocation.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(invocation.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| EngineError::Timeout {
                seconds: invocation.timeout_secs,
            })?
        } else {
            child.wait_with_output().await
        };
        let output = waited.map_err(|e| EngineError::Process(e.to_string()))?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        debug!(
            program = %invocation.program,
            exit_code,
            duration_ms,
            "engine process exited"
        );

        Ok(RunOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        })
    }
}
