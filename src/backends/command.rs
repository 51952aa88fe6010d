//! Backend that shells out to a local program.
//!
//! The prompt is written to the program's stdin and its stdout (trimmed) is the completion.
//! Units are estimated from prompt plus output. The child is spawned with `kill_on_drop`, so
//! when a try times out and its future is dropped the process goes with it.

use crate::provider::{
    BackendError, BackendOutput, CompletionBackend, CompletionOverrides, estimate_units,
};
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Environment variable carrying the per-call system message, when one is set.
pub const SYSTEM_MESSAGE_ENV: &str = "RELAY_SYSTEM_MESSAGE";

#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandBackend {
    /// Resolve `program` on `PATH` (or as a path) and build the backend.
    pub fn new(program: &str, args: Vec<String>) -> Result<Self, BackendError> {
        let program = which::which(program).map_err(|e| {
            BackendError::Unavailable(format!("command '{}' not found: {}", program, e))
        })?;
        Ok(Self { program, args })
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// Shell-escaped rendering of the command line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .map(|part| shell_escape::escape(part.into()).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run(
        &self,
        prompt: &str,
        overrides: &CompletionOverrides,
    ) -> Result<BackendOutput, BackendError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref system_message) = overrides.system_message {
            command.env(SYSTEM_MESSAGE_ENV, system_message);
        }

        debug!("Executing backend command: {}", self.command_line());

        let mut child = command
            .spawn()
            .map_err(|e| BackendError::Unavailable(format!("failed to spawn command: {}", e)))?;

        // Feed stdin while stdout is drained, otherwise a program that echoes as it reads
        // fills its stdout pipe and both sides stall.
        let stdin = child.stdin.take();
        let write_prompt = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(prompt.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        let (written, output) = tokio::join!(write_prompt, child.wait_with_output());
        let output =
            output.map_err(|e| BackendError::Other(format!("failed to wait for command: {}", e)))?;

        match written {
            Ok(()) => {}
            // The program exited without reading all of its input; its exit status decides
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!("Backend command closed stdin early");
            }
            Err(e) => {
                return Err(BackendError::Other(format!("failed to write prompt: {}", e)));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Unavailable(format!(
                "command exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|e| BackendError::InvalidResponse(format!("stdout is not UTF-8: {}", e)))?
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(BackendError::InvalidResponse(
                "command produced no output".to_string(),
            ));
        }

        let units = estimate_units(prompt) + estimate_units(&text);
        Ok(BackendOutput::new(text, units))
    }
}

impl CompletionBackend for CommandBackend {
    fn complete_once<'a>(
        &'a self,
        prompt: &'a str,
        overrides: &'a CompletionOverrides,
    ) -> BoxFuture<'a, Result<BackendOutput, BackendError>> {
        Box::pin(self.run(prompt, overrides))
    }

    fn backend_name(&self) -> &str {
        "command"
    }
}
