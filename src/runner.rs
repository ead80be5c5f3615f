//! # Process Batch Runner
//!
//! Runs a list of decoder invocations in sequential batches of up to `width`
//! concurrent child processes.
//!
//! ## Responsibilities:
//! - Spawns every command with stdin closed and stdout/stderr captured
//! - Waits for the whole batch before starting the next one (no rolling window)
//! - Returns outputs in submission order, never in completion order
//! - Records non-zero exits and timeouts per command without aborting the batch
//! - Maps a missing or non-executable program to `ToolNotFound`
//!
//! ## Example:
//! ```rust,ignore
//! let runner = BatchRunner::new(4).with_timeout(Some(120));
//! let outcome = runner.run(&commands).await?;
//! for output in &outcome.outputs {
//!     println!("{}", output.text());
//! }
//! ```

use crate::error::{Result, VideoHashError};
use crate::utils::render_command;
use futures::future::join_all;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of one child process
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code, `None` when killed by a signal or by the timeout
    pub status: Option<i32>,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout followed by stderr, as lossy text
    pub fn text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&self.stderr));
        text
    }
}

/// Outputs of a whole run, index-aligned with the submitted commands
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub outputs: Vec<CommandOutput>,
    /// False if any command exited non-zero or timed out
    pub success: bool,
}

/// Batched subprocess executor
#[derive(Debug, Clone)]
pub struct BatchRunner {
    width: usize,
    timeout: Option<Duration>,
}

impl BatchRunner {
    /// Create a runner executing up to `width` processes per batch
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            timeout: None,
        }
    }

    /// Kill any process still running after `secs` seconds
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout = secs.map(Duration::from_secs);
        self
    }

    /// Run all commands, batch after batch.
    ///
    /// Each command is a full argument vector whose first element is the
    /// program. All commands always run, whatever the exit code of the others.
    pub async fn run(&self, commands: &[Vec<String>]) -> Result<BatchOutcome> {
        let mut outputs = Vec::with_capacity(commands.len());
        let mut success = true;
        let mut spawn_error = None;

        for (batch_index, batch) in commands.chunks(self.width).enumerate() {
            debug!(
                "Starting batch {} with {} process(es)",
                batch_index,
                batch.len()
            );

            let results = join_all(batch.iter().map(|args| self.run_one(args))).await;

            for result in results {
                match result {
                    Ok(output) => {
                        success &= output.success();
                        outputs.push(output);
                    }
                    Err(e) => {
                        success = false;
                        outputs.push(CommandOutput::default());
                        spawn_error.get_or_insert(e);
                    }
                }
            }
        }

        if let Some(e) = spawn_error {
            return Err(e);
        }

        Ok(BatchOutcome { outputs, success })
    }

    async fn run_one(&self, args: &[String]) -> Result<CommandOutput> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| VideoHashError::invalid_config("empty command"))?;

        debug!("Running: {}", render_command(args));

        let child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    VideoHashError::tool_not_found(program.clone())
                }
                _ => VideoHashError::Io(e),
            })?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => {
                    // dropping the future kills the child
                    warn!(
                        "Process timed out after {}s, killed: {}",
                        limit.as_secs(),
                        render_command(args)
                    );
                    return Ok(CommandOutput {
                        timed_out: true,
                        ..Default::default()
                    });
                }
            },
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            debug!(
                "Process exited with {:?}: {}",
                output.status.code(),
                render_command(args)
            );
        }

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            status: output.status.code(),
            timed_out: false,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::args;

    fn sh(script: &str) -> Vec<String> {
        args!["sh", "-c", script]
    }

    #[tokio::test]
    async fn test_outputs_keep_submission_order() {
        // later commands finish first
        let commands: Vec<Vec<String>> = (0..6)
            .map(|i| sh(&format!("sleep 0.{}; printf {}", 6 - i, i)))
            .collect();

        let outcome = BatchRunner::new(3).run(&commands).await.unwrap();
        assert!(outcome.success);
        let texts: Vec<String> = outcome.outputs.iter().map(|o| o.text()).collect();
        assert_eq!(texts, vec!["0", "1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_remaining() {
        let commands = vec![sh("printf a"), sh("printf b >&2; exit 3"), sh("printf c")];

        let outcome = BatchRunner::new(1).run(&commands).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.outputs.len(), 3);
        assert_eq!(outcome.outputs[1].status, Some(3));
        assert_eq!(outcome.outputs[1].stderr, b"b");
        assert_eq!(outcome.outputs[2].stdout, b"c");
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_not_found() {
        let commands = vec![args!["/nonexistent/videohash-decoder", "-version"]];
        let err = BatchRunner::new(4).run(&commands).await.unwrap_err();
        assert!(matches!(err, VideoHashError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_continues() {
        let commands = vec![sh("sleep 5"), sh("printf done")];

        let outcome = BatchRunner::new(2)
            .with_timeout(Some(1))
            .run(&commands)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.outputs[0].timed_out);
        assert_eq!(outcome.outputs[1].text(), "done");
    }

    #[tokio::test]
    async fn test_empty_command_list() {
        let outcome = BatchRunner::new(4).run(&[]).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.outputs.is_empty());
    }
}
