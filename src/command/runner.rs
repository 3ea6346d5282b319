//! External command runner - spawns a subprocess and captures stdout

use crate::command::result::CommandResult;
use crate::command::CommandRunner;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Configuration for the system command runner
#[derive(Debug, Clone)]
pub struct CommandRunnerConfig {
    /// Directory the commands run in (defaults to the current directory)
    pub working_dir: Option<PathBuf>,

    /// Timeout for each command in seconds
    pub timeout_secs: u64,
}

impl Default for CommandRunnerConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            timeout_secs: 30,
        }
    }
}

impl CommandRunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Runs commands as real subprocesses
#[derive(Debug)]
pub struct SystemCommandRunner {
    config: CommandRunnerConfig,
    sequence: AtomicU64,
}

impl SystemCommandRunner {
    pub fn new(config: CommandRunnerConfig) -> Self {
        Self {
            config,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CommandRunnerConfig {
        &self.config
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new(CommandRunnerConfig::default())
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    /// Run a command with no stdin and capture its stdout
    ///
    /// Never fails: a command that cannot be spawned, exits non-zero, or times
    /// out produces the `unknown` sentinel result instead.
    async fn run(&self, command_line: &[String]) -> CommandResult {
        let invoked_at = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let shown = command_line.join(" ");

        let Some((program, args)) = command_line.split_first() else {
            warn!("Refusing to run an empty command line");
            return CommandResult::unavailable("empty command line", invoked_at);
        };

        debug!("Running command #{}: {}", invoked_at, shown);

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        let output = match timeout(Duration::from_secs(self.config.timeout_secs), command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Failed to start '{}': {}", shown, e);
                return CommandResult::unavailable(format!("failed to start: {}", e), invoked_at);
            }
            Err(_) => {
                warn!("'{}' timed out after {}s", shown, self.config.timeout_secs);
                return CommandResult::unavailable(
                    format!("timed out after {} seconds", self.config.timeout_secs),
                    invoked_at,
                );
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            warn!("'{}' exited with code {}: {}", shown, exit_code, stderr.trim());
            return CommandResult::unavailable(format!("exited with code {}", exit_code), invoked_at);
        }
        if !stderr.trim().is_empty() {
            debug!("'{}' wrote to stderr: {}", shown, stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("'{}' returned {} bytes of output", shown, stdout.len());

        CommandResult::success(&stdout, invoked_at)
    }
}
