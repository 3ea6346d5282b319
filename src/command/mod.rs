//! External command execution with lazily-observed results

pub mod deferred;
pub mod result;
pub mod runner;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub use deferred::{channel, Deferred, DeferredError, Resolver};
pub use result::{CommandResult, UNKNOWN};
pub use runner::{CommandRunnerConfig, SystemCommandRunner};

/// Trait for command execution - allows for different implementations
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command line and capture its standard output
    async fn run(&self, command_line: &[String]) -> CommandResult;
}

/// Start a command in the background and return a handle to its result
///
/// The handle is returned immediately; reading it waits for the process.
pub fn spawn(runner: Arc<dyn CommandRunner>, command_line: Vec<String>) -> Deferred<CommandResult> {
    let (resolver, handle) = channel(command_line.join(" "));
    tokio::spawn(async move {
        let result = runner.run(&command_line).await;
        debug!("Background command '{}' finished", resolver.label());
        resolver.resolve(result);
    });
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Runner that blocks until released, to observe the handle mid-flight
    struct GatedRunner {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl CommandRunner for GatedRunner {
        async fn run(&self, _command_line: &[String]) -> CommandResult {
            self.gate.notified().await;
            CommandResult::success("abc123\n", 1)
        }
    }

    #[tokio::test]
    async fn test_spawn_returns_before_process_completes() {
        let gate = Arc::new(Notify::new());
        let runner: Arc<dyn CommandRunner> = Arc::new(GatedRunner { gate: gate.clone() });

        let handle = spawn(runner, vec!["git".into(), "rev-parse".into()]);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_resolved());

        let reader = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.get().await })
        };
        gate.notify_one();

        let result = reader.await.unwrap().unwrap();
        assert_eq!(result.text, "abc123");
        assert!(result.succeeded);
    }
}
