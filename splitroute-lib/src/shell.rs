use thiserror::Error;
use tokio::process::Command;

use std::future::Future;
use std::io;

#[derive(Debug, Error)]
pub enum Error {
    #[error("command execution failed")]
    CommandFailed,
    #[error("IO error: {0}")]
    IO(#[from] io::Error),
}

pub trait CommandExt {
    fn run(&mut self) -> impl Future<Output = Result<(), Error>> + Send;
    fn run_stdout(&mut self) -> impl Future<Output = Result<String, Error>> + Send;
}

impl CommandExt for Command {
    /// Run the command, discarding stdout. Non empty stderr on a successful
    /// exit is logged as a warning; failures are logged with both streams.
    async fn run(&mut self) -> Result<(), Error> {
        let output = self.output().await?;
        match (output.stderr.is_empty(), output.status) {
            (true, status) if status.success() => Ok(()),
            (false, status) if status.success() => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::warn!(cmd = ?self, %stderr, "non empty stderr on successful command");
                Ok(())
            }
            (_, status) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::error!(cmd = ?self, status_code = ?status.code(), %stdout, %stderr, "error executing command");
                Err(Error::CommandFailed)
            }
        }
    }

    /// Run the command and return trimmed stdout.
    async fn run_stdout(&mut self) -> Result<String, Error> {
        let output = self.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        match (output.stderr.is_empty(), output.status) {
            (true, status) if status.success() => Ok(stdout.trim().to_string()),
            (false, status) if status.success() => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::warn!(cmd = ?self, %stderr, "non empty stderr on successful command");
                Ok(stdout.trim().to_string())
            }
            (_, status) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::error!(cmd = ?self, status_code = ?status.code(), %stdout, %stderr, "error executing command");
                Err(Error::CommandFailed)
            }
        }
    }
}
