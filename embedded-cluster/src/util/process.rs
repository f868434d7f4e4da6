//! External process invocation.
//!
//! Every call to the distribution binary, the service manager or the
//! preflight runner goes through a [`CommandRunner`]. Proxy and kubeconfig
//! environment is attached per command here instead of being written into
//! the process environment.

use async_trait::async_trait;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn envs<I>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.envs.extend(envs);
        self
    }

    /// Program file name, used to match commands in logs and fakes.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Human-readable command line.
    pub fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external processes to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and capture its output regardless of exit status.
    ///
    /// Errors only when the process could not be spawned or awaited.
    async fn output(&self, cmd: &CommandSpec) -> ClusterResult<CommandOutput>;

    /// Run the command and return stdout, failing on non-zero exit.
    async fn run(&self, cmd: &CommandSpec) -> ClusterResult<String> {
        tracing::debug!(command = %cmd.display(), "running command");
        let output = self.output(cmd).await?;
        if output.success() {
            return Ok(output.stdout);
        }

        tracing::debug!(command = %cmd.display(), code = ?output.code, "failed to run command");
        tracing::debug!("stdout: {}", output.stdout);
        tracing::debug!("stderr: {}", output.stderr);
        Err(ClusterError::Command {
            command: cmd.display(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Spawns real host processes with tokio.
///
/// A started process is always awaited; cancellation is never applied to
/// a running child.
#[derive(Debug, Default, Clone)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn output(&self, cmd: &CommandSpec) -> ClusterResult<CommandOutput> {
        let output = tokio::process::Command::new(&cmd.program)
            .args(&cmd.args)
            .envs(cmd.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ClusterError::Command {
                command: cmd.display(),
                code: None,
                stderr: format!("failed to spawn: {e}"),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
