use crate::{ExecResult, Sandbox, validate_request_key};
use eyre::{Result, WrapErr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runs commands through a local shell, one directory per request under `root`.
#[derive(Clone, Debug)]
pub struct LocalSandbox {
    root: PathBuf,
    shell: String,
    command_timeout: Option<Duration>,
}

impl Default for LocalSandbox {
    fn default() -> Self {
        Self::new("sandbox")
    }
}

impl LocalSandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            shell: "bash".to_string(),
            command_timeout: None,
        }
    }

    pub fn shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }
}

impl Sandbox for LocalSandbox {
    async fn workdir(&self, request_key: &str) -> Result<PathBuf> {
        validate_request_key(request_key)?;
        let dir = self.root.join(request_key);
        // tmp/ is shared by every task of the request
        tokio::fs::create_dir_all(dir.join("tmp"))
            .await
            .wrap_err_with(|| format!("creating sandbox directory {}", dir.display()))?;
        Ok(dir)
    }

    async fn exec(&self, command: &str, workdir: &Path) -> Result<ExecResult> {
        tracing::debug!(%command, workdir = %workdir.display(), "sandbox exec");
        let mut cmd = tokio::process::Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(workdir)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);
        let output = match self.command_timeout {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| eyre::eyre!("command timed out after {timeout:?}"))?,
            None => cmd.output().await,
        }
        .wrap_err_with(|| format!("spawning {} for {command:?}", self.shell))?;

        Ok(ExecResult {
            exit_code: output.status.code().map(|code| code as isize).unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
