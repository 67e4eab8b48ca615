use crate::{ExecResult, Sandbox, validate_request_key};
use eyre::Result;
use std::path::{Path, PathBuf};

/// A sandbox that runs nothing: every command succeeds with empty output.
#[derive(Clone, Debug, Default)]
pub struct NoOpSandbox;

impl NoOpSandbox {
    pub fn new() -> Self {
        Self
    }
}

impl Sandbox for NoOpSandbox {
    async fn workdir(&self, request_key: &str) -> Result<PathBuf> {
        validate_request_key(request_key)?;
        Ok(PathBuf::from(request_key))
    }

    async fn exec(&self, _command: &str, _workdir: &Path) -> Result<ExecResult> {
        Ok(ExecResult {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}
