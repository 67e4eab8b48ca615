pub mod local;
pub mod noop;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::pin::Pin;

pub use local::LocalSandbox;
pub use noop::NoOpSandbox;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResult {
    pub exit_code: isize,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr, the way a terminal user would read them.
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}{}", self.stdout, self.stderr),
        }
    }
}

/// Command execution scoped to one working directory per request.
///
/// `exec` returns `Err` only when the command could not be run at all
/// (spawn failure, timeout). A command that ran and exited non-zero is
/// reported through [`ExecResult::exit_code`].
pub trait Sandbox {
    fn workdir(&self, request_key: &str) -> impl Future<Output = Result<PathBuf>> + Send;
    fn exec(&self, command: &str, workdir: &Path) -> impl Future<Output = Result<ExecResult>> + Send;

    fn boxed(self) -> Box<dyn SandboxDyn>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Box::new(self)
    }
}

pub trait SandboxDyn: Send + Sync {
    fn workdir<'a>(
        &'a self,
        request_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;
    fn exec<'a>(
        &'a self,
        command: &'a str,
        workdir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<ExecResult>> + Send + 'a>>;
}

impl<T: Sandbox + Send + Sync + 'static> SandboxDyn for T {
    fn workdir<'a>(
        &'a self,
        request_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>> {
        Box::pin(Sandbox::workdir(self, request_key))
    }

    fn exec<'a>(
        &'a self,
        command: &'a str,
        workdir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<ExecResult>> + Send + 'a>> {
        Box::pin(Sandbox::exec(self, command, workdir))
    }
}

/// Request keys become directory names, so they must stay a single path component.
pub fn validate_request_key(request_key: &str) -> Result<()> {
    eyre::ensure!(!request_key.is_empty(), "empty request key");
    eyre::ensure!(
        !request_key.contains(['/', '\\']) && request_key != "." && !request_key.contains(".."),
        "request key {request_key:?} is not a single path component"
    );
    Ok(())
}
