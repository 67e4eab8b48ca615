use crate::completion::{CompletionService, CompletionServiceDyn};
use crate::config::AgentConfig;
use std::sync::Arc;
use taskpilot_sandbox::{Sandbox, SandboxDyn};

/// External collaborators shared by every actor in the tree.
#[derive(Clone)]
pub struct Services {
    pub completion: Arc<dyn CompletionServiceDyn>,
    pub sandbox: Arc<dyn SandboxDyn>,
    pub config: AgentConfig,
}

impl Services {
    pub fn new(
        completion: impl CompletionService,
        sandbox: impl Sandbox + Send + Sync + 'static,
    ) -> Self {
        Self {
            completion: Arc::new(completion),
            sandbox: Arc::new(sandbox),
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }
}
