pub mod actor;
pub mod answer;
pub mod completion;
pub mod config;
pub mod error;
pub mod llm;
pub mod messages;
pub mod model;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod search;
pub mod services;
pub mod supervisor;
pub mod terminal;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use completion::{CompletionService, CompletionServiceDyn, Prompt, PromptedCompletion};
pub use config::AgentConfig;
pub use error::{Error, ErrorKind, StatusError};
pub use llm::{LLMClient, RigClient};
pub use model::{AgentError, AgentState, Status};
pub use orchestrator::Orchestrator;
pub use services::Services;
