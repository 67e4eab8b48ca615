use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Failures inside the orchestration tree.
///
/// Each of these is wrapped into an [`AgentError`](crate::model::AgentError)
/// exactly once and sent to the parent of the node where it happened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("completion call failed: {0}")]
    CompletionCall(String),
    #[error("no JSON object found in the completion answer")]
    AnswerExtraction,
    #[error("unable to parse the completion answer: {0}")]
    AnswerParse(String),
    #[error("unknown tool {0:?} when determining a solution for the task")]
    ToolResolution(String),
    #[error("command failed: {0}")]
    CommandExecution(String),
    #[error("max attempts exceeded for terminal worker after {0} diagnose attempts")]
    RetryBudgetExhausted(usize),
    #[error("unable to hand work to the {0}")]
    Delivery(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CompletionCall(..) => ErrorKind::CompletionCallFailure,
            Error::AnswerExtraction => ErrorKind::AnswerExtractionFailure,
            Error::AnswerParse(..) => ErrorKind::AnswerParseFailure,
            Error::ToolResolution(..) => ErrorKind::ToolResolutionFailure,
            Error::CommandExecution(..) => ErrorKind::CommandExecutionFailure,
            Error::RetryBudgetExhausted(..) => ErrorKind::RetryBudgetExhausted,
            Error::Delivery(..) => ErrorKind::DeliveryFailure,
        }
    }

    pub(crate) fn completion(error: eyre::Report) -> Self {
        Error::CompletionCall(format!("{error:#}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::AnswerParse(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    CompletionCallFailure,
    AnswerExtractionFailure,
    AnswerParseFailure,
    ToolResolutionFailure,
    CommandExecutionFailure,
    RetryBudgetExhausted,
    DeliveryFailure,
}

/// Failures of a status query, raised by the root rather than inside a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("no request with id {0}")]
    NotFound(Uuid),
    #[error("timed out waiting for the status of request {0}")]
    Timeout(Uuid),
    #[error("planner for request {0} is not running")]
    Unavailable(Uuid),
    #[error("unable to build status: {0}")]
    Planner(String),
}
