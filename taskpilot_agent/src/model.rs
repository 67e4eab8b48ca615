use crate::error::{Error, ErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle of every node in the tree. `Failed` and `Finished` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Init,
    Thinking,
    Idle,
    Failed,
    Finished,
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Failed | AgentState::Finished)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Init => "init",
            AgentState::Thinking => "thinking",
            AgentState::Idle => "idle",
            AgentState::Failed => "failed",
            AgentState::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub request_id: Uuid,
    pub goal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    pub tasks: Vec<String>,
}

/// The tools a supervisor can dispatch a task to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Terminal,
    Search,
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terminal" => Ok(Tool::Terminal),
            "search" => Ok(Tool::Search),
            _ => Err(Error::ToolResolution(s.to_string())),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Terminal => f.write_str("terminal"),
            Tool::Search => f.write_str("search"),
        }
    }
}

/// How the supervisor decided to solve one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub tool: Tool,
    pub inputs: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub limitations: String,
    #[serde(default)]
    pub outcome: String,
}

impl Solution {
    /// The input handed to the worker: the command or the search query.
    pub fn primary_input(&self) -> &str {
        self.inputs.first().map(String::as_str).unwrap_or_default()
    }
}

/// One command a terminal worker ran, kept in its local retry history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub command: String,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: String,
}

/// What a worker produced for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum TaskOutput {
    Terminal {
        output: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        diagnostic_attempts: Vec<Attempt>,
    },
    Search {
        result: String,
    },
}

impl TaskOutput {
    pub fn text(&self) -> &str {
        match self {
            TaskOutput::Terminal { output, .. } => output,
            TaskOutput::Search { result } => result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHistory {
    pub task: String,
    pub solution: Solution,
    pub result: Option<TaskOutput>,
}

/// A failure travelling up the tree. `context` is the message that was being
/// processed when it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentError {
    pub message: String,
    pub kind: ErrorKind,
    pub context: JsonValue,
    pub time: DateTime<Utc>,
}

impl AgentError {
    pub fn new(error: &Error, context: &impl Serialize) -> Self {
        Self {
            message: error.to_string(),
            kind: error.kind(),
            context: serde_json::to_value(context).unwrap_or(JsonValue::Null),
            time: Utc::now(),
        }
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Snapshot returned by a status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub planner: PlannerStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerStatus {
    pub state: AgentState,
    pub plan: Option<Plan>,
    pub history: Vec<TaskHistory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AgentError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
