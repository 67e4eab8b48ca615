//! Messages exchanged between the nodes of one goal's tree.

use crate::error::Error;
use crate::model::{AgentError, Attempt, Goal, Plan, Status, TaskHistory, TaskOutput};
use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

#[derive(Debug)]
pub enum PlannerMsg {
    NewGoal(Goal),
    GetStatus(oneshot::Sender<Result<Status, Error>>),
    TaskResult(TaskHistory),
    SupervisorComplete(Option<TaskOutput>),
    ReportError(AgentError),
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanRequest {
    pub request_id: Uuid,
    pub plan: Plan,
}

#[derive(Debug, Clone, Serialize)]
pub enum SupervisorMsg {
    NewPlan(PlanRequest),
    CommandResult(CommandResult),
    SearchResult(SearchResult),
    ReportError(AgentError),
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub output: String,
    pub diagnostic_attempts: Vec<Attempt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub result: String,
}

#[derive(Debug, Clone, Serialize)]
pub enum TerminalMsg {
    Execute(ExecuteCommand),
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteCommand {
    pub request_id: Uuid,
    pub command: String,
    pub reason: String,
    pub task: String,
}

#[derive(Debug, Clone, Serialize)]
pub enum SearchMsg {
    Search(NewSearch),
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSearch {
    pub query: String,
    pub expected_outcome: String,
    pub limitations: String,
}
