use crate::actor::{Actor, Addr, Context, spawn};
use crate::answer::parse_solution;
use crate::completion::Prompt;
use crate::error::Error;
use crate::messages::{
    ExecuteCommand, NewSearch, PlanRequest, PlannerMsg, SearchMsg, SupervisorMsg, TerminalMsg,
};
use crate::model::{AgentError, AgentState, Solution, TaskHistory, TaskOutput, Tool};
use crate::search::SearchWorker;
use crate::services::Services;
use crate::terminal::TerminalWorker;
use eyre::Result;
use std::collections::VecDeque;
use uuid::Uuid;

/// Works through a plan one task at a time, with at most one worker alive.
pub struct Supervisor {
    parent: Addr<PlannerMsg>,
    services: Services,
    state: AgentState,
    request_id: Uuid,
    goal: String,
    queue: VecDeque<String>,
    history: Vec<TaskHistory>,
    in_flight: Option<Uuid>,
}

impl Supervisor {
    pub fn new(parent: Addr<PlannerMsg>, services: Services) -> Self {
        Self {
            parent,
            services,
            state: AgentState::Init,
            request_id: Uuid::nil(),
            goal: String::new(),
            queue: VecDeque::new(),
            history: Vec::new(),
            in_flight: None,
        }
    }

    fn start(&mut self, request: PlanRequest) {
        self.request_id = request.request_id;
        self.goal = request.plan.goal;
        self.queue = request.plan.tasks.into();
        tracing::info!(request_id = %self.request_id, tasks = self.queue.len(), "plan received");
    }

    /// Solves the front task of the queue and dispatches it to a worker.
    async fn next(&mut self, ctx: &mut Context<Self>) -> Result<()> {
        let Some(task) = self.queue.pop_front() else {
            self.finish(ctx, None);
            return Ok(());
        };
        self.state = AgentState::Thinking;
        let prompt = Prompt::Solution {
            goal: self.goal.clone(),
            task: task.clone(),
            history: self.history.clone(),
        };
        let answer = match self.services.completion.complete(&prompt).await {
            Ok(answer) => answer,
            Err(error) => {
                let error = AgentError::new(&Error::completion(error), &prompt);
                return self.escalate(ctx, error);
            }
        };
        let solution = match parse_solution(&answer) {
            Ok(solution) => solution,
            Err(error) => return self.escalate(ctx, AgentError::new(&error, &prompt)),
        };
        tracing::info!(request_id = %self.request_id, task = %task, tool = %solution.tool, input = %solution.primary_input(), "dispatching task");
        self.history.push(TaskHistory {
            task: task.clone(),
            solution: solution.clone(),
            result: None,
        });

        let sent = match solution.tool {
            Tool::Terminal => {
                let addr = spawn(TerminalWorker::new(ctx.addr(), self.services.clone()));
                addr.send(TerminalMsg::Execute(ExecuteCommand {
                    request_id: self.request_id,
                    command: solution.primary_input().to_string(),
                    reason: solution.reasoning.clone(),
                    task,
                }))
                .map(|()| addr.id())
            }
            Tool::Search => {
                let addr = spawn(SearchWorker::new(ctx.addr()));
                addr.send(SearchMsg::Search(NewSearch {
                    query: solution.primary_input().to_string(),
                    expected_outcome: solution.outcome.clone(),
                    limitations: solution.limitations.clone(),
                }))
                .map(|()| addr.id())
            }
        };
        self.dispatched(ctx, sent, &solution)
    }

    fn dispatched(
        &mut self,
        ctx: &mut Context<Self>,
        sent: Result<Uuid>,
        solution: &Solution,
    ) -> Result<()> {
        match sent {
            Ok(worker) => {
                self.in_flight = Some(worker);
                self.state = AgentState::Idle;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(request_id = %self.request_id, error = %format!("{error:#}"), "worker did not take the task");
                let error = Error::Delivery(format!("{} worker", solution.tool));
                self.escalate(ctx, AgentError::new(&error, solution))
            }
        }
    }

    async fn complete_task(&mut self, ctx: &mut Context<Self>, output: TaskOutput) -> Result<()> {
        if self.in_flight.take().is_none() {
            tracing::warn!(request_id = %self.request_id, "result without a running worker");
            return Ok(());
        }
        let Some(entry) = self.history.last_mut() else {
            return Ok(());
        };
        entry.result = Some(output.clone());
        let entry = entry.clone();
        tracing::info!(request_id = %self.request_id, task = %entry.task, remaining = self.queue.len(), "task completed");
        self.send(PlannerMsg::TaskResult(entry));
        if self.queue.is_empty() {
            self.finish(ctx, Some(output));
            Ok(())
        } else {
            self.next(ctx).await
        }
    }

    fn finish(&mut self, ctx: &mut Context<Self>, output: Option<TaskOutput>) {
        tracing::info!(request_id = %self.request_id, tasks = self.history.len(), "plan finished");
        self.state = AgentState::Finished;
        self.send(PlannerMsg::SupervisorComplete(output));
        ctx.stop();
    }

    fn escalate(&mut self, ctx: &mut Context<Self>, error: AgentError) -> Result<()> {
        tracing::error!(request_id = %self.request_id, error = %error, "supervisor failed");
        self.state = AgentState::Failed;
        self.send(PlannerMsg::ReportError(error));
        ctx.stop();
        Ok(())
    }

    fn send(&self, msg: PlannerMsg) {
        if let Err(error) = self.parent.send(msg) {
            tracing::warn!(request_id = %self.request_id, error = %error, "planner is gone");
        }
    }
}

impl Actor for Supervisor {
    type Message = SupervisorMsg;
    const NAME: &'static str = "supervisor";

    async fn handle(&mut self, ctx: &mut Context<Self>, msg: SupervisorMsg) -> Result<()> {
        match msg {
            SupervisorMsg::NewPlan(request) => {
                if self.state != AgentState::Init {
                    tracing::warn!(request_id = %request.request_id, "supervisor already has a plan");
                    return Ok(());
                }
                self.start(request);
                self.next(ctx).await
            }
            SupervisorMsg::CommandResult(result) => {
                let output = TaskOutput::Terminal {
                    output: result.output,
                    diagnostic_attempts: result.diagnostic_attempts,
                };
                self.complete_task(ctx, output).await
            }
            SupervisorMsg::SearchResult(result) => {
                let output = TaskOutput::Search {
                    result: result.result,
                };
                self.complete_task(ctx, output).await
            }
            SupervisorMsg::ReportError(error) => {
                self.in_flight = None;
                self.escalate(ctx, error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::channel;
    use crate::error::ErrorKind;
    use crate::model::Plan;
    use crate::test_utils::{ScriptedCompletion, ScriptedSandbox};

    fn plan(tasks: &[&str]) -> SupervisorMsg {
        SupervisorMsg::NewPlan(PlanRequest {
            request_id: Uuid::new_v4(),
            plan: Plan {
                goal: "tidy the workspace".to_string(),
                tasks: tasks.iter().map(|task| task.to_string()).collect(),
            },
        })
    }

    fn terminal(command: &str) -> String {
        format!(r#"{{"tool": "TERMINAL", "inputs": ["{command}"], "reasoning": "r", "limitations": "l", "outcome": "o"}}"#)
    }

    #[tokio::test]
    async fn reports_each_task_then_completes() {
        let completion = ScriptedCompletion::new()
            .answer("solution", terminal("ls"))
            .answer(
                "solution",
                r#"{"tool": "search", "inputs": ["what is tmp"], "outcome": "docs"}"#,
            );
        let sandbox = ScriptedSandbox::new().succeed("ls", "a.txt");
        let (parent, mut mailbox) = channel();
        let supervisor = spawn(Supervisor::new(
            parent,
            Services::new(completion.clone(), sandbox),
        ));
        supervisor.send(plan(&["list", "look up"])).unwrap();

        let mut received = Vec::new();
        while let Some(msg) = mailbox.recv().await {
            received.push(msg);
        }
        assert_eq!(received.len(), 3);
        let PlannerMsg::TaskResult(first) = &received[0] else {
            panic!("expected a task result");
        };
        assert_eq!(first.task, "list");
        assert_eq!(first.result.as_ref().map(TaskOutput::text), Some("a.txt"));
        let PlannerMsg::TaskResult(second) = &received[1] else {
            panic!("expected a task result");
        };
        assert_eq!(second.task, "look up");
        assert_eq!(second.solution.tool, Tool::Search);
        let PlannerMsg::SupervisorComplete(Some(TaskOutput::Search { .. })) = &received[2] else {
            panic!("expected completion with the search result");
        };

        let prompts = completion.prompts();
        let Prompt::Solution { history, .. } = &prompts[1] else {
            panic!("expected a solution prompt");
        };
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].task, "list");
    }

    #[tokio::test]
    async fn rejects_unknown_tools() {
        let completion = ScriptedCompletion::new().answer(
            "solution",
            r#"{"tool": "ROCKET_SHIP", "inputs": ["launch"]}"#,
        );
        let sandbox = ScriptedSandbox::new();
        let (parent, mut mailbox) = channel();
        let supervisor = spawn(Supervisor::new(
            parent,
            Services::new(completion, sandbox.clone()),
        ));
        supervisor.send(plan(&["fly"])).unwrap();

        let Some(PlannerMsg::ReportError(error)) = mailbox.recv().await else {
            panic!("expected an error report");
        };
        assert_eq!(error.kind, ErrorKind::ToolResolutionFailure);
        assert_eq!(error.context["task"], "fly");
        assert!(mailbox.recv().await.is_none());
        assert!(sandbox.executions().is_empty());
    }

    #[tokio::test]
    async fn escalates_completion_failures() {
        let completion = ScriptedCompletion::new().fail("solution", "rate limited");
        let (parent, mut mailbox) = channel();
        let supervisor = spawn(Supervisor::new(
            parent,
            Services::new(completion, ScriptedSandbox::new()),
        ));
        supervisor.send(plan(&["anything"])).unwrap();

        let Some(PlannerMsg::ReportError(error)) = mailbox.recv().await else {
            panic!("expected an error report");
        };
        assert_eq!(error.kind, ErrorKind::CompletionCallFailure);
        assert!(error.message.contains("rate limited"));
        assert!(mailbox.recv().await.is_none());
    }

    #[tokio::test]
    async fn empty_plan_completes_without_output() {
        let (parent, mut mailbox) = channel();
        let supervisor = spawn(Supervisor::new(
            parent,
            Services::new(ScriptedCompletion::new(), ScriptedSandbox::new()),
        ));
        supervisor.send(plan(&[])).unwrap();
        assert!(matches!(
            mailbox.recv().await,
            Some(PlannerMsg::SupervisorComplete(None))
        ));
        assert!(mailbox.recv().await.is_none());
    }

    #[tokio::test]
    async fn undelivered_task_is_escalated_once() {
        let (parent, mut mailbox) = channel();
        let mut supervisor = Supervisor::new(
            parent,
            Services::new(ScriptedCompletion::new(), ScriptedSandbox::new()),
        );
        let (addr, _inbox) = channel::<SupervisorMsg>();
        let mut ctx = Context::<Supervisor>::new(addr);
        let solution = Solution {
            tool: Tool::Terminal,
            inputs: vec!["ls".to_string()],
            reasoning: String::new(),
            limitations: String::new(),
            outcome: String::new(),
        };
        supervisor
            .dispatched(&mut ctx, Err(eyre::eyre!("actor is no longer running")), &solution)
            .unwrap();
        assert_eq!(supervisor.state, AgentState::Failed);
        assert!(supervisor.in_flight.is_none());
        drop(supervisor);

        let Some(PlannerMsg::ReportError(error)) = mailbox.recv().await else {
            panic!("expected an error report");
        };
        assert_eq!(error.kind, ErrorKind::DeliveryFailure);
        assert_eq!(error.message, "unable to hand work to the terminal worker");
        assert_eq!(error.context["inputs"][0], "ls");
        assert!(mailbox.recv().await.is_none());
    }
}
