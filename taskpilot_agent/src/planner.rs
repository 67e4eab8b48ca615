use crate::actor::{Actor, Context, spawn};
use crate::answer::parse_tasks;
use crate::completion::Prompt;
use crate::error::Error;
use crate::messages::{PlanRequest, PlannerMsg, SupervisorMsg};
use crate::model::{AgentError, AgentState, Goal, Plan, PlannerStatus, Status, TaskHistory};
use crate::services::Services;
use crate::supervisor::Supervisor;
use eyre::Result;
use uuid::Uuid;

pub const EMPTY_PLAN_NOTE: &str = "unable to build a plan from the goal";

/// Top of one goal's tree: decomposes the goal into tasks and keeps the
/// history the supervisor reports back.
///
/// Only planning can crash a planner; everything after the hand-off to the
/// supervisor is infallible. A restarted planner therefore plans its goal
/// again from scratch.
pub struct Planner {
    request_id: Uuid,
    services: Services,
    state: AgentState,
    goal: Option<Goal>,
    answer: Option<String>,
    planned: bool,
    history: Vec<TaskHistory>,
    error: Option<AgentError>,
    note: Option<String>,
}

impl Planner {
    pub fn new(request_id: Uuid, services: Services) -> Self {
        Self {
            request_id,
            services,
            state: AgentState::Init,
            goal: None,
            answer: None,
            planned: false,
            history: Vec::new(),
            error: None,
            note: None,
        }
    }

    /// Remembers the goal so a replacement built after a crash can plan it again.
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = Some(goal);
        self
    }

    async fn plan(&mut self, ctx: &mut Context<Self>, goal: Goal) {
        if self.state != AgentState::Init {
            tracing::warn!(request_id = %self.request_id, "planner already has a goal");
            return;
        }
        self.state = AgentState::Thinking;
        self.goal = Some(goal.clone());
        tracing::info!(request_id = %self.request_id, goal = %goal.goal, "planning");

        let prompt = Prompt::Plan {
            goal: goal.goal.clone(),
        };
        let answer = match self.services.completion.complete(&prompt).await {
            Ok(answer) => answer,
            Err(error) => {
                self.fail(AgentError::new(&Error::completion(error), &goal));
                return;
            }
        };
        self.answer = Some(answer.clone());
        let tasks = match parse_tasks(&answer) {
            Ok(tasks) => tasks,
            Err(error) => {
                self.fail(AgentError::new(&error, &goal));
                return;
            }
        };
        self.planned = true;
        if tasks.is_empty() {
            tracing::info!(request_id = %self.request_id, "empty plan");
            self.state = AgentState::Finished;
            self.note = Some(EMPTY_PLAN_NOTE.to_string());
            return;
        }

        tracing::info!(request_id = %self.request_id, tasks = tasks.len(), "plan ready");
        let supervisor = spawn(Supervisor::new(ctx.addr(), self.services.clone()));
        let sent = supervisor.send(SupervisorMsg::NewPlan(PlanRequest {
            request_id: self.request_id,
            plan: Plan {
                goal: goal.goal.clone(),
                tasks,
            },
        }));
        self.hand_off(sent, &goal);
    }

    fn hand_off(&mut self, sent: Result<()>, goal: &Goal) {
        match sent {
            Ok(()) => self.state = AgentState::Idle,
            Err(error) => {
                tracing::warn!(request_id = %self.request_id, error = %format!("{error:#}"), "supervisor did not take the plan");
                self.fail(AgentError::new(&Error::Delivery("supervisor".to_string()), goal));
            }
        }
    }

    /// A failed planner keeps answering status queries.
    fn fail(&mut self, error: AgentError) {
        tracing::error!(request_id = %self.request_id, error = %error, "goal failed");
        self.state = AgentState::Failed;
        self.error = Some(error);
    }

    /// The plan is re-derived from the stored answer once one has parsed.
    pub fn status(&self) -> Result<Status, Error> {
        let plan = match (&self.answer, self.planned) {
            (Some(answer), true) => Some(Plan {
                goal: self
                    .goal
                    .as_ref()
                    .map(|goal| goal.goal.clone())
                    .unwrap_or_default(),
                tasks: parse_tasks(answer)?,
            }),
            _ => None,
        };
        Ok(Status {
            planner: PlannerStatus {
                state: self.state,
                plan,
                history: self.history.clone(),
                error: self.error.clone(),
                note: self.note.clone(),
            },
        })
    }
}

impl Actor for Planner {
    type Message = PlannerMsg;
    const NAME: &'static str = "planner";

    async fn handle(&mut self, ctx: &mut Context<Self>, msg: PlannerMsg) -> Result<()> {
        match msg {
            PlannerMsg::NewGoal(goal) => self.plan(ctx, goal).await,
            PlannerMsg::GetStatus(reply) => {
                if reply.send(self.status()).is_err() {
                    tracing::debug!(request_id = %self.request_id, "status requester went away");
                }
            }
            _ if self.state.is_terminal() => {
                tracing::warn!(request_id = %self.request_id, state = %self.state, "ignoring message after terminal state");
            }
            PlannerMsg::TaskResult(entry) => {
                tracing::info!(request_id = %self.request_id, task = %entry.task, "task result");
                self.history.push(entry);
                self.state = AgentState::Idle;
            }
            PlannerMsg::SupervisorComplete(output) => {
                tracing::info!(request_id = %self.request_id, has_output = output.is_some(), "goal finished");
                self.state = AgentState::Finished;
            }
            PlannerMsg::ReportError(error) => self.fail(error),
        }
        Ok(())
    }

    fn restarted(&mut self, ctx: &mut Context<Self>, reason: &str) -> Result<()> {
        tracing::warn!(request_id = %self.request_id, reason, "planner restarted");
        self.note = Some(format!("restarted after crash: {reason}"));
        match self.goal.clone() {
            Some(goal) => ctx.addr().send(PlannerMsg::NewGoal(goal)),
            None => Ok(()),
        }
    }
}
