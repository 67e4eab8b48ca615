//! The terminal worker runs one command and, when it fails, asks the
//! completion service for a replacement until one succeeds or the diagnose
//! budget runs out. It reports exactly once and stops.

use crate::actor::{Actor, Addr, Context};
use crate::answer::parse_diagnosis;
use crate::completion::Prompt;
use crate::error::Error;
use crate::messages::{CommandResult, ExecuteCommand, SupervisorMsg, TerminalMsg};
use crate::model::{AgentError, AgentState, Attempt};
use crate::services::Services;
use eyre::Result;
use std::path::Path;

pub struct TerminalWorker {
    parent: Addr<SupervisorMsg>,
    services: Services,
    state: AgentState,
}

impl TerminalWorker {
    pub fn new(parent: Addr<SupervisorMsg>, services: Services) -> Self {
        Self {
            parent,
            services,
            state: AgentState::Init,
        }
    }

    /// Output of a successful command, or the output and error of a failed one.
    async fn run(&self, command: &str, workdir: &Path) -> Result<String, (String, String)> {
        match self.services.sandbox.exec(command, workdir).await {
            Ok(result) if result.success() => Ok(result.combined_output()),
            Ok(result) => {
                let output = result.combined_output();
                let error = format!("exit status {}: {}", result.exit_code, output.trim_end());
                Err((output, error))
            }
            Err(error) => Err((String::new(), format!("{error:#}"))),
        }
    }

    async fn execute(&self, request: &ExecuteCommand) -> Result<CommandResult, AgentError> {
        let workdir = self
            .services
            .sandbox
            .workdir(&request.request_id.to_string())
            .await
            .map_err(|error| {
                AgentError::new(&Error::CommandExecution(format!("{error:#}")), request)
            })?;

        let max_attempts = self.services.config.max_attempts;
        let mut budget = max_attempts;
        let mut attempts = Vec::new();
        let mut command = request.command.clone();
        let mut reason = request.reason.clone();
        loop {
            match self.run(&command, &workdir).await {
                Ok(output) => {
                    return Ok(CommandResult {
                        output,
                        diagnostic_attempts: attempts,
                    });
                }
                Err((output, error)) => {
                    tracing::warn!(request_id = %request.request_id, command = %command, error = %error, "command failed");
                    attempts.push(Attempt {
                        command,
                        output,
                        error: Some(error),
                        reason,
                    });
                }
            }

            let prompt = Prompt::Diagnose {
                task: request.task.clone(),
                previous_attempts: attempts.clone(),
            };
            if budget == 0 {
                let error = Error::RetryBudgetExhausted(max_attempts);
                return Err(AgentError::new(&error, &prompt));
            }
            budget -= 1;

            let answer = self
                .services
                .completion
                .complete(&prompt)
                .await
                .map_err(|error| AgentError::new(&Error::completion(error), &prompt))?;
            let diagnosis =
                parse_diagnosis(&answer).map_err(|error| AgentError::new(&error, &prompt))?;
            tracing::info!(request_id = %request.request_id, command = %diagnosis.command, reason = %diagnosis.reason, remaining = budget, "trying diagnosed command");
            command = diagnosis.command;
            reason = diagnosis.reason;
        }
    }
}

impl Actor for TerminalWorker {
    type Message = TerminalMsg;
    const NAME: &'static str = "terminal";

    async fn handle(&mut self, ctx: &mut Context<Self>, msg: TerminalMsg) -> Result<()> {
        let TerminalMsg::Execute(request) = msg;
        self.state = AgentState::Thinking;
        tracing::info!(request_id = %request.request_id, command = %request.command, "executing command");
        let report = match self.execute(&request).await {
            Ok(result) => {
                self.state = AgentState::Finished;
                SupervisorMsg::CommandResult(result)
            }
            Err(error) => {
                tracing::error!(request_id = %request.request_id, error = %error, "terminal worker failed");
                self.state = AgentState::Failed;
                SupervisorMsg::ReportError(error)
            }
        };
        if let Err(error) = self.parent.send(report) {
            tracing::warn!(request_id = %request.request_id, error = %error, "supervisor is gone");
        }
        tracing::debug!(request_id = %request.request_id, state = %self.state, "terminal worker done");
        ctx.stop();
        Ok(())
    }
}
