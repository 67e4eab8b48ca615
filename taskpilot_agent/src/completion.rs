use crate::llm::{Completion, LLMClient};
use crate::model::{Attempt, TaskHistory};
use crate::prompts;
use eyre::Result;
use serde::Serialize;
use std::pin::Pin;
use tera::{Context, Tera};

/// A prompt template together with the variables it is rendered with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Prompt {
    Plan {
        goal: String,
    },
    Solution {
        goal: String,
        task: String,
        history: Vec<TaskHistory>,
    },
    Diagnose {
        task: String,
        previous_attempts: Vec<Attempt>,
    },
}

impl Prompt {
    pub fn template(&self) -> &'static str {
        match self {
            Prompt::Plan { .. } => "plan",
            Prompt::Solution { .. } => "solution",
            Prompt::Diagnose { .. } => "diagnose",
        }
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        match self {
            Prompt::Plan { goal } => {
                context.insert("goal", goal);
            }
            Prompt::Solution {
                goal,
                task,
                history,
            } => {
                context.insert("goal", goal);
                context.insert("task", task);
                context.insert("history", history);
            }
            Prompt::Diagnose {
                task,
                previous_attempts,
            } => {
                context.insert("task", task);
                context.insert("previous_attempts", previous_attempts);
            }
        }
        context
    }
}

/// Turns a prompt into free text. The text is untrusted.
pub trait CompletionService: Send + Sync + 'static {
    fn complete(&self, prompt: &Prompt) -> impl Future<Output = Result<String>> + Send;
}

pub trait CompletionServiceDyn: Send + Sync {
    fn complete<'a>(
        &'a self,
        prompt: &'a Prompt,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

impl<T: CompletionService> CompletionServiceDyn for T {
    fn complete<'a>(
        &'a self,
        prompt: &'a Prompt,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(CompletionService::complete(self, prompt))
    }
}

/// Renders prompts from the built-in templates and sends them to an [`LLMClient`].
pub struct PromptedCompletion<C> {
    client: C,
    tera: Tera,
    preamble: Option<String>,
    temperature: f64,
    max_tokens: u64,
}

impl<C: LLMClient> PromptedCompletion<C> {
    pub fn new(client: C) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("plan", prompts::PLAN),
            ("solution", prompts::SOLUTION),
            ("diagnose", prompts::DIAGNOSE),
        ])?;
        Ok(Self {
            client,
            tera,
            preamble: Some(prompts::PREAMBLE.to_string()),
            temperature: 0.2,
            max_tokens: 2048,
        })
    }

    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn render(&self, prompt: &Prompt) -> Result<String> {
        Ok(self.tera.render(prompt.template(), &prompt.context())?)
    }
}

impl<C: LLMClient> CompletionService for PromptedCompletion<C> {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let rendered = self.render(prompt)?;
        tracing::debug!(template = prompt.template(), "sending completion");
        let mut completion = Completion::new(rendered)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        if let Some(preamble) = &self.preamble {
            completion = completion.preamble(preamble.clone());
        }
        LLMClient::completion(&self.client, completion).await
    }
}
