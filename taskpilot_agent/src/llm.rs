use eyre::Result;
use rig::completion::{AssistantContent, CompletionModel};
use rig::message::Message;

#[derive(Debug, Clone)]
pub struct Completion {
    pub prompt: String,
    pub preamble: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
}

impl Completion {
    pub fn new(prompt: String) -> Self {
        Self {
            prompt,
            preamble: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn preamble(mut self, preamble: String) -> Self {
        self.preamble = Some(preamble);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A text-in, text-out language model.
pub trait LLMClient: Send + Sync + 'static {
    fn completion(&self, completion: Completion) -> impl Future<Output = Result<String>> + Send;
}

/// Any rig completion model, e.g. `anthropic::Client::from_env().completion_model(..)`.
#[derive(Clone)]
pub struct RigClient<M> {
    model: M,
}

impl<M: CompletionModel> RigClient<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M> LLMClient for RigClient<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn completion(&self, completion: Completion) -> Result<String> {
        let mut request = self
            .model
            .completion_request(Message::user(completion.prompt));
        if let Some(preamble) = completion.preamble {
            request = request.preamble(preamble);
        }
        if let Some(temperature) = completion.temperature {
            request = request.temperature(temperature);
        }
        if let Some(max_tokens) = completion.max_tokens {
            request = request.max_tokens(max_tokens);
        }
        let response = request.send().await?;
        let text = response
            .choice
            .iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        eyre::ensure!(!text.is_empty(), "no text content in completion response");
        Ok(text)
    }
}
