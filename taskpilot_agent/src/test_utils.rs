//! Scripted collaborators for driving a tree without a model or a shell.

use crate::completion::{CompletionService, Prompt};
use eyre::Result;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use taskpilot_sandbox::{ExecResult, Sandbox, validate_request_key};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Reply {
    Answer(String),
    Fail(String),
    Panic(String),
}

#[derive(Default)]
struct CompletionScript {
    answers: HashMap<String, VecDeque<Reply>>,
    prompts: Vec<Prompt>,
}

/// Answers prompts from per-template queues and records every prompt.
/// A template with no queued answer fails the call.
#[derive(Clone, Default)]
pub struct ScriptedCompletion {
    script: Arc<Mutex<CompletionScript>>,
    delay: Option<Duration>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, template: &str, answer: impl Into<String>) -> Self {
        self.push(template, Reply::Answer(answer.into()))
    }

    pub fn fail(self, template: &str, message: impl Into<String>) -> Self {
        self.push(template, Reply::Fail(message.into()))
    }

    /// The call panics instead of answering, crashing whoever made it.
    pub fn panic(self, template: &str, message: impl Into<String>) -> Self {
        self.push(template, Reply::Panic(message.into()))
    }

    /// Holds every answer back for `delay`.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn push(self, template: &str, answer: Reply) -> Self {
        lock(&self.script)
            .answers
            .entry(template.to_string())
            .or_default()
            .push_back(answer);
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        lock(&self.script).prompts.clone()
    }

    pub fn calls(&self, template: &str) -> usize {
        lock(&self.script)
            .prompts
            .iter()
            .filter(|prompt| prompt.template() == template)
            .count()
    }
}

impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let answer = {
            let mut script = lock(&self.script);
            script.prompts.push(prompt.clone());
            script
                .answers
                .get_mut(prompt.template())
                .and_then(VecDeque::pop_front)
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match answer {
            Some(Reply::Answer(answer)) => Ok(answer),
            Some(Reply::Fail(message)) => Err(eyre::eyre!(message)),
            Some(Reply::Panic(message)) => panic!("{message}"),
            None => Err(eyre::eyre!("no scripted answer for {}", prompt.template())),
        }
    }
}

#[derive(Default)]
struct SandboxScript {
    outcomes: HashMap<String, VecDeque<Result<ExecResult, String>>>,
    executions: Vec<String>,
    workdirs: Vec<String>,
}

/// Runs nothing: every command gets its scripted outcome, and commands
/// without one exit with status 127.
#[derive(Clone, Default)]
pub struct ScriptedSandbox {
    script: Arc<Mutex<SandboxScript>>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(self, command: &str, stdout: impl Into<String>) -> Self {
        let result = ExecResult {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        };
        self.push(command, Ok(result))
    }

    pub fn fail(self, command: &str, exit_code: isize, stderr: impl Into<String>) -> Self {
        let result = ExecResult {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        };
        self.push(command, Ok(result))
    }

    pub fn transport_error(self, command: &str, message: impl Into<String>) -> Self {
        self.push(command, Err(message.into()))
    }

    fn push(self, command: &str, outcome: Result<ExecResult, String>) -> Self {
        lock(&self.script)
            .outcomes
            .entry(command.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn executions(&self) -> Vec<String> {
        lock(&self.script).executions.clone()
    }

    pub fn workdirs(&self) -> Vec<String> {
        lock(&self.script).workdirs.clone()
    }

    /// Most commands that were ever running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Sandbox for ScriptedSandbox {
    async fn workdir(&self, request_key: &str) -> Result<PathBuf> {
        validate_request_key(request_key)?;
        lock(&self.script).workdirs.push(request_key.to_string());
        Ok(PathBuf::from(request_key))
    }

    async fn exec(&self, command: &str, _workdir: &Path) -> Result<ExecResult> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        let outcome = {
            let mut script = lock(&self.script);
            script.executions.push(command.to_string());
            script
                .outcomes
                .get_mut(command)
                .and_then(VecDeque::pop_front)
        };
        tokio::task::yield_now().await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        match outcome {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(eyre::eyre!(message)),
            None => Ok(ExecResult {
                exit_code: 127,
                stdout: String::new(),
                stderr: format!("bash: {command}: command not found\n"),
            }),
        }
    }
}
