//! A minimal actor runtime on top of tokio tasks.
//!
//! Every actor owns one unbounded mailbox and handles its messages strictly
//! one at a time, in arrival order. Supervised actors are rebuilt from a
//! factory after a crash and keep draining the same mailbox, so addresses
//! handed out before the crash stay valid.

use eyre::Result;
use futures::FutureExt;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub trait Actor: Send + Sized + 'static {
    type Message: Send + 'static;
    const NAME: &'static str;

    fn handle(
        &mut self,
        ctx: &mut Context<Self>,
        msg: Self::Message,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Runs on the replacement built after a supervised crash, before it
    /// handles any further message. An error here ends the actor.
    fn restarted(&mut self, _ctx: &mut Context<Self>, _reason: &str) -> Result<()> {
        Ok(())
    }
}

pub struct Addr<M> {
    id: Uuid,
    sender: mpsc::UnboundedSender<M>,
}

impl<M> Clone for Addr<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sender: self.sender.clone(),
        }
    }
}

impl<M> fmt::Debug for Addr<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Addr").field("id", &self.id).finish()
    }
}

impl<M: Send + 'static> Addr<M> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queues a message. Fails once the receiving actor is gone.
    pub fn send(&self, msg: M) -> Result<()> {
        self.sender
            .send(msg)
            .map_err(|_| eyre::eyre!("actor {} is no longer running", self.id))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the receiving actor has dropped its mailbox.
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

pub struct Mailbox<M> {
    receiver: mpsc::UnboundedReceiver<M>,
}

impl<M> Mailbox<M> {
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }
}

/// A detached address and mailbox pair.
pub fn channel<M>() -> (Addr<M>, Mailbox<M>) {
    let id = Uuid::now_v7();
    let (sender, receiver) = mpsc::unbounded_channel();
    (Addr { id, sender }, Mailbox { receiver })
}

pub struct Context<A: Actor> {
    addr: Addr<A::Message>,
    stopped: bool,
}

impl<A: Actor> Context<A> {
    pub(crate) fn new(addr: Addr<A::Message>) -> Self {
        Self {
            addr,
            stopped: false,
        }
    }

    pub fn addr(&self) -> Addr<A::Message> {
        self.addr.clone()
    }

    pub fn id(&self) -> Uuid {
        self.addr.id
    }

    /// Ends the actor after the current message. Queued messages are dropped.
    pub fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Runs `actor` without restarts. A handler error or panic ends it.
pub fn spawn<A: Actor>(actor: A) -> Addr<A::Message> {
    let (addr, mut mailbox) = channel::<A::Message>();
    let span = tracing::info_span!("actor", name = A::NAME, id = %addr.id());
    let mut ctx = Context::<A>::new(addr.clone());
    tokio::spawn(
        async move {
            let mut actor = actor;
            while let Some(msg) = mailbox.recv().await {
                if let Err(error) = actor.handle(&mut ctx, msg).await {
                    tracing::error!(error = %format!("{error:#}"), "actor failed");
                    break;
                }
                if ctx.stopped {
                    break;
                }
            }
            tracing::debug!("actor stopped");
        }
        .instrument(span),
    );
    addr
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub max_restarts: usize,
    pub within: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 3,
            within: Duration::from_secs(10),
        }
    }
}

impl RestartPolicy {
    pub fn never() -> Self {
        Self {
            max_restarts: 0,
            within: Duration::ZERO,
        }
    }
}

/// Restarts granted inside the policy's rolling window.
#[derive(Debug)]
pub struct RestartWindow {
    policy: RestartPolicy,
    restarts: VecDeque<Instant>,
}

impl RestartWindow {
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            restarts: VecDeque::new(),
        }
    }

    /// Records a restart at `now` if the budget allows it.
    pub fn allow(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.restarts.front() {
            if now.duration_since(oldest) > self.policy.within {
                self.restarts.pop_front();
            } else {
                break;
            }
        }
        if self.restarts.len() >= self.policy.max_restarts {
            return false;
        }
        self.restarts.push_back(now);
        true
    }

    pub fn len(&self) -> usize {
        self.restarts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restarts.is_empty()
    }
}

/// Runs an actor built by `factory`, rebuilding it whenever a handler returns
/// an error or panics, as long as `policy` allows.
pub fn spawn_supervised<A, F>(mut factory: F, policy: RestartPolicy) -> Addr<A::Message>
where
    A: Actor,
    F: FnMut() -> A + Send + 'static,
{
    let (addr, mut mailbox) = channel::<A::Message>();
    let span = tracing::info_span!("actor", name = A::NAME, id = %addr.id());
    let ctx_addr = addr.clone();
    tokio::spawn(
        async move {
            let mut window = RestartWindow::new(policy);
            let mut actor = factory();
            let mut ctx = Context::<A>::new(ctx_addr.clone());
            while let Some(msg) = mailbox.recv().await {
                let outcome = AssertUnwindSafe(actor.handle(&mut ctx, msg))
                    .catch_unwind()
                    .await;
                let crash = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(error)) => Some(format!("{error:#}")),
                    Err(panic) => Some(panic_message(panic.as_ref())),
                };
                if let Some(reason) = crash {
                    if !window.allow(Instant::now()) {
                        tracing::error!(reason, "restart budget exhausted, giving up");
                        break;
                    }
                    tracing::warn!(reason, restarts = window.len(), "actor crashed, restarting");
                    actor = factory();
                    ctx = Context::new(ctx_addr.clone());
                    if let Err(error) = actor.restarted(&mut ctx, &reason) {
                        tracing::error!(error = %format!("{error:#}"), "restart failed");
                        break;
                    }
                    continue;
                }
                if ctx.stopped {
                    break;
                }
            }
            tracing::debug!("actor stopped");
        }
        .instrument(span),
    );
    addr
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
