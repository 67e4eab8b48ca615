use clap::Parser;
use eyre::Result;
use rig::client::{CompletionClient, ProviderClient};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use taskpilot_agent::{AgentConfig, Orchestrator, PromptedCompletion, RigClient, Services};
use taskpilot_sandbox::{LocalSandbox, NoOpSandbox};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskpilot")]
#[command(about = "Plans goals into tasks and runs them in a sandboxed shell")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "TASKPILOT_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Anthropic model used for planning, solving and diagnosing
    #[arg(long, env = "TASKPILOT_MODEL", default_value = "claude-sonnet-4-20250514")]
    model: String,

    /// Directory holding one working directory per request
    #[arg(long, env = "TASKPILOT_SANDBOX_ROOT", default_value = "sandbox")]
    sandbox_root: PathBuf,

    /// Shell that runs every command as `<shell> -c <command>`
    #[arg(long, env = "TASKPILOT_SHELL", default_value = "bash")]
    shell: String,

    /// Accept every command without running it
    #[arg(long, env = "TASKPILOT_DRY_RUN")]
    dry_run: bool,

    /// Diagnose rounds allowed after a command fails
    #[arg(long, env = "TASKPILOT_MAX_ATTEMPTS", default_value_t = 5)]
    max_attempts: usize,

    #[arg(long, env = "TASKPILOT_STATUS_TIMEOUT_SECS", default_value_t = 60)]
    status_timeout_secs: u64,

    /// Kill commands that run longer than this
    #[arg(long, env = "TASKPILOT_COMMAND_TIMEOUT_SECS")]
    command_timeout_secs: Option<u64>,

    /// How long open connections may take to finish after a shutdown signal
    #[arg(long, env = "TASKPILOT_SHUTDOWN_GRACE_SECS", default_value_t = 15)]
    shutdown_grace_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let client = rig::providers::anthropic::Client::from_env();
    let completion = PromptedCompletion::new(RigClient::new(client.completion_model(&args.model)))?;

    let config = AgentConfig::default()
        .max_attempts(args.max_attempts)
        .status_timeout(Duration::from_secs(args.status_timeout_secs));
    let services = if args.dry_run {
        tracing::warn!("dry run, commands are not executed");
        Services::new(completion, NoOpSandbox::new())
    } else {
        let mut sandbox = LocalSandbox::new(&args.sandbox_root).shell(&args.shell);
        if let Some(secs) = args.command_timeout_secs {
            sandbox = sandbox.command_timeout(Duration::from_secs(secs));
        }
        Services::new(completion, sandbox)
    };
    let orchestrator = Orchestrator::new(services.with_config(config));

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    tracing::info!(addr = %args.addr, model = %args.model, sandbox_root = %args.sandbox_root.display(), "listening");
    taskpilot_api::serve(
        listener,
        taskpilot_api::router(orchestrator),
        shutdown_signal(),
        Duration::from_secs(args.shutdown_grace_secs),
    )
    .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}
