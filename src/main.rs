use anyhow::Context;
use chrono::Local;
use clap::Parser;
use rewer::ai::AnthropicClient;
use rewer::cli::{Cli, CommandInvocation, USAGE};
use rewer::config::{Config, Credentials};
use rewer::git_ops::{GitRepo, VersionControl};
use rewer::spinner;
use rewer::workflow::{self, Outcome, Workspace};
use rewer::RewerError;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help and --version also arrive here
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let result = match cli.into_invocation() {
        Ok(invocation) => {
            workflow::gated(
                |name| std::env::var(name).ok(),
                |credentials| run(invocation, credentials),
            )
            .await
        }
        Err(err) => Err(err),
    };

    match &result {
        Ok(outcome) => debug!(?outcome, "done"),
        Err(err) => report(err),
    }
    ExitCode::from(workflow::exit_code(&result))
}

/// Diagnostics go to stderr, filtered by `REWER_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("REWER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

async fn run(
    invocation: CommandInvocation,
    credentials: Credentials,
) -> Result<Outcome, RewerError> {
    let config = Config::load();

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let repo = match GitRepo::discover(&cwd) {
        Ok(repo) => Some(repo),
        Err(err) => {
            debug!("no repository at {}: {:#}", cwd.display(), err);
            None
        }
    };

    let ws = Workspace {
        vcs: repo.as_ref().map(|r| r as &dyn VersionControl),
        config: &config,
        cwd,
        now: Local::now(),
    };
    let client = AnthropicClient::new(&config, &credentials)?;
    let flow = workflow::flow_for(&invocation);
    debug!(command = invocation.kind().as_str(), "running");

    let indicator = if io::stderr().is_terminal() {
        spinner::stderr_writer()
    } else {
        spinner::null_writer()
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    workflow::run_flow(flow.as_ref(), &ws, &client, &indicator, &mut out).await
}

fn report(err: &RewerError) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "Error: {}", err);
    if let Some(fix) = err.remediation() {
        let _ = writeln!(stderr, "{}", fix);
    }
    if matches!(err, RewerError::Usage(_)) {
        let _ = writeln!(stderr, "\n{}", USAGE);
    }
}
