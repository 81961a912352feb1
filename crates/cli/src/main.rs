//! checks-rollup entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration** from flags and environment variables
//!    (see [`config`]).
//! 2. **Wire observability** with `tracing-subscriber` and the optional
//!    OpenTelemetry OTLP exporter (see [`telemetry`]).
//! 3. **Construct infrastructure**: the [`github::GitHubClient`] is the only
//!    [`rollup::ChecksApi`] implementation and is injected into the
//!    [`rollup::Aggregator`].
//! 4. **Select trigger mode**:
//!    - `serve`: run the webhook endpoint until Ctrl-C or SIGTERM.
//!    - `aggregate`: roll up one commit and print the report title.

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use github::{AppCredentials, GitHubClient, TokenSource};
use listener::ListenerState;
use rollup::{Aggregator, ChecksApi, ObservedApp};

use crate::config::{AggregateArgs, Cli, Command, GitHubArgs, GitHubAuth, ServeArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init(cli.log_format)?;

    let result = run(cli).await;
    if let Err(err) = &result {
        error!("checks-rollup failed: {err:#}");
    }

    telemetry.shutdown();
    result
}

async fn run(cli: Cli) -> Result<()> {
    let checks = build_client(&cli.github)?;
    match cli.command {
        Command::Serve(args) => serve(args, checks).await,
        Command::Aggregate(args) => aggregate(args, checks).await,
    }
}

fn build_client(args: &GitHubArgs) -> Result<Arc<dyn ChecksApi>> {
    let tokens = match args.resolve_auth()? {
        GitHubAuth::Token(token) => TokenSource::static_token(token),
        GitHubAuth::App {
            app_id,
            installation_id,
            private_key_path,
        } => {
            let pem = std::fs::read(&private_key_path).with_context(|| {
                format!("failed to read private key {}", private_key_path.display())
            })?;
            let credentials = AppCredentials::from_pem(app_id, installation_id, &pem)
                .context("failed to load the GitHub App private key")?;
            info!(%app_id, %installation_id, "Authenticating as GitHub App installation");
            TokenSource::app(credentials)
        }
    };

    let client = GitHubClient::new(args.api_url.as_str(), tokens)
        .context("failed to build the GitHub client")?;
    Ok(Arc::new(client))
}

async fn serve(args: ServeArgs, checks: Arc<dyn ChecksApi>) -> Result<()> {
    let observed = args.resolve_observed_app()?;
    let secret = args.resolve_secret()?;

    let mut aggregator = Aggregator::new(checks, observed);
    if let Some(name) = args.resolve_check_name() {
        aggregator = aggregator.with_check_name(name);
    }
    info!(observed = %aggregator.observed(), "Rolling up check runs");

    let state = Arc::new(ListenerState::new(secret, aggregator));
    listener::serve(args.listen, state, shutdown_signal())
        .await
        .context("webhook server failed")?;

    info!("Shut down");
    Ok(())
}

async fn aggregate(args: AggregateArgs, checks: Arc<dyn ChecksApi>) -> Result<()> {
    let target = args.resolve_target()?;

    let mut aggregator = Aggregator::new(checks, ObservedApp::Id(target.app.id));
    if let Some(name) = args.resolve_check_name() {
        aggregator = aggregator.with_check_name(name);
    }

    let publication = aggregator
        .aggregate(&target.repository, &target.commit, &target.app)
        .await
        .with_context(|| format!("failed to aggregate {}@{}", target.repository, target.commit))?;

    println!("{}", publication.report.title);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
