//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback so the service can be deployed with
//! the same variables the webhook deployment already uses. Parsing only checks
//! shapes; the cross-field rules (which credentials, which observed app) are
//! enforced by the `resolve` helpers below and reported as
//! [`RollupError::ConfigurationError`].

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use listener::WebhookSecret;
use rollup::{
    AppId, AppName, AppRef, CommitSha, InstallationId, ObservedApp, OwnerLogin, Repository,
    RepositoryName, RollupError,
};

#[derive(Debug, Parser)]
#[command(
    name = "checks-rollup",
    version,
    about = "Rolls the check runs of one CI app up into a single synthetic check run"
)]
pub struct Cli {
    #[command(flatten)]
    pub github: GitHubArgs,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Receive check_run webhooks and publish a synthetic check run per event
    Serve(ServeArgs),
    /// Aggregate one commit once and exit
    Aggregate(AggregateArgs),
}

/// How to reach and authenticate against GitHub.
#[derive(Debug, Clone, Args)]
pub struct GitHubArgs {
    /// GitHub App ID used for the installation token exchange.
    #[arg(long, env = "GITHUB_APP_ID")]
    pub app_id: Option<u64>,

    /// Installation of the GitHub App on the target account.
    #[arg(long, env = "GITHUB_INSTALLATION_ID")]
    pub installation_id: Option<u64>,

    /// PEM-encoded RSA private key of the GitHub App.
    #[arg(long, env = "PRIVATE_KEY_PATH")]
    pub private_key_path: Option<PathBuf>,

    /// Static access token; replaces the GitHub App credentials.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of the GitHub REST API.
    #[arg(long, env = "GITHUB_API_URL", default_value = github::DEFAULT_API_URL)]
    pub api_url: String,
}

/// Credentials resolved from [`GitHubArgs`].
#[derive(Clone, PartialEq, Eq)]
pub enum GitHubAuth {
    Token(String),
    App {
        app_id: AppId,
        installation_id: InstallationId,
        private_key_path: PathBuf,
    },
}

impl std::fmt::Debug for GitHubAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::App {
                app_id,
                installation_id,
                private_key_path,
            } => f
                .debug_struct("App")
                .field("app_id", app_id)
                .field("installation_id", installation_id)
                .field("private_key_path", private_key_path)
                .finish(),
        }
    }
}

fn config_error(message: impl Into<String>) -> RollupError {
    RollupError::ConfigurationError {
        message: message.into(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl GitHubArgs {
    /// A static token wins; otherwise all three GitHub App settings are needed.
    pub fn resolve_auth(&self) -> Result<GitHubAuth, RollupError> {
        if let Some(token) = non_empty(self.token.as_deref()) {
            return Ok(GitHubAuth::Token(token.to_string()));
        }

        match (self.app_id, self.installation_id, &self.private_key_path) {
            (Some(app_id), Some(installation_id), Some(path)) => Ok(GitHubAuth::App {
                app_id: AppId::new(app_id),
                installation_id: InstallationId::new(installation_id),
                private_key_path: path.clone(),
            }),
            _ => Err(config_error(
                "either --token or all of --app-id, --installation-id and --private-key-path \
                 must be set",
            )),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address the webhook endpoint binds to.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Secret configured on the GitHub App webhook.
    #[arg(long, env = "GITHUB_APP_SECRET_TOKEN", hide_env_values = true)]
    pub webhook_secret: String,

    /// Name of the CI app whose check runs are rolled up.
    #[arg(long, env = "OBSERVED_APP_NAME")]
    pub observed_app_name: Option<String>,

    /// ID of the CI app whose check runs are rolled up.
    #[arg(long, env = "OBSERVED_APP_ID")]
    pub observed_app_id: Option<u64>,

    /// Fixed name for the synthetic check run.
    #[arg(long, env = "SYNTHETIC_CHECK_NAME")]
    pub check_name: Option<String>,
}

impl ServeArgs {
    /// Exactly one of the observed app name and ID must be given.
    pub fn resolve_observed_app(&self) -> Result<ObservedApp, RollupError> {
        let name = non_empty(self.observed_app_name.as_deref());
        match (name, self.observed_app_id) {
            (Some(name), None) => AppName::new(name)
                .map(ObservedApp::Name)
                .ok_or_else(|| config_error("observed app name is empty")),
            (None, Some(id)) => Ok(ObservedApp::Id(AppId::new(id))),
            (Some(_), Some(_)) => Err(config_error(
                "--observed-app-name and --observed-app-id are mutually exclusive",
            )),
            (None, None) => Err(config_error(
                "one of --observed-app-name or --observed-app-id must be set",
            )),
        }
    }

    pub fn resolve_secret(&self) -> Result<WebhookSecret, RollupError> {
        WebhookSecret::new(self.webhook_secret.as_bytes())
            .ok_or_else(|| config_error("webhook secret must not be empty"))
    }

    /// A blank name falls back to the default synthetic name.
    pub fn resolve_check_name(&self) -> Option<String> {
        non_empty(self.check_name.as_deref()).map(str::to_string)
    }
}

#[derive(Debug, Clone, Args)]
pub struct AggregateArgs {
    /// Repository owner (user or organisation login).
    #[arg(long)]
    pub owner: String,

    /// Repository name.
    #[arg(long)]
    pub repo: String,

    /// Commit whose check runs are aggregated.
    #[arg(long)]
    pub sha: String,

    /// ID of the CI app whose check runs are rolled up.
    #[arg(long)]
    pub observed_app_id: u64,

    /// Name of the CI app; used in the default synthetic check name.
    #[arg(long)]
    pub observed_app_name: String,

    /// Fixed name for the synthetic check run.
    #[arg(long)]
    pub check_name: Option<String>,
}

/// The commit a one-shot aggregation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateTarget {
    pub repository: Repository,
    pub commit: CommitSha,
    pub app: AppRef,
}

impl AggregateArgs {
    /// A blank name falls back to the default synthetic name.
    pub fn resolve_check_name(&self) -> Option<String> {
        non_empty(self.check_name.as_deref()).map(str::to_string)
    }

    pub fn resolve_target(&self) -> Result<AggregateTarget, RollupError> {
        let owner = OwnerLogin::new(self.owner.as_str())
            .ok_or_else(|| config_error("--owner must not be empty"))?;
        let name = RepositoryName::new(self.repo.as_str())
            .ok_or_else(|| config_error("--repo must not be empty"))?;
        let commit =
            CommitSha::new(self.sha.as_str()).ok_or_else(|| config_error("--sha must not be empty"))?;
        let app_name = AppName::new(self.observed_app_name.as_str())
            .ok_or_else(|| config_error("--observed-app-name must not be empty"))?;

        Ok(AggregateTarget {
            repository: Repository::new(owner, name),
            commit,
            app: AppRef {
                id: AppId::new(self.observed_app_id),
                name: app_name,
            },
        })
    }
}
