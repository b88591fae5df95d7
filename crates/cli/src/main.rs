//! `workflow-runner` CLI entry-point.
//!
//! Available sub-commands:
//! - `run`:      execute a workflow JSON file against a run request.
//! - `validate`: check a workflow JSON file's structure.
//!
//! Logs go to stderr; `run` prints the execution response as JSON on stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use engine::{AppConfig, ExecutionRequest, Workflow, WorkflowExecutor};
use nodes::builtin::Collaborators;
use nodes::email::{EmailSender, HttpEmailSender, InMemoryEmailSender};
use nodes::integration::{ApiClient, HttpApiClient};
use nodes::mock::MockApiClient;
use nodes::validator::DefaultInputValidator;

#[derive(Parser)]
#[command(
    name = "workflow-runner",
    about = "Execute weather-alert workflow graphs",
    version
)]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long, global = true, env = "WORKFLOW_RUNNER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a workflow and print the execution response.
    Run {
        /// Path to the workflow JSON file.
        workflow: PathBuf,
        /// Path to the run request JSON (`formData` and `condition`).
        #[arg(long, short)]
        request: PathBuf,
        /// Serve canned weather readings instead of calling the live API.
        #[arg(long, env = "WORKFLOW_RUNNER_MOCK_WEATHER")]
        mock_weather: bool,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => AppConfig::default(),
    };

    match cli.command {
        Command::Run {
            workflow,
            request,
            mock_weather,
        } => {
            let workflow: Workflow = read_json(&workflow)?;
            let request: ExecutionRequest = read_json(&request)?;

            if let Err(e) = engine::validate_workflow(&workflow) {
                warn!(error = %e, "workflow failed structural validation; running anyway");
            }

            let emails = InMemoryEmailSender::new();
            let services = collaborators(&config, mock_weather, &emails)?;
            let executor =
                WorkflowExecutor::new(engine::builtin_registry(&services), config.executor.clone());

            let response = executor.run(&workflow, &request).await;

            for email in emails.sent() {
                info!(to = %email.to, subject = %email.subject, "captured email:\n{}", email.body);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);

            if !response.is_completed() {
                std::process::exit(1);
            }
        }
        Command::Validate { path } => {
            let workflow: Workflow = read_json(&path)?;

            match engine::validate_workflow(&workflow) {
                Ok(order) => {
                    println!("✅ Workflow is valid. Execution order: {order:?}");
                }
                Err(e) => {
                    eprintln!("❌ Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Wire the built-in handlers' collaborators from config. Emails go to the
/// configured relay, or into `emails` when there is none.
fn collaborators(
    config: &AppConfig,
    mock_weather: bool,
    emails: &InMemoryEmailSender,
) -> Result<Collaborators> {
    let api_client: Arc<dyn ApiClient> = if mock_weather {
        info!("using canned weather readings");
        Arc::new(MockApiClient::new().with_default_weather())
    } else {
        Arc::new(HttpApiClient::new(
            config.weather.timeout(),
            &config.weather.user_agent,
        )?)
    };

    let email_sender: Arc<dyn EmailSender> = match &config.email.relay_url {
        Some(url) => {
            info!(relay = %url, "delivering email through HTTP relay");
            Arc::new(HttpEmailSender::new(
                url.as_str(),
                config.email.from.as_str(),
                config.email.timeout(),
            )?)
        }
        None => Arc::new(emails.clone()),
    };

    Ok(Collaborators {
        api_client,
        email_sender,
        validator: Arc::new(DefaultInputValidator::new()),
        from_address: config.email.from.clone(),
    })
}
