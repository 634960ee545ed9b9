//! ZipRelay one-shot invoker: runs exactly one invocation and exits.
//!
//! Configuration comes from the environment (or `.env`), the same as the API server.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use ziprelay_cli::{exit_code, init_tracing, load_submission, Trigger};
use ziprelay_core::Config;

#[derive(Parser)]
#[command(name = "ziprelay", about = "Relay one ZIP archive to storage and notify the recipient")]
struct Cli {
    /// URL of the ZIP archive
    #[arg(long, requires = "to", conflicts_with = "event")]
    url: Option<String>,
    /// Recipient address for the notification
    #[arg(long, requires = "url")]
    to: Option<String>,
    /// Path to an SNS event or notification JSON file
    #[arg(long, required_unless_present = "url")]
    event: Option<PathBuf>,
}

impl Cli {
    fn trigger(self) -> Option<Trigger> {
        match (self.url, self.to, self.event) {
            (Some(url), Some(to), _) => Some(Trigger::Direct { url, to }),
            (_, _, Some(path)) => Some(Trigger::EventFile(path)),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Configuration validation failed")?;
    init_tracing(config.log_format());

    let trigger = cli
        .trigger()
        .context("Pass --url and --to, or --event <file>")?;
    let Some(request) = load_submission(&trigger)? else {
        tracing::info!("Subscription confirmation received; nothing to relay");
        return Ok(());
    };

    let orchestrator = ziprelay_services::build_orchestrator(&config).await?;
    let outcome = orchestrator.invoke(request).await;

    let body = serde_json::to_string_pretty(&outcome.body).context("Serialize outcome")?;
    println!("{}", body);

    std::process::exit(exit_code(outcome.status_code));
}
