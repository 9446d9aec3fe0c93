//! `capi-jobs get <guid>` prints a job; `capi-jobs wait <guid>` polls it to a terminal state.
//!
//! Configured from CF_API_URL, CF_ACCESS_TOKEN, CF_POLL_INTERVAL_MS, CF_POLL_TIMEOUT_SECS.
//! `--interval-ms` and `--timeout-secs` take precedence over the polling variables.

mod report;

use capi_client::{CallContext, CapiClient, JobHandle, PollingConfig};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "capi-jobs")]
#[command(about = "Inspect and wait on control-plane jobs", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Milliseconds between job fetches
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Seconds to wait before giving up on a job
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a job once and print it as JSON
    Get { guid: String },
    /// Poll a job until it completes or fails, then print a summary
    Wait { guid: String },
}

impl Cli {
    fn polling(&self, base: PollingConfig) -> PollingConfig {
        let mut polling = base;
        if let Some(ms) = self.interval_ms {
            polling = polling.with_interval(Duration::from_millis(ms));
        }
        if let Some(secs) = self.timeout_secs {
            polling = polling.with_timeout(Duration::from_secs(secs));
        }
        polling
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let polling = cli.polling(PollingConfig::from_env());
    let client = CapiClient::from_env_with(polling);

    match cli.command {
        Command::Get { guid } => {
            let job = client.get_job(&guid).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Command::Wait { guid } => {
            let ctx = CallContext::new();
            let canceller = ctx.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted, canceling wait");
                    canceller.cancel();
                }
            });

            let resolution = client.wait(&JobHandle::new(guid), &ctx).await;
            if let Some(job) = resolution.job() {
                print!("{}", report::summary(job));
            }
            let (_, result) = resolution.into_parts();
            result?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capi_client::MIN_POLL_INTERVAL;

    #[test]
    fn wait_with_polling_flags() {
        let cli = Cli::try_parse_from([
            "capi-jobs",
            "wait",
            "j1",
            "--interval-ms",
            "250",
            "--timeout-secs",
            "30",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Wait { ref guid } if guid == "j1"));
        let polling = cli.polling(PollingConfig::default());
        assert_eq!(polling.interval, Duration::from_millis(250));
        assert_eq!(polling.timeout, Duration::from_secs(30));
    }

    #[test]
    fn flags_fall_back_to_base_config() {
        let cli = Cli::try_parse_from(["capi-jobs", "get", "j2"]).unwrap();
        assert!(matches!(cli.command, Command::Get { ref guid } if guid == "j2"));
        let base = PollingConfig::new().with_timeout(Duration::from_secs(7));
        assert_eq!(cli.polling(base), base);

        let cli = Cli::try_parse_from(["capi-jobs", "--interval-ms", "0", "wait", "j3"]).unwrap();
        assert_eq!(cli.polling(base).interval, MIN_POLL_INTERVAL);
    }

    #[test]
    fn missing_guid_or_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["capi-jobs", "wait"]).is_err());
        assert!(Cli::try_parse_from(["capi-jobs", "watch", "j1"]).is_err());
        assert!(Cli::try_parse_from(["capi-jobs"]).is_err());
    }
}
