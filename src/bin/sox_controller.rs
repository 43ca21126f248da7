// sox_controller - one-shot CLI over the request service
// Reads a request input as JSON, runs it through sox and prints the JSON response

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use sox_controller::config::SOX_BIN_ENV;
use sox_controller::service::{Request, SoxService};
use sox_controller::{SoxConfig, SystemLauncher};

#[derive(Parser)]
#[command(name = "sox_controller", version, about = "Run audio edits through sox")]
struct Args {
    /// sox executable (name on PATH or full path)
    #[arg(long, env = "SOX_BIN", default_value = "sox")]
    sox_bin: String,

    /// Rate used when a strict sample rate is requested
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run one operation, e.g. `run --op audio.trim --input '{"input_path":"a.wav","start":1.5}'`
    Run {
        /// Operation name (see `describe`)
        #[arg(long)]
        op: String,

        /// JSON object with the operation's parameters; read from stdin when omitted
        #[arg(long)]
        input: Option<String>,
    },
    /// Print the capability card
    Describe,
    /// Check that the sox binary can be started
    Check,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = SoxConfig {
        binary: args.sox_bin,
        strict_sample_rate: args.sample_rate,
    };
    debug!("Using sox binary: {}", config.binary);

    match args.command {
        Cmd::Run { op, input } => {
            let raw = match input {
                Some(raw) => raw,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read request input from stdin")?;
                    buf
                }
            };
            let input: serde_json::Value = if raw.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&raw).context("Failed to parse request input")?
            };

            let mut service = SoxService::new(config);
            let response = service.handle(Request::new(op.clone(), input));
            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("Failed to serialize response")?
            );

            if response.ok {
                info!("{} finished in {}ms", op, response.latency_ms);
            } else {
                warn!("{} failed", op);
                std::process::exit(1);
            }
        }
        Cmd::Describe => {
            let service = SoxService::new(config);
            println!(
                "{}",
                serde_json::to_string_pretty(&service.describe())
                    .context("Failed to serialize capability card")?
            );
        }
        Cmd::Check => {
            if SystemLauncher::is_available(&config.binary) {
                info!("✓ {} is available", config.binary);
            } else {
                anyhow::bail!(
                    "{} not found - install sox or set {}",
                    config.binary,
                    SOX_BIN_ENV
                );
            }
        }
    }

    Ok(())
}
