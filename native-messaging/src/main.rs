//! Native messaging host binary entry point.
//!
//! The browser starts this binary, writes one launch request to its stdin
//! and closes the pipe. Logs go to stderr; stdout belongs to the protocol.

use anyhow::Context;
use clap::Parser;
use launcher_native_messaging::{run_host, CallerInfo, HostOutcome, NativeMessagingConfig};
use tracing_subscriber::EnvFilter;

/// Command line arguments for the native messaging host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (JSON or TOML)
    #[arg(short, long, env = "LAUNCHER_CONFIG")]
    config: Option<String>,

    /// Log level or filter directive (overrides the configuration file)
    #[arg(short, long, env = "LAUNCHER_LOG")]
    log_level: Option<String>,

    /// Caller identification passed by the browser
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    caller: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => NativeMessagingConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => NativeMessagingConfig::default(),
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!("Launcher Native Messaging Host starting");
    tracing::debug!(
        config = ?args.config,
        byte_order = ?config.byte_order,
        mode = ?config.launch.mode,
        "Configuration loaded"
    );

    let caller = CallerInfo::from_args(&args.caller);
    match run_host(config, caller).await? {
        HostOutcome::EndOfStream => tracing::info!("No request received, exiting"),
        HostOutcome::Launched(invocation) => {
            tracing::info!(program = %invocation.program, "Launched, exiting")
        }
    }

    Ok(())
}
