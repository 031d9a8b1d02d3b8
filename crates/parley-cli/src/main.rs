//! CLI entry point - the composition root.
//!
//! Wires the local audio devices, the echo agent and the controller
//! together, then hands the terminal to the mic control.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use parley_cli::{Cli, CliError, EchoChannel, config, forward_replies, logging, presentation};
use parley_core::EventBus;
use parley_voice::audio_local::new_pair;
use parley_voice::{SuppressionGate, TurnController};

async fn run(cli: Cli) -> Result<(), CliError> {
    let log_dir = cli.log_dir.clone().unwrap_or_else(logging::default_log_dir);
    logging::init(&log_dir, cli.verbose)?;

    let config = config::resolve(&cli)?;
    tracing::info!(?config, "parley starting");

    let gate = SuppressionGate::new();
    let (capture, playback) = new_pair(&gate)?;
    let (channel, replies) =
        EchoChannel::new(Duration::from_millis(cli.echo_delay_ms), config.playback.sample_rate);

    let mut controller = TurnController::new(
        config,
        Box::new(capture),
        Box::new(playback),
        Arc::new(channel),
        EventBus::new(),
    )?;

    // A missing device leaves the control disabled instead of exiting.
    if let Err(e) = controller.initialize().await {
        tracing::warn!(error = %e, "Audio devices unavailable");
    }

    let handle = controller.handle();
    let driver = tokio::spawn(controller.run());
    let forwarder = tokio::spawn(forward_replies(replies, handle.clone()));

    let result = presentation::run(handle.clone()).await;

    let _ = handle.shutdown();
    if let Err(e) = driver.await {
        tracing::error!(error = %e, "Controller task failed");
    }
    forwarder.abort();
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("parley: {e}");
        std::process::exit(e.exit_code());
    }
    Ok(())
}
