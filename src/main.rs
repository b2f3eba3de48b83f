mod capture;
mod marker_messages;
mod relay;
mod replay;
mod settings;
mod udp;

use anyhow::{Context, Result};
use capture::{CaptureClient, StreamMode};
use clap::Parser;
use settings::RelaySettings;
use std::io::BufRead;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Streams unlabeled motion capture markers to a local consumer over UDP
#[derive(Parser)]
#[clap(version = "0.1.0", author = "David M. W. <dweis7@gmail.com>")]
#[clap(allow_negative_numbers = true)]
struct Args {
    /// UDP port on 127.0.0.1 to send markers to
    port: Option<String>,
    /// Update frequency in Hz
    frequency: Option<String>,
    /// Anything past the frequency is ignored
    #[clap(hide = true)]
    extra: Vec<String>,
    /// Capture source to connect to
    #[clap(short, long, default_value = "capture.json")]
    source: String,
    #[clap(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Keeps the console open until the operator has read the error
fn wait_for_acknowledgement() {
    println!("Press Enter to exit");
    let mut line = String::new();
    if let Err(error) = std::io::stdin().lock().read_line(&mut line) {
        tracing::debug!("Failed to read acknowledgement: {}", error);
    }
}

fn connect_capture(settings: &RelaySettings) -> Result<replay::ReplayClient> {
    let mut capture = replay::ReplayClient::connect(&settings.capture_source)?;
    capture.set_stream_mode(StreamMode::ClientPullPreFetch)?;
    capture.enable_unlabeled_marker_data()?;
    Ok(capture)
}

fn relay_markers(settings: &RelaySettings) -> Result<()> {
    tracing::info!("Connecting to capture source {}", settings.capture_source);
    let capture = connect_capture(settings)?;
    let sender = udp::MessageSender::new(settings.destination())
        .context("Failed to open UDP socket")?;
    tracing::info!(
        "Sending markers to {} every {:?}",
        settings.destination(),
        settings.delay()
    );
    let mut relay = relay::Relay::new(capture, sender, relay::SystemClock, settings);
    relay.run()?;
    Ok(())
}

fn main() -> Result<()> {
    let args: Args = Args::parse();
    init_tracing(args.verbose);
    if !args.extra.is_empty() {
        tracing::warn!("Ignoring extra arguments: {:?}", args.extra);
    }
    let settings = RelaySettings::from_args(
        args.port.as_deref(),
        args.frequency.as_deref(),
        &args.source,
    );
    if let Err(error) = relay_markers(&settings) {
        tracing::error!("{:#}", error);
        if let Some(relay::RelayError::Timeout { .. }) = error.downcast_ref::<relay::RelayError>() {
            tracing::error!("Please check that the capture system is on and streaming.");
        }
        wait_for_acknowledgement();
    }
    Ok(())
}
