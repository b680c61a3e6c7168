use std::io::{self, BufRead};

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use telegauge_sink::{ConsoleGauge, FileLog, SampleConsumer, SampleProcessor, SinkConfig};
use telegauge_stream::{StreamProducer, WebSocketTransport};

fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let config = SinkConfig::from_env().with_args(std::env::args().skip(1));
    config.validate()?;
    info!(
        endpoint = %config.endpoint,
        log_file = %config.log_file.display(),
        "Configuring telemetry sink"
    );

    let log = FileLog::open(&config.log_file)
        .with_context(|| format!("failed to open sample log {}", config.log_file.display()))?;
    let transport = WebSocketTransport::connect(&config.endpoint)
        .with_context(|| format!("failed to connect to {}", config.endpoint))?;

    let producer = StreamProducer::new(Box::new(transport), config.producer_config());
    let processor = SampleProcessor::new(
        Box::new(log),
        Box::new(ConsoleGauge::stdout(config.gauge_scale)),
    );
    let mut consumer = SampleConsumer::new(producer, processor);

    eprintln!("Receiving samples... press Enter to exit");
    consumer.start().context("failed to start sample consumer")?;

    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        warn!(error = %e, "Could not read stdin; shutting down");
    }

    consumer.stop();
    // Leave the gauge line intact.
    println!();
    Ok(())
}

fn init_tracing() {
    // stdout belongs to the gauge.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,tungstenite=warn"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}
