pub mod config;
pub mod input;
pub mod logging;

pub use config::{Cli, ConfigError, DEFAULT_COLLECTOR_BASE, ErrorPolicy, Options, Route, Settings};
pub use logging::{Diagnostics, LoggingError, init_logging};

use crate::buffer::{BatchBuffer, FlushController};
use crate::domain::ShipperError;
use crate::sender::{DeliverySnapshot, Dispatcher};
use clap::Parser;
use std::process;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub const DEFAULT_INGEST_QUEUE: usize = 10_000;

/// Wires the batch buffer, flush controller and dispatcher for one route.
#[derive(Debug)]
pub struct App {
    settings: Settings,
    ingest_queue: usize,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ingest_queue: DEFAULT_INGEST_QUEUE,
        }
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, ShipperError> {
        let settings = Settings::from_route(&cli.route(), &cli.collector_base)?;
        Ok(Self::new(settings).with_ingest_queue(cli.ingest_queue))
    }

    pub fn with_ingest_queue(mut self, ingest_queue: usize) -> Self {
        self.ingest_queue = ingest_queue.max(1);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Ships every record read from `input` and returns the final delivery
    /// counters once the input is exhausted and in-flight deliveries are done.
    pub async fn run<R>(self, input: R) -> Result<DeliverySnapshot, ShipperError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (dispatcher, fatal_rx) = Dispatcher::new(&self.settings)?;
        let (record_tx, record_rx) = mpsc::channel(self.ingest_queue);

        info!(
            endpoint = %self.settings.endpoint,
            capacity = self.settings.capacity,
            timeout = ?self.settings.flush_timeout,
            gzip = self.settings.gzip,
            policy = ?self.settings.error_policy,
            "starting rask-log-shipper v{}",
            get_version()
        );

        let reader = tokio::spawn(input::forward_records(input, record_tx));

        let controller = FlushController::new(
            BatchBuffer::new(self.settings.capacity),
            dispatcher.clone(),
            self.settings.flush_timeout,
        );
        let result = controller.run(record_rx, fatal_rx).await;

        if result.is_err() {
            reader.abort();
        }
        match reader.await {
            Ok(Ok(forwarded)) => info!(forwarded, "input exhausted"),
            Ok(Err(e)) if result.is_ok() => return Err(e.into()),
            Ok(Err(e)) => warn!(error = %e, "input failed after shutdown began"),
            Err(e) if e.is_cancelled() => {}
            Err(e) => error!(error = %e, "input task panicked"),
        }

        result?;
        Ok(dispatcher.metrics())
    }
}

pub fn get_version() -> String {
    crate::VERSION.to_string()
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    init_logging(Diagnostics::from_env())?;
    let cli = Cli::parse();

    let app = match App::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("rask-log-shipper: {e}");
            process::exit(1);
        }
    };

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    match app.run(stdin).await {
        Ok(snapshot) => {
            info!(
                batches = snapshot.total_batches,
                messages = snapshot.total_messages,
                failed = snapshot.failed_deliveries,
                "rask-log-shipper stopped"
            );
            Ok(())
        }
        Err(e) => {
            if e.is_fatal_delivery() {
                error!("Delivery error under crash policy, exiting: {}", e);
            } else {
                error!("Application error: {}", e);
            }
            eprintln!("rask-log-shipper: {e}");
            process::exit(1);
        }
    }
}
