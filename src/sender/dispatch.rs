use super::client::{ClientError, CollectorClient};
use super::metrics::{DeliveryMetrics, DeliverySnapshot};
use super::serialization::{BatchSerializer, SerializationError};
use crate::app::{ErrorPolicy, Settings};
use crate::buffer::{Batch, BatchSink, FlushReason};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Request to collector failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Collector responded with HTTP {status}")]
    Status { status: u16 },
    #[error("Failed to compress payload: {0}")]
    Compression(#[from] SerializationError),
}

#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub batch_id: String,
    pub reason: FlushReason,
    pub records: usize,
    pub skipped: usize,
    /// HTTP status of the POST, `None` when no record survived encoding.
    pub status: Option<u16>,
    pub bytes_sent: usize,
    pub elapsed: Duration,
}

/// Sends captured batches to the collector on their own tasks.
///
/// At most `max_in_flight` POSTs run at once; further deliveries wait for a
/// permit inside their task, so `submit` never blocks the ingestion loop.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    client: CollectorClient,
    serializer: BatchSerializer,
    policy: ErrorPolicy,
    metrics: DeliveryMetrics,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    fatal_tx: mpsc::UnboundedSender<DeliveryError>,
}

impl Dispatcher {
    /// Builds the dispatcher and the receiver on which crash-policy failures
    /// are reported.
    pub fn new(
        settings: &Settings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<DeliveryError>), ClientError> {
        let client = CollectorClient::new(settings)?;
        Ok(Self::with_client(
            client,
            settings.error_policy,
            settings.max_in_flight,
        ))
    }

    pub fn with_client(
        client: CollectorClient,
        policy: ErrorPolicy,
        max_in_flight: usize,
    ) -> (Self, mpsc::UnboundedReceiver<DeliveryError>) {
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            inner: Arc::new(DispatcherInner {
                client,
                serializer: BatchSerializer::new(),
                policy,
                metrics: DeliveryMetrics::new(),
                permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
                tracker: TaskTracker::new(),
                fatal_tx,
            }),
        };
        (dispatcher, fatal_rx)
    }

    pub fn metrics(&self) -> DeliverySnapshot {
        self.inner.metrics.snapshot()
    }

    /// Number of delivery tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Serializes `batch` and posts it on the current task, without applying
    /// the error policy.
    pub async fn deliver(&self, batch: &Batch) -> Result<DeliveryReport, DeliveryError> {
        let started = Instant::now();
        let serialized = self.inner.serializer.serialize(batch);

        if serialized.is_empty() {
            warn!(
                batch_id = batch.id(),
                skipped = serialized.skipped,
                "no encodable records in batch"
            );
            return Ok(DeliveryReport {
                batch_id: batch.id().to_string(),
                reason: batch.reason(),
                records: 0,
                skipped: serialized.skipped,
                status: None,
                bytes_sent: 0,
                elapsed: started.elapsed(),
            });
        }

        let outcome = self.inner.client.post(serialized.payload).await?;

        Ok(DeliveryReport {
            batch_id: batch.id().to_string(),
            reason: batch.reason(),
            records: serialized.records,
            skipped: serialized.skipped,
            status: Some(outcome.status),
            bytes_sent: outcome.bytes_sent,
            elapsed: started.elapsed(),
        })
    }

    async fn deliver_and_account(self, batch: Batch) {
        let Ok(_permit) = self.inner.permits.clone().acquire_owned().await else {
            return;
        };

        let started = Instant::now();
        match self.deliver(&batch).await {
            Ok(report) => {
                let total = self.inner.metrics.record_success(
                    report.records,
                    report.bytes_sent,
                    report.elapsed,
                );
                debug!(
                    reason = %report.reason,
                    messages = report.records,
                    bytes = report.bytes_sent,
                    elapsed = ?report.elapsed,
                    queued = ?batch.captured_at().elapsed(),
                    total,
                    "flushed"
                );
            }
            Err(err) => {
                let elapsed = started.elapsed();
                let total = self.inner.metrics.record_failure(batch.size(), elapsed);
                match self.inner.policy {
                    ErrorPolicy::Crash => {
                        error!(
                            batch_id = batch.id(),
                            url = %self.inner.client.endpoint(),
                            error = %err,
                            "delivery failed"
                        );
                        if self.inner.fatal_tx.send(err).is_err() {
                            error!("fatal delivery error could not be reported, receiver is gone");
                        }
                    }
                    ErrorPolicy::Continue => {
                        warn!(
                            batch_id = batch.id(),
                            reason = %batch.reason(),
                            messages = batch.size(),
                            elapsed = ?elapsed,
                            total,
                            error = %err,
                            "delivery failed, dropping batch"
                        );
                    }
                }
            }
        }
    }
}

impl BatchSink for Dispatcher {
    fn submit(&self, batch: Batch) {
        let this = self.clone();
        self.inner.tracker.spawn(this.deliver_and_account(batch));
    }

    async fn drain(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("endpoint", &self.inner.client.endpoint().as_str())
            .field("policy", &self.inner.policy)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
