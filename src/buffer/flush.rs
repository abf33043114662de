use super::batch::{Batch, FlushReason};
use super::live::BatchBuffer;
use crate::domain::{RawRecord, ShipperError};
use crate::sender::DeliveryError;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Sleep, sleep};
use tracing::{debug, error, info};

/// Receives captured batches from the flush controller.
pub trait BatchSink: Send + Sync {
    /// Takes ownership of `batch`. Must return without waiting on delivery.
    fn submit(&self, batch: Batch);

    /// Resolves once every submitted batch has been fully handled.
    fn drain(&self) -> impl Future<Output = ()> + Send;
}

/// Drives the capacity and timer triggers against one [`BatchBuffer`].
///
/// Both triggers end in the same flush path, which re-arms the timer
/// `timeout` after the flush completes. The timer period is therefore
/// measured from the end of the previous flush, whatever its reason.
pub struct FlushController<S> {
    buffer: BatchBuffer,
    sink: S,
    timeout: Duration,
    timer: Pin<Box<Sleep>>,
}

impl<S: BatchSink> FlushController<S> {
    pub fn new(buffer: BatchBuffer, sink: S, timeout: Duration) -> Self {
        Self {
            buffer,
            sink,
            timeout,
            timer: Box::pin(sleep(timeout)),
        }
    }

    pub fn buffer(&self) -> &BatchBuffer {
        &self.buffer
    }

    /// Instant at which the timer trigger fires next.
    pub fn deadline(&self) -> Instant {
        self.timer.deadline()
    }

    pub fn append(&mut self, record: RawRecord) {
        if let Some(batch) = self.buffer.append(record) {
            self.complete_flush(FlushReason::Full, Some(batch));
        }
    }

    pub fn flush(&mut self, reason: FlushReason) {
        let batch = self.buffer.capture(reason);
        self.complete_flush(reason, batch);
    }

    fn complete_flush(&mut self, reason: FlushReason, batch: Option<Batch>) {
        match batch {
            Some(batch) => {
                debug!(
                    reason = %reason,
                    batch_id = batch.id(),
                    generation = batch.generation(),
                    records = batch.size(),
                    "captured batch"
                );
                self.sink.submit(batch);
            }
            None => debug!(reason = %reason, "nothing to flush"),
        }
        self.timer.as_mut().reset(Instant::now() + self.timeout);
    }

    /// Consumes `records` until the stream ends or a delivery reports a fatal
    /// error. Records and timer expirations are handled one at a time; the
    /// deliveries they trigger run concurrently inside the sink.
    pub async fn run(
        mut self,
        mut records: mpsc::Receiver<RawRecord>,
        mut fatal: mpsc::UnboundedReceiver<DeliveryError>,
    ) -> Result<(), ShipperError> {
        loop {
            tokio::select! {
                biased;

                Some(err) = fatal.recv() => {
                    error!(error = %err, "fatal delivery error, stopping ingestion");
                    return Err(err.into());
                }
                () = self.timer.as_mut() => self.flush(FlushReason::Timeout),
                record = records.recv() => match record {
                    Some(record) => self.append(record),
                    None => break,
                },
            }
        }

        info!("inbound stream closed, flushing remaining records");
        self.flush(FlushReason::Shutdown);
        self.sink.drain().await;

        match fatal.try_recv() {
            Ok(err) => {
                error!(error = %err, "fatal delivery error during shutdown");
                Err(err.into())
            }
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Container;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CollectingSink {
        batches: Arc<Mutex<Vec<Batch>>>,
    }

    impl CollectingSink {
        fn taken(&self) -> Vec<Batch> {
            std::mem::take(&mut *self.batches.lock())
        }
    }

    impl BatchSink for CollectingSink {
        fn submit(&self, batch: Batch) {
            self.batches.lock().push(batch);
        }

        async fn drain(&self) {}
    }

    fn record(i: usize) -> RawRecord {
        RawRecord::new(format!("line {i}"), Utc::now(), "stdout", Container::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_trigger_flushes_once() {
        let sink = CollectingSink::default();
        let mut controller =
            FlushController::new(BatchBuffer::new(5), sink.clone(), Duration::from_secs(1));

        for i in 0..5 {
            controller.append(record(i));
        }

        let batches = sink.taken();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].reason(), FlushReason::Full);
        assert_eq!(batches[0].size(), 5);
        assert!(controller.buffer().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_flush_still_rearms_timer() {
        let sink = CollectingSink::default();
        let timeout = Duration::from_millis(500);
        let mut controller = FlushController::new(BatchBuffer::new(5), sink.clone(), timeout);

        tokio::time::advance(Duration::from_millis(200)).await;
        controller.flush(FlushReason::Timeout);

        assert!(sink.taken().is_empty());
        assert_eq!(controller.deadline(), Instant::now() + timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_flush_rearms_timer_from_flush_time() {
        let sink = CollectingSink::default();
        let timeout = Duration::from_secs(1);
        let mut controller = FlushController::new(BatchBuffer::new(2), sink.clone(), timeout);

        tokio::time::advance(Duration::from_millis(700)).await;
        controller.append(record(0));
        controller.append(record(1));

        assert_eq!(sink.taken().len(), 1);
        assert_eq!(controller.deadline(), Instant::now() + timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_flushes_on_timer_and_skips_empty_shutdown() {
        let sink = CollectingSink::default();
        let controller =
            FlushController::new(BatchBuffer::new(10), sink.clone(), Duration::from_secs(1));
        let (tx, rx) = mpsc::channel(8);
        let (_fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(controller.run(rx, fatal_rx));

        tx.send(record(0)).await.unwrap();
        tx.send(record(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let batches = sink.taken();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].reason(), FlushReason::Timeout);
        assert_eq!(batches[0].size(), 2);

        drop(tx);
        handle.await.unwrap().unwrap();
        assert!(sink.taken().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_flushes_remainder_on_shutdown() {
        let sink = CollectingSink::default();
        let controller =
            FlushController::new(BatchBuffer::new(10), sink.clone(), Duration::from_secs(60));
        let (tx, rx) = mpsc::channel(8);
        let (_fatal_tx, fatal_rx) = mpsc::unbounded_channel();

        for i in 0..3 {
            tx.send(record(i)).await.unwrap();
        }
        drop(tx);
        controller.run(rx, fatal_rx).await.unwrap();

        let batches = sink.taken();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].reason(), FlushReason::Shutdown);
        assert_eq!(batches[0].size(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_fatal_delivery_error() {
        let sink = CollectingSink::default();
        let controller =
            FlushController::new(BatchBuffer::new(10), sink.clone(), Duration::from_secs(1));
        let (_tx, rx) = mpsc::channel::<RawRecord>(8);
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();

        fatal_tx.send(DeliveryError::Status { status: 500 }).unwrap();
        let err = controller.run(rx, fatal_rx).await.unwrap_err();

        assert!(err.is_fatal_delivery());
    }
}
