use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverySnapshot {
    pub total_batches: u64,
    /// Messages handed to the collector across every attempt, failed ones included.
    pub total_messages: u64,
    pub delivered_messages: u64,
    pub successful_deliveries: u64,
    pub failed_deliveries: u64,
    pub bytes_sent: u64,
    pub last_latency: Duration,
}

/// Delivery bookkeeping shared by every in-flight delivery task.
#[derive(Debug, Clone, Default)]
pub struct DeliveryMetrics {
    total_batches: Arc<AtomicU64>,
    total_messages: Arc<AtomicU64>,
    delivered_messages: Arc<AtomicU64>,
    successful_deliveries: Arc<AtomicU64>,
    failed_deliveries: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
    last_latency_us: Arc<AtomicU64>,
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful attempt and returns the new cumulative message total.
    pub fn record_success(&self, messages: usize, bytes_sent: usize, latency: Duration) -> u64 {
        self.successful_deliveries.fetch_add(1, Ordering::Relaxed);
        self.delivered_messages
            .fetch_add(messages as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes_sent as u64, Ordering::Relaxed);
        self.record_attempt(messages, latency)
    }

    /// Records a failed attempt and returns the new cumulative message total.
    pub fn record_failure(&self, messages: usize, latency: Duration) -> u64 {
        self.failed_deliveries.fetch_add(1, Ordering::Relaxed);
        self.record_attempt(messages, latency)
    }

    fn record_attempt(&self, messages: usize, latency: Duration) -> u64 {
        self.total_batches.fetch_add(1, Ordering::Relaxed);
        self.last_latency_us
            .store(latency.as_micros() as u64, Ordering::Relaxed);
        self.total_messages
            .fetch_add(messages as u64, Ordering::Relaxed)
            + messages as u64
    }

    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            total_batches: self.total_batches.load(Ordering::Relaxed),
            total_messages: self.total_messages.load(Ordering::Relaxed),
            delivered_messages: self.delivered_messages.load(Ordering::Relaxed),
            successful_deliveries: self.successful_deliveries.load(Ordering::Relaxed),
            failed_deliveries: self.failed_deliveries.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            last_latency: Duration::from_micros(self.last_latency_us.load(Ordering::Relaxed)),
        }
    }
}
