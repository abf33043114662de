use super::batch::{Batch, FlushReason};
use crate::domain::RawRecord;
use parking_lot::Mutex;
use std::sync::Arc;

/// The live, capacity-bounded record sequence.
///
/// Appends and the capture-and-replace swap are the only operations that
/// take the lock. The detached `Vec` moves into a [`Batch`] by value, so
/// nothing downstream needs further synchronization.
#[derive(Clone)]
pub struct BatchBuffer {
    inner: Arc<Mutex<LiveBuffer>>,
    capacity: usize,
}

struct LiveBuffer {
    records: Vec<RawRecord>,
    generation: u64,
}

impl LiveBuffer {
    fn detach(&mut self, capacity: usize, reason: FlushReason) -> Batch {
        let records = std::mem::replace(&mut self.records, Vec::with_capacity(capacity));
        self.generation += 1;
        Batch::new(records, reason, self.generation)
    }
}

impl BatchBuffer {
    /// Creates an empty buffer. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(LiveBuffer {
                records: Vec::with_capacity(capacity),
                generation: 0,
            })),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Number of batches captured so far.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Appends a record. When this append brings the buffer to capacity the
    /// full sequence is detached within the same critical section and
    /// returned, so the live length never exceeds capacity.
    pub fn append(&self, record: RawRecord) -> Option<Batch> {
        let mut inner = self.inner.lock();
        inner.records.push(record);

        if inner.records.len() >= self.capacity {
            Some(inner.detach(self.capacity, FlushReason::Full))
        } else {
            None
        }
    }

    /// Detaches the live sequence and installs a fresh empty one.
    /// Returns `None` without touching the generation when nothing is buffered.
    pub fn capture(&self, reason: FlushReason) -> Option<Batch> {
        let mut inner = self.inner.lock();
        if inner.records.is_empty() {
            return None;
        }
        Some(inner.detach(self.capacity, reason))
    }
}

impl std::fmt::Debug for BatchBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Container;
    use chrono::Utc;

    fn record(data: &str) -> RawRecord {
        RawRecord::new(data, Utc::now(), "stdout", Container::default())
    }

    #[test]
    fn test_append_below_capacity_keeps_records_live() {
        let buffer = BatchBuffer::new(3);
        assert!(buffer.append(record("a")).is_none());
        assert!(buffer.append(record("b")).is_none());
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.generation(), 0);
    }

    #[test]
    fn test_append_at_capacity_detaches_in_order() {
        let buffer = BatchBuffer::new(3);
        buffer.append(record("a"));
        buffer.append(record("b"));
        let batch = buffer.append(record("c")).expect("third append fills the buffer");

        assert_eq!(batch.reason(), FlushReason::Full);
        assert_eq!(batch.generation(), 1);
        let data: Vec<&str> = batch.records().iter().map(|r| r.data.as_str()).collect();
        assert_eq!(data, ["a", "b", "c"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_capture_empty_is_noop() {
        let buffer = BatchBuffer::new(10);
        assert!(buffer.capture(FlushReason::Timeout).is_none());
        assert_eq!(buffer.generation(), 0);
    }

    #[test]
    fn test_capture_partial_buffer() {
        let buffer = BatchBuffer::new(10);
        buffer.append(record("only"));
        let batch = buffer.capture(FlushReason::Timeout).unwrap();

        assert_eq!(batch.size(), 1);
        assert_eq!(batch.reason(), FlushReason::Timeout);
        assert!(buffer.is_empty());
        assert!(buffer.capture(FlushReason::Timeout).is_none());
    }

    #[test]
    fn test_capacity_one_flushes_every_append() {
        let buffer = BatchBuffer::new(1);
        for i in 1..=3 {
            let batch = buffer.append(record("x")).unwrap();
            assert_eq!(batch.generation(), i);
            assert_eq!(batch.size(), 1);
        }
    }

    #[test]
    fn test_zero_capacity_is_treated_as_one() {
        let buffer = BatchBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert!(buffer.append(record("x")).is_some());
    }
}
