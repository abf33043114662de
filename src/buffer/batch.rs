use crate::domain::RawRecord;
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

/// Why a batch was detached from the live buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushReason {
    /// The append that filled the buffer to capacity.
    Full,
    /// The repeating flush timer expired.
    Timeout,
    /// The inbound stream ended.
    Shutdown,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushReason::Full => "full",
            FlushReason::Timeout => "timeout",
            FlushReason::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read-only snapshot of the live buffer, owned by exactly one delivery.
#[derive(Debug)]
pub struct Batch {
    id: String,
    generation: u64,
    reason: FlushReason,
    records: Vec<RawRecord>,
    captured_at: Instant,
}

impl Batch {
    pub fn new(records: Vec<RawRecord>, reason: FlushReason, generation: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            generation,
            reason,
            records,
            captured_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Position of this batch in its buffer's capture sequence, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reason(&self) -> FlushReason {
        self.reason
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }
}
