use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Container provenance for a single log line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub hostname: String,
}

/// One log line as handed over by the collector.
///
/// Records are never mutated once received. Ownership moves from the inbound
/// stream into the live buffer and from there into exactly one captured batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Payload text; may or may not be JSON.
    pub data: String,
    /// Arrival timestamp assigned by the collector.
    pub time: DateTime<Utc>,
    /// Stream the line came from, typically `stdout` or `stderr`.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub container: Container,
}

impl RawRecord {
    pub fn new(
        data: impl Into<String>,
        time: DateTime<Utc>,
        source: impl Into<String>,
        container: Container,
    ) -> Self {
        Self {
            data: data.into(),
            time,
            source: source.into(),
            container,
        }
    }
}
