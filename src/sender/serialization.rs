use super::transform::{EnrichedRecord, enrich};
use crate::buffer::Batch;
use flate2::{Compression, write::GzEncoder};
use std::io::Write;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Serialized record is not a JSON object")]
    NotAnObject,
    #[error("IO error during compression: {0}")]
    IoError(#[from] std::io::Error),
}

/// Newline-joined payload for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedBatch {
    pub payload: String,
    /// Records that made it into `payload`.
    pub records: usize,
    /// Records dropped because they could not be encoded.
    pub skipped: usize,
}

impl SerializedBatch {
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSerializer;

impl BatchSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize(&self, batch: &Batch) -> SerializedBatch {
        let mut lines = Vec::with_capacity(batch.size());
        let mut skipped = 0;

        for record in batch.records() {
            match render_record(&enrich(record)) {
                Ok(line) => lines.push(line),
                Err(e) => {
                    skipped += 1;
                    warn!(batch_id = batch.id(), error = %e, "skipping record that failed to encode");
                }
            }
        }

        SerializedBatch {
            records: lines.len(),
            payload: lines.join("\n"),
            skipped,
        }
    }

    pub fn compress(&self, payload: &[u8]) -> Result<Vec<u8>, SerializationError> {
        let mut encoder =
            GzEncoder::new(Vec::with_capacity(payload.len() / 4), Compression::default());
        encoder.write_all(payload)?;
        Ok(encoder.finish()?)
    }
}

/// Serializes one record with its timestamp as the leading key:
/// `{"time":"<ts>",<remaining keys>}`.
///
/// Collectors pick the first timestamp-looking value they meet, so the key
/// order here is load-bearing.
pub fn render_record(enriched: &EnrichedRecord) -> Result<String, SerializationError> {
    let body = serde_json::to_string(&enriched.body)?;
    let rest = body.strip_prefix('{').ok_or(SerializationError::NotAnObject)?;
    let timestamp = serde_json::to_string(&enriched.timestamp)?;

    let mut line = String::with_capacity(body.len() + timestamp.len() + 9);
    line.push_str("{\"time\":");
    line.push_str(&timestamp);
    if rest != "}" {
        line.push(',');
    }
    line.push_str(rest);
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::FlushReason;
    use crate::domain::{Container, RawRecord};
    use chrono::{TimeZone, Utc};
    use flate2::read::GzDecoder;
    use serde_json::{Map, Value};
    use std::io::Read;

    fn record(data: &str) -> RawRecord {
        RawRecord::new(
            data,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            "stdout",
            Container::default(),
        )
    }

    #[test]
    fn test_render_puts_time_first() {
        let line = render_record(&enrich(&record(r#"{"a":1}"#))).unwrap();
        assert!(
            line.starts_with(r#"{"time":"2024-01-01T12:00:00.000Z","a":1,"logspout":{"#),
            "{line}"
        );
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["time"], "2024-01-01T12:00:00.000Z");
    }

    #[test]
    fn test_render_plain_text() {
        let line = render_record(&enrich(&record("hello world"))).unwrap();
        assert!(
            line.starts_with(r#"{"time":"2024-01-01T12:00:00.000Z","msg":"hello world","logspout":{"#),
            "{line}"
        );
    }

    #[test]
    fn test_render_escapes_embedded_time() {
        let line = render_record(&enrich(&record(r#"{"time":"12:00 \"local\""}"#))).unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["time"], "12:00 \"local\"");
    }

    #[test]
    fn test_render_empty_body() {
        let enriched = EnrichedRecord {
            timestamp: "t".to_string(),
            body: Map::new(),
        };
        assert_eq!(render_record(&enriched).unwrap(), r#"{"time":"t"}"#);
    }

    #[test]
    fn test_batch_lines_keep_append_order() {
        let batch = Batch::new(
            vec![record("first"), record(r#"{"n":2}"#), record("third")],
            FlushReason::Timeout,
            1,
        );
        let serialized = BatchSerializer::new().serialize(&batch);

        assert_eq!(serialized.records, 3);
        assert_eq!(serialized.skipped, 0);
        let lines: Vec<&str> = serialized.payload.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(r#""msg":"first""#));
        assert!(lines[1].contains(r#""n":2"#));
        assert!(lines[2].contains(r#""msg":"third""#));
        assert!(!serialized.payload.ends_with('\n'));
    }

    #[test]
    fn test_gzip_round_trip_is_byte_identical() {
        let batch = Batch::new(
            (0..50).map(|i| record(&format!("line {i}"))).collect(),
            FlushReason::Full,
            1,
        );
        let serializer = BatchSerializer::new();
        let serialized = serializer.serialize(&batch);
        let compressed = serializer.compress(serialized.payload.as_bytes()).unwrap();

        let mut decoded = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, serialized.payload.as_bytes());
    }
}
