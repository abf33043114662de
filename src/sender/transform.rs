use crate::domain::RawRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

pub const TIME_FIELD: &str = "time";
pub const MESSAGE_FIELD: &str = "msg";
pub const METADATA_FIELD: &str = "logspout";

/// A record's JSON body together with the timestamp that will lead its
/// serialized form. `body` never contains a `time` key.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub timestamp: String,
    pub body: Map<String, Value>,
}

/// RFC 3339 with millisecond resolution, e.g. `2024-01-01T12:00:00.000Z`.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds the enriched form of `record`.
///
/// A payload that is not a JSON object is carried verbatim under `msg`.
/// A `time` key in the payload wins over the arrival time and is lifted out
/// of the body. Payload keys keep their order, with `logspout` appended.
pub fn enrich(record: &RawRecord) -> EnrichedRecord {
    let mut body = match serde_json::from_str::<Value>(&record.data) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert(MESSAGE_FIELD.to_string(), Value::String(record.data.clone()));
            map
        }
    };

    let arrival = format_timestamp(&record.time);
    body.insert(
        METADATA_FIELD.to_string(),
        json!({
            "time": arrival,
            "source": record.source,
            "docker_name": record.container.name,
            "docker_id": record.container.id,
            "docker_image": record.container.image,
            "docker_hostname": record.container.hostname,
        }),
    );

    let timestamp = match body.shift_remove(TIME_FIELD) {
        Some(Value::String(embedded)) => embedded,
        Some(other) => other.to_string(),
        None => arrival,
    };

    EnrichedRecord { timestamp, body }
}
