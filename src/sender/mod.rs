pub mod client;
pub mod dispatch;
pub mod metrics;
pub mod serialization;
pub mod transform;

pub use client::{ClientError, CollectorClient, PostOutcome};
pub use dispatch::{DeliveryError, DeliveryReport, Dispatcher};
pub use metrics::{DeliveryMetrics, DeliverySnapshot};
pub use serialization::{BatchSerializer, SerializationError, SerializedBatch};
pub use transform::{EnrichedRecord, enrich, format_timestamp};
