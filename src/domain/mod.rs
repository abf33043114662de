//! Domain layer for rask-log-shipper.
//!
//! Contains the canonical types shared across all modules:
//! - `RawRecord`: one ingested log line with its provenance
//! - `Container`: the container descriptor attached to every record
//! - `ShipperError`: Top-level error type

pub mod error;
pub mod record;

pub use error::ShipperError;
pub use record::{Container, RawRecord};
