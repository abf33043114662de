use crate::app::ConfigError;
use crate::sender::{ClientError, DeliveryError};
use thiserror::Error;

/// Top-level error type for the shipper pipeline.
#[derive(Error, Debug)]
pub enum ShipperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] ClientError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Input error: {0}")]
    Input(#[from] std::io::Error),
}

impl ShipperError {
    /// True when the error came from a delivery under the crash policy.
    pub fn is_fatal_delivery(&self) -> bool {
        matches!(self, ShipperError::Delivery(_))
    }
}
