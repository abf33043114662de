#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Durations and counts stay within u64
    clippy::cast_precision_loss,      // Fractional duration parts only
    clippy::cast_sign_loss,           // Values are range-checked before casting
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. ConfigError in config module
    clippy::must_use_candidate
)]

pub mod app;
pub mod buffer;
pub mod domain;
pub mod sender;

pub use app::{App, Route, Settings};
pub use domain::{Container, RawRecord, ShipperError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
