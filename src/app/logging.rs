use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const VERBOSE_DIRECTIVES: &str = "debug,hyper=warn,hyper_util=warn,reqwest=warn,h2=warn,rustls=warn";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("Failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Process-wide verbose diagnostics switch, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    enabled: bool,
}

impl Diagnostics {
    pub const ENV_VAR: &'static str = "DEBUG";

    pub fn from_env() -> Self {
        Self::from_value(std::env::var(Self::ENV_VAR).ok().as_deref())
    }

    /// Any non-empty value turns diagnostics on.
    pub fn from_value(value: Option<&str>) -> Self {
        Self {
            enabled: value.is_some_and(|v| !v.is_empty()),
        }
    }

    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// `EnvFilter` directives for this mode. An explicit `RUST_LOG` only
    /// applies while diagnostics are on.
    pub fn filter_directives(&self, rust_log: Option<&str>) -> String {
        if !self.enabled {
            return "off".to_string();
        }
        match rust_log.map(str::trim) {
            Some(directives) if !directives.is_empty() => directives.to_string(),
            _ => VERBOSE_DIRECTIVES.to_string(),
        }
    }
}

/// Installs the global subscriber. Output goes to stderr; set
/// `RUST_LOG_FORMAT=json` for JSON lines.
pub fn init_logging(diagnostics: Diagnostics) -> Result<(), LoggingError> {
    let directives = diagnostics.filter_directives(std::env::var("RUST_LOG").ok().as_deref());
    let filter = EnvFilter::try_new(&directives)?;
    let use_json = std::env::var("RUST_LOG_FORMAT").is_ok_and(|v| v == "json");

    let registry = tracing_subscriber::registry().with(filter);
    if use_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_values() {
        assert!(!Diagnostics::from_value(None).is_enabled());
        assert!(!Diagnostics::from_value(Some("")).is_enabled());
        assert!(Diagnostics::from_value(Some("1")).is_enabled());
        assert!(Diagnostics::from_value(Some("false")).is_enabled());
    }

    #[test]
    fn test_disabled_filters_everything() {
        assert_eq!(Diagnostics::disabled().filter_directives(Some("trace")), "off");
    }

    #[test]
    fn test_enabled_filter_prefers_rust_log() {
        let diagnostics = Diagnostics::enabled();
        assert_eq!(diagnostics.filter_directives(None), VERBOSE_DIRECTIVES);
        assert_eq!(diagnostics.filter_directives(Some("  ")), VERBOSE_DIRECTIVES);
        assert_eq!(
            diagnostics.filter_directives(Some("rask_log_shipper=trace")),
            "rask_log_shipper=trace"
        );
    }

    #[test]
    fn test_directives_parse() {
        for diagnostics in [Diagnostics::enabled(), Diagnostics::disabled()] {
            assert!(EnvFilter::try_new(diagnostics.filter_directives(None)).is_ok());
        }
    }
}
