mod cli;
pub mod duration;
pub mod options;
mod validation;

pub use cli::Cli;
pub use options::Options;

use options::{duration_option, int_option, string_option};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;
use validation::{CAPACITY_RANGE, MAX_IN_FLIGHT_RANGE, TIMEOUT_RANGE, bounded_count, bounded_duration};

pub const DEFAULT_COLLECTOR_BASE: &str = "https://collectors.sumologic.com/receiver/v1/http";

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub const OPT_HOST: &str = "host";
pub const OPT_NAME: &str = "name";
pub const OPT_CAPACITY: &str = "http.buffer.capacity";
pub const OPT_TIMEOUT: &str = "http.buffer.timeout";
pub const OPT_GZIP: &str = "http.gzip";
pub const OPT_CRASH: &str = "http.crash";
pub const OPT_PROXY: &str = "http.proxy";
pub const OPT_MAX_IN_FLIGHT: &str = "http.max_in_flight";

pub const HEADER_SOURCE_HOST: &str = "X-Sumo-Host";
pub const HEADER_SOURCE_NAME: &str = "X-Sumo-Name";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid endpoint URL '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Cannot parse proxy URL '{url}': {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// What a delivery task does when the collector cannot be reached or
/// answers with a non-success status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop the shipper; a supervisor is expected to restart it.
    Crash,
    /// Log the failure and drop the batch.
    Continue,
}

impl ErrorPolicy {
    fn from_option(value: &str) -> Self {
        if value == "false" {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::Crash
        }
    }
}

/// The adapter's address and raw options as handed over by the host router.
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub address: String,
    pub options: Options,
}

impl Route {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            options: Options::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Resolved, bounds-checked shipper settings. Built once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: Url,
    pub capacity: usize,
    pub flush_timeout: Duration,
    pub gzip: bool,
    pub error_policy: ErrorPolicy,
    pub headers: BTreeMap<String, String>,
    pub proxy: Option<Url>,
    pub connect_timeout: Duration,
    pub max_in_flight: usize,
}

impl Settings {
    /// Settings with every option at its default, posting to `endpoint`.
    pub fn for_endpoint(endpoint: Url) -> Self {
        Self {
            endpoint,
            capacity: DEFAULT_CAPACITY,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            gzip: true,
            error_policy: ErrorPolicy::Crash,
            headers: BTreeMap::new(),
            proxy: None,
            connect_timeout: CONNECT_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn from_route(route: &Route, collector_base: &str) -> Result<Self, ConfigError> {
        let options = &route.options;

        let endpoint_str = format!(
            "{}/{}",
            collector_base.trim_end_matches('/'),
            route.address.trim_start_matches('/')
        );
        let endpoint = Url::parse(&endpoint_str).map_err(|source| {
            ConfigError::InvalidEndpoint {
                url: endpoint_str.clone(),
                source,
            }
        })?;
        debug!(url = %endpoint, "collector endpoint");

        let proxy = match string_option(options, OPT_PROXY, "") {
            "" => None,
            raw => {
                let url = Url::parse(raw).map_err(|source| ConfigError::InvalidProxy {
                    url: raw.to_string(),
                    source,
                })?;
                debug!(proxy = %url, "proxy url");
                Some(url)
            }
        };

        let capacity = bounded_count(
            OPT_CAPACITY,
            int_option(options, OPT_CAPACITY, DEFAULT_CAPACITY as i64),
            CAPACITY_RANGE,
            DEFAULT_CAPACITY,
        );

        let flush_timeout = bounded_duration(
            OPT_TIMEOUT,
            duration_option(options, OPT_TIMEOUT, DEFAULT_FLUSH_TIMEOUT),
            TIMEOUT_RANGE,
            DEFAULT_FLUSH_TIMEOUT,
        );

        let max_in_flight = bounded_count(
            OPT_MAX_IN_FLIGHT,
            int_option(options, OPT_MAX_IN_FLIGHT, DEFAULT_MAX_IN_FLIGHT as i64),
            MAX_IN_FLIGHT_RANGE,
            DEFAULT_MAX_IN_FLIGHT,
        );

        let gzip = string_option(options, OPT_GZIP, "true") == "true";
        if gzip {
            debug!("gzip compression enabled");
        }

        let error_policy = ErrorPolicy::from_option(string_option(options, OPT_CRASH, "true"));
        if error_policy == ErrorPolicy::Continue {
            debug!("delivery errors will be logged and dropped");
        }

        let mut headers = BTreeMap::new();
        for (option, header) in [(OPT_HOST, HEADER_SOURCE_HOST), (OPT_NAME, HEADER_SOURCE_NAME)] {
            let value = string_option(options, option, "");
            if !value.is_empty() {
                headers.insert(header.to_string(), value.to_string());
            }
        }

        Ok(Self {
            endpoint,
            capacity,
            flush_timeout,
            gzip,
            error_policy,
            headers,
            proxy,
            connect_timeout: CONNECT_TIMEOUT,
            max_in_flight,
        })
    }
}
