//! Typed lookups over the raw adapter option table.
//!
//! None of these helpers fail: an absent option yields the default, and a
//! malformed one is reported through `tracing` before falling back to it.

use super::duration::parse_duration;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

pub type Options = HashMap<String, String>;

pub fn string_option<'a>(options: &'a Options, name: &str, default: &'a str) -> &'a str {
    options.get(name).map_or(default, String::as_str)
}

pub fn int_option(options: &Options, name: &str, default: i64) -> i64 {
    let Some(value) = options.get(name) else {
        return default;
    };

    match value.trim().parse::<i64>() {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(parameter = name, value = %value, error = %e, "invalid value for parameter");
            default
        }
    }
}

pub fn duration_option(options: &Options, name: &str, default: Duration) -> Duration {
    let Some(value) = options.get(name) else {
        return default;
    };

    match parse_duration(value.trim()) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(parameter = name, value = %value, error = %e, "invalid value for parameter");
            default
        }
    }
}
