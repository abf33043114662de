use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::warn;

pub const CAPACITY_RANGE: RangeInclusive<i64> = 1..=10_000;
pub const MAX_IN_FLIGHT_RANGE: RangeInclusive<i64> = 1..=1_024;
pub const TIMEOUT_RANGE: RangeInclusive<Duration> =
    Duration::from_millis(100)..=Duration::from_secs(600);

/// Returns `value` if it lies within `range`, otherwise reports it and
/// returns `default`.
pub fn bounded_count(name: &str, value: i64, range: RangeInclusive<i64>, default: usize) -> usize {
    if range.contains(&value) {
        // range starts at 1, so the cast cannot wrap
        value as usize
    } else {
        warn!(
            parameter = name,
            value,
            default,
            "non-sensical value for parameter, using default"
        );
        default
    }
}

pub fn bounded_duration(
    name: &str,
    value: Duration,
    range: RangeInclusive<Duration>,
    default: Duration,
) -> Duration {
    if range.contains(&value) {
        value
    } else {
        warn!(
            parameter = name,
            value = ?value,
            default = ?default,
            "non-sensical value for parameter, using default"
        );
        default
    }
}
