//! Parser for duration option values such as `1000ms`, `1.5s` or `1m30s`.
//!
//! The grammar is a sequence of decimal numbers, each with an optional
//! fraction and a mandatory unit suffix (`ns`, `us`, `µs`, `ms`, `s`, `m`,
//! `h`). A bare `0` is also accepted.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("Empty duration")]
    Empty,
    #[error("Invalid number in duration '{input}'")]
    InvalidNumber { input: String },
    #[error("Missing unit in duration '{input}'")]
    MissingUnit { input: String },
    #[error("Unknown unit '{unit}' in duration '{input}'")]
    UnknownUnit { unit: String, input: String },
    #[error("Negative duration '{input}'")]
    Negative { input: String },
    #[error("Duration '{input}' overflows")]
    Overflow { input: String },
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let (negative, mut rest) = match input.strip_prefix('-') {
        Some(stripped) => (true, stripped),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let overflow = || DurationParseError::Overflow {
        input: input.to_string(),
    };
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_number) = match after_int.strip_prefix('.') {
            Some(stripped) => {
                let frac_len = stripped.bytes().take_while(u8::is_ascii_digit).count();
                stripped.split_at(frac_len)
            }
            None => ("", after_int),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DurationParseError::InvalidNumber {
                input: input.to_string(),
            });
        }

        let unit_len = after_number
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after_number.len());
        let (unit, next) = after_number.split_at(unit_len);

        if unit.is_empty() {
            return Err(DurationParseError::MissingUnit {
                input: input.to_string(),
            });
        }
        let Some(scale) = unit_nanos(unit) else {
            return Err(DurationParseError::UnknownUnit {
                unit: unit.to_string(),
                input: input.to_string(),
            });
        };

        if !int_part.is_empty() {
            let whole: u128 = int_part.parse().map_err(|_| overflow())?;
            total = whole
                .checked_mul(scale)
                .and_then(|nanos| total.checked_add(nanos))
                .ok_or_else(overflow)?;
        }

        if !frac_part.is_empty() {
            let fraction: f64 = format!("0.{frac_part}")
                .parse()
                .map_err(|_| DurationParseError::InvalidNumber {
                    input: input.to_string(),
                })?;
            total = total
                .checked_add((fraction * scale as f64) as u128)
                .ok_or_else(overflow)?;
        }

        rest = next;
    }

    if negative && total > 0 {
        return Err(DurationParseError::Negative {
            input: input.to_string(),
        });
    }

    let nanos = u64::try_from(total).map_err(|_| overflow())?;
    Ok(Duration::from_nanos(nanos))
}
