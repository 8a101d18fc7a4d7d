// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable duration strings ("30s", "5m", "1h30m", "500ms")

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("empty duration string")]
    Empty,
    #[error("invalid number in duration: {0}")]
    InvalidNumber(String),
    #[error("unknown duration suffix: {0}")]
    UnknownSuffix(String),
    #[error("duration out of range: {0}")]
    Overflow(String),
}

/// Parse a duration string into a Duration.
///
/// Accepts one or more `<number><unit>` groups (`1h30m`). A bare number is
/// seconds.
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits_end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (num_str, tail) = rest.split_at(digits_end);
        let num: u64 = num_str
            .parse()
            .map_err(|_| DurationError::InvalidNumber(s.to_string()))?;

        let tail = tail.trim_start();
        let suffix_end = tail
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphabetic())
            .map(|(i, _)| i)
            .unwrap_or(tail.len());
        let (suffix, next) = tail.split_at(suffix_end);

        let part = match suffix {
            "ms" | "millis" | "millisecond" | "milliseconds" => Duration::from_millis(num),
            "" | "s" | "sec" | "secs" | "second" | "seconds" => Duration::from_secs(num),
            "m" | "min" | "mins" | "minute" | "minutes" => from_secs_checked(s, num, 60)?,
            "h" | "hr" | "hrs" | "hour" | "hours" => from_secs_checked(s, num, 3600)?,
            "d" | "day" | "days" => from_secs_checked(s, num, 86400)?,
            other => return Err(DurationError::UnknownSuffix(other.to_string())),
        };
        total = total
            .checked_add(part)
            .ok_or_else(|| DurationError::Overflow(s.to_string()))?;

        // A bare trailing number ends the string; anything else must start a new group
        if suffix.is_empty() && !next.trim().is_empty() {
            return Err(DurationError::InvalidNumber(s.to_string()));
        }
        rest = next.trim_start();
    }

    Ok(total)
}

fn from_secs_checked(input: &str, num: u64, multiplier: u64) -> Result<Duration, DurationError> {
    num.checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| DurationError::Overflow(input.to_string()))
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
