//! Human-readable duration parsing.
//!
//! Queue settings accept either a number of milliseconds or a string such as
//! `"5min"`, `".5s"` or `"1 hour 30 minutes"`. Everything is normalized to a
//! millisecond count.

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;

/// A duration as written in configuration: raw milliseconds or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    /// Milliseconds.
    Millis(u64),
    /// Human string such as `"10s"` or `"1m 30s"`.
    Text(String),
}

impl DurationSpec {
    /// Resolve to milliseconds, or `None` if the text cannot be parsed.
    #[must_use]
    pub fn to_millis(&self) -> Option<u64> {
        match self {
            Self::Millis(ms) => Some(*ms),
            Self::Text(text) => parse_duration(text),
        }
    }
}

impl From<u64> for DurationSpec {
    fn from(ms: u64) -> Self {
        Self::Millis(ms)
    }
}

impl From<&str> for DurationSpec {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for DurationSpec {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

const fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | ',' | '_' | '-')
}

fn unit_factor(unit: &str) -> Option<f64> {
    let factor = match unit {
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        "d" | "day" | "days" => 86_400_000.0,
        "w" | "week" | "weeks" => 604_800_000.0,
        _ => return None,
    };
    Some(factor)
}

/// Parse a human duration string into milliseconds.
///
/// Terms add up (`"1s 500ms"` is 1500). A number without a unit counts as
/// milliseconds. Separators `,`, `_` and `-` inside numbers are ignored, so
/// `"10,000 sec"` works. Returns `None` for empty or malformed input.
///
/// ```
/// use prism_queue::util::parse_duration;
///
/// assert_eq!(parse_duration("5min"), Some(300_000));
/// assert_eq!(parse_duration(".5s"), Some(500));
/// assert_eq!(parse_duration("1 hour 23 minutes"), Some(4_980_000));
/// assert_eq!(parse_duration("soon"), None);
/// ```
#[must_use]
pub fn parse_duration(input: &str) -> Option<u64> {
    let chars: Vec<char> = input.trim().chars().collect();
    if chars.is_empty() {
        return None;
    }

    let mut total = 0.0_f64;
    let mut i = 0;
    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i == chars.len() {
            break;
        }

        let mut number = String::new();
        while i < chars.len() && is_number_char(chars[i]) {
            if chars[i].is_ascii_digit() || chars[i] == '.' {
                number.push(chars[i]);
            }
            i += 1;
        }
        if number.is_empty() {
            return None;
        }
        let value: f64 = number.parse().ok()?;

        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }

        let mut unit = String::new();
        while i < chars.len() && chars[i].is_ascii_alphabetic() {
            unit.push(chars[i].to_ascii_lowercase());
            i += 1;
        }

        total += value * unit_factor(&unit)?;
    }

    if !total.is_finite() || total < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = total.round() as u64;
    Some(millis)
}

/// Resolve an optional configured duration, falling back to `fallback` when
/// the value is absent.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidDuration`] when the configured value (or
/// the fallback) cannot be parsed.
pub fn resolve_ms(
    spec: Option<&DurationSpec>,
    fallback: &str,
    field: &str,
) -> Result<u64, SchedulerError> {
    match spec {
        Some(spec) => spec.to_millis().ok_or_else(|| SchedulerError::InvalidDuration {
            field: field.to_owned(),
            value: format!("{spec:?}"),
        }),
        None => parse_duration(fallback).ok_or_else(|| SchedulerError::InvalidDuration {
            field: field.to_owned(),
            value: fallback.to_owned(),
        }),
    }
}
