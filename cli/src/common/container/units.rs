//! # Unit Conversions
//!
//! File: cli/src/common/container/units.rs
//!
//! Human-readable byte sizes (`512m`, `1.5G`) and compact durations
//! (`1h2m3s4ms5us`) as accepted in container specs, and the reverse
//! rendering used when the Docker CLI needs a Go duration string.
//!
use crate::core::error::{DockhandError, Result};
use anyhow::anyhow;
use regex::Regex;
use std::sync::LazyLock;

static RE_HUMAN_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]*\.?[0-9]+)(?:\s*([A-Za-z]+))?\s*$").expect("size grammar")
});

const SIZE_UNITS: &[(char, u32)] = &[
    ('B', 0),
    ('K', 10),
    ('M', 20),
    ('G', 30),
    ('T', 40),
    ('P', 50),
    ('E', 60),
];

fn config_error(message: String) -> anyhow::Error {
    anyhow!(DockhandError::Config(message))
}

/// Converts a size such as `128m`, `2G`, `1.5KB` or `4096` to bytes.
///
/// The unit is one letter of `BKMGTPE` (case-insensitive), optionally followed
/// by `B`/`b`. A bare number is taken as bytes.
///
/// # Errors
///
/// `DockhandError::Config` for anything that does not fit the grammar.
pub fn human_to_bytes(input: &str) -> Result<i64> {
    let caps = RE_HUMAN_SIZE.captures(input.trim()).ok_or_else(|| {
        config_error(format!("Cannot interpret {:?} as a byte size", input))
    })?;
    let number: f64 = caps[1]
        .parse()
        .map_err(|_| config_error(format!("Cannot interpret {:?} as a byte size", input)))?;

    let Some(unit) = caps.get(2).map(|m| m.as_str()) else {
        return checked_bytes(number, input);
    };
    let mut chars = unit.chars();
    let prefix = chars.next().map(|c| c.to_ascii_uppercase()).unwrap_or('B');
    let shift = SIZE_UNITS
        .iter()
        .find(|(c, _)| *c == prefix)
        .map(|(_, s)| *s)
        .ok_or_else(|| {
            config_error(format!(
                "Failed to convert {:?}: the suffix must be one of B, K, M, G, T, P, E",
                input
            ))
        })?;
    let rest: String = chars.collect();
    let valid_rest = rest.is_empty()
        || (prefix != 'B' && rest.eq_ignore_ascii_case("b"))
        || unit.eq_ignore_ascii_case("byte")
        || unit.eq_ignore_ascii_case("bytes");
    if !valid_rest {
        return Err(config_error(format!(
            "Failed to convert {:?}: expected {}B or {}",
            input, prefix, prefix
        )));
    }
    checked_bytes(number * (1u64 << shift) as f64, input)
}

/// Rounds to whole bytes; values outside `i64` are rejected, not saturated.
fn checked_bytes(bytes: f64, input: &str) -> Result<i64> {
    let rounded = bytes.round();
    // `i64::MAX as f64` is 2^63, one past the largest representable value.
    if !rounded.is_finite() || rounded < 0.0 || rounded >= i64::MAX as f64 {
        return Err(config_error(format!("Byte size {:?} is out of range", input)));
    }
    Ok(rounded as i64)
}

/// Parses `1h2m3s4ms5us`-style durations into nanoseconds.
///
/// Units must appear in descending order and at most once each.
///
/// # Errors
///
/// `DockhandError::Config` for empty input, unknown units or out-of-order units.
pub fn duration_to_nanos(input: &str) -> Result<i64> {
    const UNITS: &[(&str, i64)] = &[
        ("h", 3_600_000_000_000),
        ("m", 60_000_000_000),
        ("s", 1_000_000_000),
        ("ms", 1_000_000),
        ("us", 1_000),
    ];
    let invalid = || config_error(format!("Invalid time duration - {}", input));
    if input.is_empty() {
        return Err(invalid());
    }

    let mut rest = input;
    let mut next_unit = 0;
    let mut total: i64 = 0;
    while !rest.is_empty() {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid());
        }
        let value: i64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];
        let letters = rest.chars().take_while(char::is_ascii_alphabetic).count();
        let unit = &rest[..letters];
        rest = &rest[letters..];
        let position = UNITS[next_unit..]
            .iter()
            .position(|(u, _)| *u == unit)
            .ok_or_else(invalid)?;
        let (_, factor) = UNITS[next_unit + position];
        next_unit += position + 1;
        total = value
            .checked_mul(factor)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(invalid)?;
    }
    Ok(total)
}

/// Renders nanoseconds as a Go duration the Docker CLI accepts.
pub fn nanos_to_go_duration(nanos: i64) -> String {
    if nanos % 1_000_000_000 == 0 {
        format!("{}s", nanos / 1_000_000_000)
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{}us", nanos / 1_000)
    } else {
        format!("{}ns", nanos)
    }
}
