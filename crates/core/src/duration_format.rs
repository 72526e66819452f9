//! Serde adapters for `Duration` fields written as short suffixed
//! strings (`"30s"`, `"5m"`, `"4h"`, `"1h30m"`), the duration literal
//! style used throughout route, receiver, and cluster configuration.

use std::time::Duration;

/// Adapter for `Duration`, applied via `#[serde(with = "duration_format")]`.
pub mod required {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Adapter for `Option<Duration>`, applied via `#[serde(with = "duration_format::optional")]`.
pub mod optional {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(d) => s.serialize_str(&super::format_duration(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| super::parse_duration(&s).map_err(serde::de::Error::custom)).transpose()
    }
}

fn format_duration(d: Duration) -> String {
    let mut secs = d.as_secs();
    let mut out = String::new();
    for (unit, size) in [("y", 31_536_000), ("w", 604_800), ("d", 86_400), ("h", 3600), ("m", 60), ("s", 1)] {
        let n = secs / size;
        if n > 0 {
            out.push_str(&format!("{n}{unit}"));
            secs %= size;
        }
    }
    if out.is_empty() { "0s".to_string() } else { out }
}

/// Parse a duration literal: a sequence of `<number><unit>` pairs
/// (`w`, `d`, `h`, `m`, `s`) summed together, e.g. `"1h30m"`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let mut total = Duration::ZERO;
    let mut rest = input.trim();
    if rest.is_empty() {
        return Err("empty duration".to_string());
    }
    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).ok_or_else(|| format!("missing unit in {input:?}"))?;
        if digits_end == 0 {
            return Err(format!("expected digits in {input:?}"));
        }
        let (digits, remainder) = rest.split_at(digits_end);
        let value: u64 = digits.parse().map_err(|_| format!("invalid number in {input:?}"))?;
        let unit_end = remainder.find(|c: char| c.is_ascii_digit()).unwrap_or(remainder.len());
        let (unit, next) = remainder.split_at(unit_end);
        let secs_per_unit = match unit {
            "y" => 31_536_000,
            "w" => 604_800,
            "d" => 86_400,
            "h" => 3600,
            "m" => 60,
            "s" => 1,
            other => return Err(format!("unknown duration unit {other:?} in {input:?}")),
        };
        total += Duration::from_secs(value * secs_per_unit);
        rest = next;
    }
    Ok(total)
}
