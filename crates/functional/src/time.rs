//! Time and duration helpers backed by chrono / chrono-tz
//!
//! The default timezone is process-wide state: initialised to UTC, settable
//! at most once before evaluation begins, concurrency-safe to read.

use crate::{sym, FunctionError, FunctionResult};
use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

static DEFAULT_TZ: OnceLock<Tz> = OnceLock::new();

/// Set the process-wide default timezone; fails on unknown names and on
/// repeated initialisation
pub fn set_default_timezone(name: &str) -> FunctionResult<()> {
    let tz = parse_tz("set_default_timezone", name)?;
    DEFAULT_TZ
        .set(tz)
        .map_err(|_| FunctionError::malformed("set_default_timezone", "already initialised"))
}

/// The default timezone; UTC unless `set_default_timezone` ran
pub fn default_timezone() -> Tz {
    DEFAULT_TZ.get().copied().unwrap_or(Tz::UTC)
}

/// Current wall-clock time in epoch nanoseconds
pub fn now_nanos() -> FunctionResult<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| FunctionError::malformed(sym::TIME_NOW, e.to_string()))?;
    i64::try_from(elapsed.as_nanos())
        .map_err(|_| FunctionError::Overflow(sym::TIME_NOW.to_string()))
}

fn parse_tz(function: &str, name: &str) -> FunctionResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| FunctionError::malformed(function, format!("unknown timezone {name:?}")))
}

fn strftime_for_precision(function: &str, precision: &str) -> FunctionResult<&'static str> {
    Ok(match precision {
        "/year" => "%Y",
        "/month" => "%Y-%m",
        "/day" => "%Y-%m-%d",
        "/hour" => "%Y-%m-%dT%H",
        "/minute" => "%Y-%m-%dT%H:%M",
        "/second" => "%Y-%m-%dT%H:%M:%S",
        "/millisecond" => "%Y-%m-%dT%H:%M:%S%.3f",
        "/microsecond" => "%Y-%m-%dT%H:%M:%S%.6f",
        "/nanosecond" => "%Y-%m-%dT%H:%M:%S%.9f",
        other => {
            return Err(FunctionError::malformed(
                function,
                format!("unsupported precision {other}"),
            ))
        }
    })
}

/// Format an instant at the given precision, UTC
pub fn format(nanos: i64, precision: &str) -> FunctionResult<String> {
    let fmt = strftime_for_precision(sym::TIME_FORMAT, precision)?;
    Ok(DateTime::<Utc>::from_timestamp_nanos(nanos)
        .format(fmt)
        .to_string())
}

/// Format an instant at the given precision in a named timezone
pub fn format_civil(nanos: i64, tz_name: &str, precision: &str) -> FunctionResult<String> {
    let tz = parse_tz(sym::TIME_FORMAT_CIVIL, tz_name)?;
    let fmt = strftime_for_precision(sym::TIME_FORMAT_CIVIL, precision)?;
    Ok(DateTime::<Utc>::from_timestamp_nanos(nanos)
        .with_timezone(&tz)
        .format(fmt)
        .to_string())
}

/// Parse an RFC 3339 timestamp to epoch nanoseconds
pub fn parse_rfc3339(input: &str) -> FunctionResult<i64> {
    let dt = DateTime::parse_from_rfc3339(input)
        .map_err(|e| FunctionError::malformed(sym::TIME_PARSE_RFC3339, e.to_string()))?;
    dt.timestamp_nanos_opt()
        .ok_or_else(|| FunctionError::Overflow(sym::TIME_PARSE_RFC3339.to_string()))
}

const CIVIL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a civil (timezone-less) timestamp in a named timezone
pub fn parse_civil(input: &str, tz_name: &str) -> FunctionResult<i64> {
    let fname = sym::TIME_PARSE_CIVIL;
    let tz = parse_tz(fname, tz_name)?;
    let naive = CIVIL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .ok_or_else(|| {
            FunctionError::malformed(fname, format!("unparseable civil time {input:?}"))
        })?;
    let dt = tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
        FunctionError::malformed(fname, format!("{input:?} does not exist in {tz_name}"))
    })?;
    dt.timestamp_nanos_opt()
        .ok_or_else(|| FunctionError::Overflow(fname.to_string()))
}

/// A civil-time field of an instant, read in the default timezone
pub fn civil_field(nanos: i64, function: &str) -> i64 {
    let dt = DateTime::<Utc>::from_timestamp_nanos(nanos).with_timezone(&default_timezone());
    match function {
        sym::TIME_YEAR => i64::from(dt.year()),
        sym::TIME_MONTH => i64::from(dt.month()),
        sym::TIME_DAY => i64::from(dt.day()),
        sym::TIME_HOUR => i64::from(dt.hour()),
        sym::TIME_MINUTE => i64::from(dt.minute()),
        _ => i64::from(dt.second()),
    }
}

/// Truncate an instant down to a multiple of the unit since the epoch
///
/// Years and months are not fixed durations and are rejected.
pub fn trunc(nanos: i64, unit: &str) -> FunctionResult<i64> {
    let unit_nanos: i64 = match unit {
        "/day" => 86_400_000_000_000,
        "/hour" => 3_600_000_000_000,
        "/minute" => 60_000_000_000,
        "/second" => 1_000_000_000,
        "/millisecond" => 1_000_000,
        "/microsecond" => 1_000,
        "/nanosecond" => 1,
        other => {
            return Err(FunctionError::malformed(
                sym::TIME_TRUNC,
                format!("unsupported truncation unit {other}"),
            ))
        }
    };
    Ok(nanos - nanos.rem_euclid(unit_nanos))
}

const DURATION_SUFFIXES: &[(&str, i64)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parse the strict combined duration form, e.g. `1h30m`, `-250ms`
pub fn parse_duration(input: &str) -> FunctionResult<i64> {
    let fname = sym::DURATION_PARSE;
    let bad = || FunctionError::malformed(fname, format!("unparseable duration {input:?}"));

    let (negative, rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    if rest == "0" {
        return Ok(0);
    }
    if rest.is_empty() {
        return Err(bad());
    }

    let mut total: i64 = 0;
    let mut pos = 0;
    while pos < rest.len() {
        let digits_end = rest[pos..]
            .find(|c: char| !c.is_ascii_digit())
            .map(|off| pos + off)
            .ok_or_else(bad)?;
        if digits_end == pos {
            return Err(bad());
        }
        let value: i64 = rest[pos..digits_end]
            .parse()
            .map_err(|_| FunctionError::Overflow(fname.to_string()))?;
        let tail = &rest[digits_end..];
        let (suffix, unit) = DURATION_SUFFIXES
            .iter()
            .find(|(suffix, _)| tail.starts_with(suffix))
            .ok_or_else(bad)?;
        let part = value
            .checked_mul(*unit)
            .ok_or_else(|| FunctionError::Overflow(fname.to_string()))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| FunctionError::Overflow(fname.to_string()))?;
        pos = digits_end + suffix.len();
    }
    Ok(if negative { -total } else { total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(
            parse_rfc3339("2024-01-15T10:00:00Z").unwrap(),
            1_705_312_800_000_000_000
        );
        assert_eq!(
            parse_rfc3339("2024-01-15T11:00:00+01:00").unwrap(),
            1_705_312_800_000_000_000
        );
        assert!(parse_rfc3339("yesterday").is_err());
    }

    #[test]
    fn test_parse_civil() {
        // Winter: Europe/Berlin is UTC+1.
        assert_eq!(
            parse_civil("2024-01-15T11:00:00", "Europe/Berlin").unwrap(),
            parse_rfc3339("2024-01-15T10:00:00Z").unwrap()
        );
        assert_eq!(
            parse_civil("2024-01-15", "UTC").unwrap(),
            parse_rfc3339("2024-01-15T00:00:00Z").unwrap()
        );
        assert!(parse_civil("2024-01-15T11:00:00", "Mars/Olympus").is_err());
    }

    #[test]
    fn test_format_precision() {
        let t = parse_rfc3339("2024-01-15T10:20:30.5Z").unwrap();
        assert_eq!(format(t, "/day").unwrap(), "2024-01-15");
        assert_eq!(format(t, "/minute").unwrap(), "2024-01-15T10:20");
        assert_eq!(
            format(t, "/millisecond").unwrap(),
            "2024-01-15T10:20:30.500"
        );
        assert!(format(t, "/fortnight").is_err());
    }

    #[test]
    fn test_format_civil() {
        let t = parse_rfc3339("2024-07-15T10:00:00Z").unwrap();
        // Summer: Europe/Berlin is UTC+2.
        assert_eq!(
            format_civil(t, "Europe/Berlin", "/minute").unwrap(),
            "2024-07-15T12:00"
        );
    }

    #[test]
    fn test_trunc() {
        let t = parse_rfc3339("2024-01-15T10:20:30.123456789Z").unwrap();
        assert_eq!(
            trunc(t, "/minute").unwrap(),
            parse_rfc3339("2024-01-15T10:20:00Z").unwrap()
        );
        assert_eq!(
            trunc(t, "/day").unwrap(),
            parse_rfc3339("2024-01-15T00:00:00Z").unwrap()
        );
        assert!(trunc(t, "/year").is_err());
        assert!(trunc(t, "/month").is_err());
    }

    #[test]
    fn test_trunc_pre_epoch_rounds_down() {
        let t = parse_rfc3339("1969-12-31T23:59:59Z").unwrap();
        assert_eq!(
            trunc(t, "/day").unwrap(),
            parse_rfc3339("1969-12-31T00:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("0").unwrap(), 0);
        assert_eq!(parse_duration("1h30m").unwrap(), 5_400_000_000_000);
        assert_eq!(parse_duration("250ms").unwrap(), 250_000_000);
        assert_eq!(parse_duration("-5s").unwrap(), -5_000_000_000);
        assert_eq!(parse_duration("1us"), parse_duration("1µs"));
        assert_eq!(parse_duration("10m").unwrap(), 600_000_000_000);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5 s").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("s5").is_err());
    }

    #[test]
    fn test_default_timezone_is_utc() {
        assert_eq!(default_timezone(), Tz::UTC);
    }
}
