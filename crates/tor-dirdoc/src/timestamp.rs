//! Timestamps as written in consensus documents.
//!
//! Directory documents write times as `2024-01-01 12:00:00`, always in UTC
//! but without saying so.  Some producers append a zone name; we accept a
//! trailing `GMT` or `UTC` and nothing else.

use std::time::SystemTime;

use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::FormatItem,
    macros::format_description,
};

use crate::{Error, Result};

/// Format of the date and time fields of a `valid-until` line.
const VALID_UNTIL_FMT: &[FormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Parse the argument of a `valid-until` line as a UTC instant.
pub fn parse_valid_until(s: &str) -> Result<SystemTime> {
    let trimmed = s.trim();
    let trimmed = trimmed
        .strip_suffix("GMT")
        .or_else(|| trimmed.strip_suffix("UTC"))
        .unwrap_or(trimmed)
        .trim_end();
    let d = PrimitiveDateTime::parse(trimmed, &VALID_UNTIL_FMT)
        .map_err(|_| Error::MalformedDate(s.to_owned()))?;
    Ok(d.assume_utc().into())
}

/// Format `t` the way [`parse_valid_until`] expects to read it.
pub fn format_valid_until(t: SystemTime) -> Result<String> {
    OffsetDateTime::from(t)
        .format(VALID_UNTIL_FMT)
        .map_err(|e| Error::MalformedDate(e.to_string()))
}
