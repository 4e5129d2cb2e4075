//! Normalization of feature timestamps into naive date-times.
//!
//! Timezone offsets are dropped, not converted: a value of `2020-09-01T10:00:00-07:00` becomes
//! `2020-09-01T10:00:00`. All timestamps are therefore compared as if they were in the same implicit
//! zone as the reference time, which can shift the window edge by up to the offset.
//!
//! Integer values are epoch milliseconds and carry no offset to strip, so they become UTC wall-clock time.
//! The same instant can therefore normalize to different values: `2020-09-01T10:00:00-07:00` becomes
//! `10:00:00` while its epoch milliseconds become `17:00:00`. A dataset encodes its dates one way, so
//! values within one run stay comparable.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::geofile::feature::AttributeValue;

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Returns `Ok(None)` for null values and an error message for values that are not a recognizable timestamp.
pub fn normalize_timestamp(value: &AttributeValue) -> Result<Option<NaiveDateTime>, String> {
    match value {
        AttributeValue::Null => Ok(None),
        AttributeValue::NaiveDateTime(date_time) => Ok(Some(*date_time)),
        AttributeValue::DateTime(date_time) => Ok(Some(date_time.naive_local())),
        AttributeValue::Date(date) => Ok(Some(date.and_time(NaiveTime::MIN))),
        AttributeValue::Integer(epoch_millis) => DateTime::<Utc>::from_timestamp_millis(*epoch_millis)
            .map(|date_time| Some(date_time.naive_utc()))
            .ok_or_else(|| format!("epoch milliseconds {} out of range", epoch_millis)),
        AttributeValue::String(text) => parse_timestamp(text).map(Some),
        AttributeValue::Real(value) => Err(format!("cannot interpret number {} as a timestamp", value)),
    }
}

fn parse_timestamp(text: &str) -> Result<NaiveDateTime, String> {
    let text = text.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(text) {
        return Ok(date_time.naive_local());
    }
    // Offsets such as "+00" or "+0000", which RFC 3339 does not allow.
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f%#z",
        "%Y-%m-%d %H:%M:%S%.f%#z",
        "%Y/%m/%d %H:%M:%S%.f%#z",
    ] {
        if let Ok(date_time) = DateTime::parse_from_str(text, format) {
            return Ok(date_time.naive_local());
        }
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(date_time);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }
    Err(format!("cannot parse '{}' as a timestamp", text))
}
