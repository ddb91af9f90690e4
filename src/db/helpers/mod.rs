use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

use crate::utils::time::from_unix;

/// Stores an f64 as its raw bit pattern so coordinates survive SQLite untouched.
pub fn encode_coordinate(value: f64) -> i64 {
    value.to_bits() as i64
}

pub fn decode_coordinate(bits: i64) -> f64 {
    f64::from_bits(bits as u64)
}

pub fn to_usize(value: i64, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_unix(value: i64, field: &str) -> Result<DateTime<Utc>> {
    from_unix(value, field)
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| format!("failed to parse {field}"))
}

/// Wraps a conversion failure so it can be returned from a rusqlite row mapper.
pub fn invalid_data(err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Integer,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err.to_string(),
        )),
    )
}
