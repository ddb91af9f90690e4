use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

const SHORT_DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";
const SHORT_DATE_FORMAT: &str = "%d/%m/%Y";
const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn to_unix(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp()
}

pub fn from_unix(seconds: i64, field: &str) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .ok_or_else(|| anyhow!("{field} holds out-of-range unix timestamp {seconds}"))
}

/// Short date-time in `tz`, e.g. `07/03/2024 14:05`. Never contains a comma,
/// so spreadsheet column splitting keeps it as one cell.
pub fn format_date_time<Tz>(timestamp: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    timestamp
        .with_timezone(tz)
        .format(SHORT_DATE_TIME_FORMAT)
        .to_string()
}

pub fn format_local_date_time(timestamp: DateTime<Utc>) -> String {
    format_date_time(timestamp, &Local)
}

pub fn format_local_date(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format(SHORT_DATE_FORMAT)
        .to_string()
}

/// Abbreviated relative time, minute resolution.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - then;
    if elapsed.num_seconds() < 0 {
        return "in the future".to_string();
    }

    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if hours < 1 {
        format!("{minutes} min. ago")
    } else if days < 1 {
        format!("{hours} hr. ago")
    } else if days == 1 {
        "Yesterday".to_string()
    } else if days < 7 {
        format!("{days} days ago")
    } else {
        format_local_date(then)
    }
}

/// Start of `day` (`YYYY-MM-DD`) in the local timezone.
pub fn local_day_start(day: &str) -> Result<DateTime<Utc>> {
    let date = parse_day(day)?;
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid start of day for {day}"))?;
    resolve_local(naive, true)
}

/// Last second of `day` (`YYYY-MM-DD`) in the local timezone.
pub fn local_day_end(day: &str) -> Result<DateTime<Utc>> {
    let date = parse_day(day)?;
    let naive = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| anyhow!("invalid end of day for {day}"))?;
    resolve_local(naive, false)
}

fn parse_day(day: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(day, DAY_FORMAT)
        .with_context(|| format!("expected a date like 2024-03-07, got '{day}'"))
}

fn resolve_local(naive: NaiveDateTime, earliest: bool) -> Result<DateTime<Utc>> {
    let mapped = Local.from_local_datetime(&naive);
    let resolved = if earliest {
        mapped.earliest()
    } else {
        mapped.latest()
    };
    resolved
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("local time {naive} does not exist"))
}
