//! CSV and plain-text renderings of stored readings and mapping sessions.
//!
//! Date-time cells use the short `dd/mm/yyyy HH:MM` form and are always
//! quoted; numeric cells are left bare so spreadsheets pick them up as
//! numbers.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    db::{DailySummary, MappingSample, PressureReading},
    utils::time::format_date_time,
};

const READINGS_HEADER: &str = "Date & Time,Reading,Delta Increase,Delta Decrease\n";
const SUMMARIES_HEADER: &str =
    "Date,Min Reading,Max Reading,Max Delta Increase,Max Delta Decrease\n";
const SESSION_HEADER: &str = "Date & Time,Reading,Latitude,Longitude\n";
const SUMMARY_DATE_FORMAT: &str = "%Y-%m-%d";

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::NonNumeric)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer)
}

/// Readings in stored order, optionally preceded by a header line.
pub fn write_readings_csv<W, Tz>(
    mut writer: W,
    readings: &[PressureReading],
    include_headers: bool,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if include_headers {
        writer.write_all(READINGS_HEADER.as_bytes())?;
    }

    let mut csv = csv_writer(writer);
    for reading in readings {
        csv.serialize((
            format_date_time(reading.timestamp, tz),
            reading.pressure_millibars,
            reading.delta_increase,
            reading.delta_decrease,
        ))
        .context("failed to write reading row")?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_daily_summaries_csv<W: Write>(mut writer: W, summaries: &[DailySummary]) -> Result<()> {
    writer.write_all(SUMMARIES_HEADER.as_bytes())?;

    let mut csv = csv_writer(writer);
    for summary in summaries {
        csv.serialize((
            summary.date.format(SUMMARY_DATE_FORMAT).to_string(),
            summary.min_reading,
            summary.max_reading,
            summary.max_delta_increase,
            summary.max_delta_decrease,
        ))
        .context("failed to write summary row")?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_session_csv<W, Tz>(mut writer: W, samples: &[MappingSample], tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    writer.write_all(SESSION_HEADER.as_bytes())?;

    let mut csv = csv_writer(writer);
    for sample in samples {
        csv.serialize((
            format_date_time(sample.timestamp, tz),
            sample.pressure_millibars,
            sample.latitude,
            sample.longitude,
        ))
        .context("failed to write session row")?;
    }
    csv.flush()?;
    Ok(())
}

/// One `lat, lon {reading}` line per sample, the bulk-entry format accepted
/// by map plotting sites.
pub fn write_session_map_lines<W: Write>(mut writer: W, samples: &[MappingSample]) -> Result<()> {
    for sample in samples {
        writeln!(
            writer,
            "{}, {} {{{}}}",
            sample.latitude, sample.longitude, sample.pressure_millibars
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Interchange row for unreduced samples: RFC 3339 timestamps, full
/// precision coordinates, session id optional.
#[derive(Debug, Serialize, Deserialize)]
struct RawSampleRow {
    #[serde(default)]
    session_id: String,
    timestamp: DateTime<Utc>,
    pressure_millibars: i32,
    latitude: f64,
    longitude: f64,
}

impl From<RawSampleRow> for MappingSample {
    fn from(row: RawSampleRow) -> Self {
        MappingSample::new(
            row.session_id,
            row.timestamp,
            row.pressure_millibars,
            row.latitude,
            row.longitude,
        )
    }
}

impl From<&MappingSample> for RawSampleRow {
    fn from(sample: &MappingSample) -> Self {
        Self {
            session_id: sample.session_id.clone(),
            timestamp: sample.timestamp,
            pressure_millibars: sample.pressure_millibars,
            latitude: sample.latitude,
            longitude: sample.longitude,
        }
    }
}

pub fn read_raw_samples_csv<R: std::io::Read>(reader: R) -> Result<Vec<MappingSample>> {
    let mut csv = csv::Reader::from_reader(reader);
    csv.deserialize::<RawSampleRow>()
        .enumerate()
        .map(|(index, row)| {
            row.map(MappingSample::from)
                .with_context(|| format!("invalid sample on data row {}", index + 1))
        })
        .collect()
}

pub fn write_raw_samples_csv<W: Write>(writer: W, samples: &[MappingSample]) -> Result<()> {
    let mut csv = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);
    for sample in samples {
        csv.serialize(RawSampleRow::from(sample))
            .context("failed to write sample row")?;
    }
    csv.flush()?;
    Ok(())
}
