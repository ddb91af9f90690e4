use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{invalid_data, parse_date, parse_unix},
    models::{DailySummary, PressureReading},
};
use crate::utils::time::to_unix;

fn row_to_reading(row: &Row) -> Result<PressureReading, rusqlite::Error> {
    let unix_timestamp: i64 = row.get("unix_timestamp")?;

    Ok(PressureReading {
        id: Some(row.get("id")?),
        timestamp: parse_unix(unix_timestamp, "unix_timestamp").map_err(invalid_data)?,
        pressure_millibars: row.get("reading")?,
        delta_increase: row.get("delta_increase")?,
        delta_decrease: row.get("delta_decrease")?,
    })
}

fn row_to_daily_summary(row: &Row) -> Result<DailySummary, rusqlite::Error> {
    let summary_date: String = row.get("summary_date")?;

    Ok(DailySummary {
        date: parse_date(&summary_date, "summary_date").map_err(invalid_data)?,
        min_reading: row.get("min_reading")?,
        max_reading: row.get("max_reading")?,
        max_delta_increase: row.get("max_delta_increase")?,
        max_delta_decrease: row.get("max_delta_decrease")?,
    })
}

impl Database {
    /// Inserts a reading and returns it with the id assigned by SQLite.
    pub async fn insert_reading(&self, reading: &PressureReading) -> Result<PressureReading> {
        let mut record = reading.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO pressure_readings (unix_timestamp, reading, delta_increase, delta_decrease)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    to_unix(record.timestamp),
                    record.pressure_millibars,
                    record.delta_increase,
                    record.delta_decrease,
                ],
            )
            .with_context(|| "failed to insert pressure reading")?;
            record.id = Some(conn.last_insert_rowid());
            Ok(record)
        })
        .await
    }

    /// Readings with `start <= timestamp <= end`, oldest first.
    pub async fn query_readings_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PressureReading>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, unix_timestamp, reading, delta_increase, delta_decrease
                 FROM pressure_readings
                 WHERE unix_timestamp >= ?1 AND unix_timestamp <= ?2
                 ORDER BY unix_timestamp ASC, id ASC",
            )?;

            let readings = stmt
                .query_map(params![to_unix(start), to_unix(end)], row_to_reading)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(readings)
        })
        .await
    }

    pub async fn get_latest_reading(&self) -> Result<Option<PressureReading>> {
        self.execute(|conn| {
            let reading = conn
                .query_row(
                    "SELECT id, unix_timestamp, reading, delta_increase, delta_decrease
                     FROM pressure_readings
                     ORDER BY unix_timestamp DESC, id DESC
                     LIMIT 1",
                    [],
                    row_to_reading,
                )
                .optional()?;
            Ok(reading)
        })
        .await
    }

    /// Per-UTC-day min/max pressure and largest deltas, newest day first.
    pub async fn query_readings_grouped_by_day(&self) -> Result<Vec<DailySummary>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT date(unix_timestamp, 'unixepoch') AS summary_date,
                        MIN(reading) AS min_reading,
                        MAX(reading) AS max_reading,
                        MAX(delta_increase) AS max_delta_increase,
                        MAX(delta_decrease) AS max_delta_decrease
                 FROM pressure_readings
                 GROUP BY summary_date
                 ORDER BY summary_date DESC",
            )?;

            let summaries = stmt
                .query_map([], row_to_daily_summary)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(summaries)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    async fn seed(db: &Database, rows: &[(DateTime<Utc>, i32, i32, i32)]) {
        for (timestamp, pressure, inc, dec) in rows {
            db.insert_reading(&PressureReading::new(*timestamp, *pressure, *inc, *dec))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let db = Database::in_memory().unwrap();
        let first = db
            .insert_reading(&PressureReading::new(at(2024, 3, 7, 10), 1013, 0, 0))
            .await
            .unwrap();
        let second = db
            .insert_reading(&PressureReading::new(at(2024, 3, 7, 11), 1014, 1, 0))
            .await
            .unwrap();

        assert!(first.id.is_some());
        assert!(second.id > first.id);
        assert_eq!(second.pressure_millibars, 1014);
    }

    #[tokio::test]
    async fn window_query_is_inclusive_and_ordered() {
        let db = Database::in_memory().unwrap();
        let now = at(2024, 3, 8, 12);
        seed(
            &db,
            &[
                (now, 1010, 0, 0),
                (now - Duration::hours(24), 1000, 0, 0),
                (now - Duration::hours(25), 990, 0, 0),
                (now - Duration::hours(3), 1005, 0, 0),
            ],
        )
        .await;

        let readings = db
            .query_readings_in_window(now - Duration::hours(24), now)
            .await
            .unwrap();

        let pressures: Vec<i32> = readings.iter().map(|r| r.pressure_millibars).collect();
        assert_eq!(pressures, vec![1000, 1005, 1010]);
    }

    #[tokio::test]
    async fn latest_reading_is_newest_timestamp() {
        let db = Database::in_memory().unwrap();
        assert!(db.get_latest_reading().await.unwrap().is_none());

        seed(
            &db,
            &[
                (at(2024, 3, 7, 12), 1012, 0, 0),
                (at(2024, 3, 7, 9), 1009, 0, 0),
            ],
        )
        .await;

        let latest = db.get_latest_reading().await.unwrap().unwrap();
        assert_eq!(latest.pressure_millibars, 1012);
        assert_eq!(latest.timestamp, at(2024, 3, 7, 12));
    }

    #[tokio::test]
    async fn groups_by_utc_day_newest_first() {
        let db = Database::in_memory().unwrap();
        seed(
            &db,
            &[
                (at(2024, 3, 6, 8), 1001, 2, 7),
                (at(2024, 3, 6, 20), 1009, 8, 1),
                (at(2024, 3, 7, 0), 1015, 6, 0),
                (at(2024, 3, 7, 23), 1011, 0, 4),
            ],
        )
        .await;

        let summaries = db.query_readings_grouped_by_day().await.unwrap();

        assert_eq!(
            summaries,
            vec![
                DailySummary {
                    date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
                    min_reading: 1011,
                    max_reading: 1015,
                    max_delta_increase: 6,
                    max_delta_decrease: 4,
                },
                DailySummary {
                    date: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
                    min_reading: 1001,
                    max_reading: 1009,
                    max_delta_increase: 8,
                    max_delta_decrease: 7,
                },
            ]
        );
    }
}
