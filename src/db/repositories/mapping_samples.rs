use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{decode_coordinate, encode_coordinate, invalid_data, parse_unix, to_usize},
    models::{MappingSample, MappingSessionSummary},
};
use crate::utils::time::to_unix;

fn row_to_sample(row: &Row) -> Result<MappingSample, rusqlite::Error> {
    let unix_timestamp: i64 = row.get("unix_timestamp")?;
    let latitude: i64 = row.get("latitude")?;
    let longitude: i64 = row.get("longitude")?;

    Ok(MappingSample {
        id: Some(row.get("id")?),
        session_id: row.get("session_id")?,
        timestamp: parse_unix(unix_timestamp, "unix_timestamp").map_err(invalid_data)?,
        pressure_millibars: row.get("reading")?,
        latitude: decode_coordinate(latitude),
        longitude: decode_coordinate(longitude),
    })
}

fn row_to_session_summary(row: &Row) -> Result<MappingSessionSummary, rusqlite::Error> {
    let started_at: i64 = row.get("start_unix_timestamp")?;
    let ended_at: i64 = row.get("end_unix_timestamp")?;
    let reading_count: i64 = row.get("reading_count")?;

    Ok(MappingSessionSummary {
        session_id: row.get("session_id")?,
        started_at: parse_unix(started_at, "start_unix_timestamp").map_err(invalid_data)?,
        ended_at: parse_unix(ended_at, "end_unix_timestamp").map_err(invalid_data)?,
        reading_count: to_usize(reading_count, "reading_count").map_err(invalid_data)?,
    })
}

impl Database {
    /// Batch insert in one transaction: a session is stored whole or not at all.
    pub async fn insert_mapping_samples(&self, samples: &[MappingSample]) -> Result<usize> {
        let samples = samples.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO mapping_session_readings (
                        session_id,
                        unix_timestamp,
                        reading,
                        latitude,
                        longitude
                    ) VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;

                for sample in &samples {
                    stmt.execute(params![
                        sample.session_id,
                        to_unix(sample.timestamp),
                        sample.pressure_millibars,
                        encode_coordinate(sample.latitude),
                        encode_coordinate(sample.longitude),
                    ])
                    .with_context(|| {
                        format!("failed to insert sample for session {}", sample.session_id)
                    })?;
                }
            }

            tx.commit()?;
            Ok(samples.len())
        })
        .await
    }

    /// Samples of one session in insertion order.
    pub async fn query_mapping_samples_by_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<MappingSample>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, unix_timestamp, reading, latitude, longitude
                 FROM mapping_session_readings
                 WHERE session_id = ?1
                 ORDER BY id ASC",
            )?;

            let samples = stmt
                .query_map(params![session_id], row_to_sample)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(samples)
        })
        .await
    }

    /// One summary per stored session, earliest session first.
    pub async fn list_mapping_sessions(&self) -> Result<Vec<MappingSessionSummary>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id,
                        MIN(unix_timestamp) AS start_unix_timestamp,
                        MAX(unix_timestamp) AS end_unix_timestamp,
                        COUNT(*) AS reading_count
                 FROM mapping_session_readings
                 GROUP BY session_id
                 ORDER BY start_unix_timestamp ASC",
            )?;

            let sessions = stmt
                .query_map([], row_to_session_summary)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(sessions)
        })
        .await
    }

    /// Returns the number of samples removed; unknown sessions remove nothing.
    pub async fn delete_mapping_samples_by_session(&self, session_id: &str) -> Result<usize> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM mapping_session_readings WHERE session_id = ?1",
                    params![session_id],
                )
                .with_context(|| format!("failed to delete session {session_id}"))?;
            Ok(removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn sample(session: &str, offset_secs: i64, pressure: i32) -> MappingSample {
        MappingSample::new(
            session,
            base() + Duration::seconds(offset_secs),
            pressure,
            51.5 + offset_secs as f64 * 1e-5,
            -0.12 - offset_secs as f64 * 1e-5,
        )
    }

    #[tokio::test]
    async fn samples_round_trip_with_exact_coordinates() {
        let db = Database::in_memory().unwrap();
        let stored = vec![sample("a", 0, 1012), sample("a", 60, 1010)];

        assert_eq!(db.insert_mapping_samples(&stored).await.unwrap(), 2);
        let loaded = db.query_mapping_samples_by_session("a").await.unwrap();

        assert_eq!(loaded.len(), 2);
        for (expected, actual) in stored.iter().zip(&loaded) {
            assert!(actual.id.is_some());
            assert_eq!(actual.timestamp, expected.timestamp);
            assert_eq!(actual.pressure_millibars, expected.pressure_millibars);
            assert_eq!(actual.latitude.to_bits(), expected.latitude.to_bits());
            assert_eq!(actual.longitude.to_bits(), expected.longitude.to_bits());
        }
    }

    #[tokio::test]
    async fn sessions_are_summarised_and_isolated() {
        let db = Database::in_memory().unwrap();
        db.insert_mapping_samples(&[sample("late", 600, 1000), sample("late", 900, 1001)])
            .await
            .unwrap();
        db.insert_mapping_samples(&[
            sample("early", 0, 1005),
            sample("early", 30, 1006),
            sample("early", 120, 1007),
        ])
        .await
        .unwrap();

        let sessions = db.list_mapping_sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "early");
        assert_eq!(sessions[0].reading_count, 3);
        assert_eq!(sessions[0].started_at, base());
        assert_eq!(sessions[0].ended_at, base() + Duration::seconds(120));
        assert_eq!(sessions[1].session_id, "late");

        assert_eq!(db.delete_mapping_samples_by_session("early").await.unwrap(), 3);
        assert!(db
            .query_mapping_samples_by_session("early")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(db.query_mapping_samples_by_session("late").await.unwrap().len(), 2);
        assert_eq!(db.delete_mapping_samples_by_session("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_accepted() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.insert_mapping_samples(&[]).await.unwrap(), 0);
        assert!(db.list_mapping_sessions().await.unwrap().is_empty());
    }
}
