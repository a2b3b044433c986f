//! Append-only log of random samples keyed by timestamp

use crate::db::Database;
use anyhow::{Context, Result};
use chrono::Local;
use rand::Rng;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Also the frame pushed to stream clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: String,
    pub value: f64,
}

impl Sample {
    /// Fresh value in [0, 1) stamped with the current local time
    pub fn draw() -> Self {
        Self {
            timestamp: timestamp_now(),
            value: rand::thread_rng().gen::<f64>(),
        }
    }
}

/// ISO-8601 local time with microseconds, e.g. `2024-05-01T13:45:12.123456`
pub fn timestamp_now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[derive(Clone)]
pub struct SampleLog {
    db: Database,
}

impl SampleLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Fails on a duplicate timestamp.
    pub fn append(&self, sample: &Sample) -> Result<()> {
        self.db
            .conn()
            .execute(
                "INSERT INTO random_numbers (timestamp, value) VALUES (?1, ?2)",
                params![sample.timestamp, sample.value],
            )
            .context("Failed to insert random sample")?;
        Ok(())
    }

    pub fn latest(&self) -> Result<Option<Sample>> {
        self.db
            .conn()
            .query_row(
                "SELECT timestamp, value FROM random_numbers ORDER BY timestamp DESC LIMIT 1",
                [],
                |row| {
                    Ok(Sample {
                        timestamp: row.get(0)?,
                        value: row.get(1)?,
                    })
                },
            )
            .optional()
            .context("Failed to read latest random sample")
    }

    pub fn count(&self) -> Result<i64> {
        self.db
            .conn()
            .query_row("SELECT COUNT(*) FROM random_numbers", [], |row| row.get(0))
            .context("Failed to count random samples")
    }
}
