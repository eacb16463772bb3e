/// Key/value build metadata stored in `index_meta`.
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result, params};

use super::{Db, models::IndexMeta};

const MODEL_ID: &str = "model_id";
const DIMENSIONS: &str = "dimensions";
const COUNT: &str = "count";
const CREATED_AT: &str = "created_at";
const COMPLETE: &str = "complete";

impl Db {
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
    }

    /// Record which embedding setup produced this index.
    pub fn write_header(&self, model_id: &str, dimensions: usize) -> Result<()> {
        self.set_meta(MODEL_ID, model_id)?;
        self.set_meta(DIMENSIONS, &dimensions.to_string())?;
        self.set_meta(COUNT, "0")?;
        self.set_meta(CREATED_AT, &Utc::now().to_rfc3339())?;
        Ok(())
    }

    /// Mark the build finished. Loads refuse indexes without this marker.
    pub fn mark_complete(&self) -> Result<()> {
        self.set_meta(COMPLETE, "true")
    }

    /// Build metadata, or `None` when no header was ever written.
    pub fn read_meta(&self) -> Result<Option<IndexMeta>> {
        let Some(model_id) = self.get_meta(MODEL_ID)? else {
            return Ok(None);
        };
        let parse_usize = |v: Option<String>| v.and_then(|s| s.parse().ok()).unwrap_or(0);

        let dimensions = parse_usize(self.get_meta(DIMENSIONS)?);
        let count = parse_usize(self.get_meta(COUNT)?);
        let created_at = self
            .get_meta(CREATED_AT)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map_or_else(Utc::now, |t| t.with_timezone(&Utc));
        let complete = self.get_meta(COMPLETE)?.as_deref() == Some("true");

        Ok(Some(IndexMeta {
            model_id,
            dimensions,
            count,
            created_at,
            complete,
        }))
    }

    pub(crate) fn set_count(&self, count: usize) -> Result<()> {
        self.set_meta(COUNT, &count.to_string())
    }
}
