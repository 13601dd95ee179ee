use fs_err as fs;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::errors::{Result, StudioError};
use crate::wire::GeneratedImage;

/// A generated image as stored in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(flatten)]
    pub image: GeneratedImage,
}

/// SQLite-backed record of every generated image.
pub struct History {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS images (
    id        TEXT PRIMARY KEY,
    image_url TEXT NOT NULL,
    prompt    TEXT NOT NULL,
    timestamp INTEGER NOT NULL
)";

impl History {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StudioError::Storage(e.to_string()))?;
        }
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn record(&self, image: &GeneratedImage) -> Result<HistoryEntry> {
        let entry = HistoryEntry { id: Uuid::new_v4().to_string(), image: image.clone() };
        self.conn.lock().execute(
            "INSERT INTO images (id, image_url, prompt, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![entry.id, image.image_url, image.prompt, image.timestamp],
        )?;
        log::debug!("history: recorded {}", entry.id);
        Ok(entry)
    }

    /// Most recent first.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, image_url, prompt, timestamp FROM images
             ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                image: GeneratedImage { image_url: row.get(1)?, prompt: row.get(2)?, timestamp: row.get(3)? },
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
