use super::{MembershipOutcome, MetadataStore, SeasonMembership, StoreError};
use crate::season::Season;
use crate::services::types::ImageRecord;
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

const RECORD_COLUMNS: &str = "id, path, filename, size_mb, created_at, indexed_at, vector_id";

/// SQLite-backed metadata catalog.
///
/// Holds the `images` table plus one membership table per season. A single
/// connection behind a mutex is enough: each pipeline run is a single
/// sequential worker.
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
}

impl SqliteMetadataStore {
    /// Open or create the catalog at the given path, with WAL mode and
    /// foreign keys on.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open catalog at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().context("failed to open in-memory catalog")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS images (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                path        TEXT NOT NULL UNIQUE,
                filename    TEXT NOT NULL,
                size_mb     REAL NOT NULL,
                created_at  TEXT NOT NULL,
                indexed_at  TEXT NOT NULL,
                vector_id   TEXT UNIQUE
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_images_vector_id ON images(vector_id)",
            [],
        )?;

        for season in Season::ALL {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        id        INTEGER PRIMARY KEY AUTOINCREMENT,
                        image_id  INTEGER NOT NULL UNIQUE REFERENCES images(id)
                    )",
                    season.table_name()
                ),
                [],
            )?;
        }

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other(anyhow!("catalog connection mutex poisoned")))
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ImageRecord> {
        Ok(ImageRecord {
            id: row.get(0)?,
            path: row.get(1)?,
            filename: row.get(2)?,
            size_mb: row.get(3)?,
            created_at: row.get(4)?,
            indexed_at: row.get(5)?,
            vector_id: row.get(6)?,
        })
    }

    fn get_by_id(conn: &Connection, image_id: i64) -> Result<ImageRecord, StoreError> {
        conn.query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM images WHERE id = ?1"),
            params![image_id],
            Self::row_to_record,
        )
        .optional()?
        .ok_or_else(|| StoreError::Other(anyhow!("no image with id {image_id}")))
    }
}

fn round_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

#[async_trait::async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn find_by_path(&self, path: &Path) -> Result<Option<ImageRecord>, StoreError> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM images WHERE path = ?1"),
                params![path.to_string_lossy()],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    async fn create_base(&self, path: &Path) -> Result<ImageRecord, StoreError> {
        // Stat at call time: the file may have vanished since discovery.
        let meta = std::fs::metadata(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StoreError::SourceVanished(path.to_path_buf())
            } else {
                StoreError::Other(
                    anyhow::Error::from(err)
                        .context(format!("failed to stat {}", path.display())),
                )
            }
        })?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let created_at: DateTime<Utc> = meta
            .created()
            .or_else(|_| meta.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let indexed_at = Utc::now();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO images (path, filename, size_mb, created_at, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                path.to_string_lossy(),
                filename,
                round_to_mb(meta.len()),
                created_at,
                indexed_at
            ],
        )?;
        Self::get_by_id(&conn, conn.last_insert_rowid())
    }

    async fn attach_embedding_ref(
        &self,
        image_id: i64,
        vector_id: &str,
    ) -> Result<ImageRecord, StoreError> {
        let conn = self.conn()?;
        let record = Self::get_by_id(&conn, image_id)?;

        match record.vector_id.as_deref() {
            // Already attached: idempotent no-op.
            Some(existing) if existing == vector_id => Ok(record),
            Some(existing) => Err(StoreError::EmbeddingRefConflict {
                image_id,
                existing: existing.to_string(),
            }),
            None => {
                conn.execute(
                    "UPDATE images SET vector_id = ?1 WHERE id = ?2",
                    params![vector_id, image_id],
                )?;
                Self::get_by_id(&conn, image_id)
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM images ORDER BY id"))?;
        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn add_season_membership(
        &self,
        season: Season,
        image_id: i64,
    ) -> Result<MembershipOutcome, StoreError> {
        let conn = self.conn()?;
        let table = season.table_name();

        // Explicit idempotent upsert: OR IGNORE swallows only the UNIQUE
        // conflict on image_id, a missing image still fails the FK check.
        let inserted = conn.execute(
            &format!("INSERT OR IGNORE INTO {table} (image_id) VALUES (?1)"),
            params![image_id],
        )? == 1;

        let id: i64 = conn.query_row(
            &format!("SELECT id FROM {table} WHERE image_id = ?1"),
            params![image_id],
            |row| row.get(0),
        )?;

        let membership = SeasonMembership {
            id,
            season,
            image_id,
        };
        Ok(if inserted {
            MembershipOutcome::Inserted(membership)
        } else {
            MembershipOutcome::Existing(membership)
        })
    }

    async fn list_season_members(
        &self,
        season: Season,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ImageRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT i.id, i.path, i.filename, i.size_mb, i.created_at, i.indexed_at, i.vector_id
             FROM images i
             JOIN {table} m ON m.image_id = i.id
             ORDER BY m.id
             LIMIT ?1 OFFSET ?2",
            table = season.table_name()
        ))?;
        let records = stmt
            .query_map(params![limit, offset], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn count_images(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count)
    }

    async fn count_indexed(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM images WHERE vector_id IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
