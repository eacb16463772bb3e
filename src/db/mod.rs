//! Vector store module using SQLite and sqlite-vec
use rusqlite::{Connection, Result};
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;
use tracing::{debug, info};

pub mod entries;
pub mod meta;
pub mod models;
pub mod search;

/// Database file inside an index location.
pub const DB_FILE: &str = "index.sqlite3";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_path TEXT NOT NULL,
    content TEXT NOT NULL,
    batch INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_path);

CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// A SQLite connection with sqlite-vec loaded and the index schema applied.
///
/// The `vec_chunks` table is created lazily, once the embedding
/// dimensionality is known.
pub struct Db {
    pub(crate) conn: Connection,
}

impl Db {
    /// Open (or create) the database file at `path` and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening index database: {}", path.display());
        init_sqlite_vec();
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        init_sqlite_vec();
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
        debug!("sqlite-vec version: {vec_version}");
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Create the vector table for `dims`-dimensional embeddings if missing.
    pub fn ensure_vector_table(&self, dims: usize) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS vec_chunks USING vec0(embedding FLOAT[{dims}]);"
        ))
    }

    #[must_use]
    pub fn has_vector_table(&self) -> bool {
        self.conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE name = 'vec_chunks'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .is_ok_and(|n| n > 0)
    }
}

/// Serialize a float32 vector into the blob layout vec0 expects.
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice::<f32, u8>(vec).to_vec()
}

/// Inverse of [`serialize_vector`]. Trailing bytes that do not form a whole
/// float are ignored.
pub fn deserialize_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
