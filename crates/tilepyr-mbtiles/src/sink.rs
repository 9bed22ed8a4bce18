//! MBTiles sink with an explicit write lifecycle.
//!
//! The container is a single SQLite file with the standard MBTiles layout: a
//! `metadata` key/value table and a `tiles` table keyed by zoom, column and TMS
//! row. A sink moves through
//!
//! ```text
//! open ──> Open ──begin_write──> Writing ──end_write──> Open ──close──> Closed
//! ```
//!
//! Each write window is one SQLite transaction. If the process dies inside a
//! window, SQLite discards the uncommitted batch on the next open, so the file
//! always holds the tiles of every window that ended.

use crate::{Result, StoreError, TilesetMetadata};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tilepyr_geo::TileAddress;
use tracing::{debug, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS metadata (name TEXT NOT NULL, value TEXT);
    CREATE UNIQUE INDEX IF NOT EXISTS metadata_name ON metadata (name);
    CREATE TABLE IF NOT EXISTS tiles (
        zoom_level INTEGER NOT NULL,
        tile_column INTEGER NOT NULL,
        tile_row INTEGER NOT NULL,
        tile_data BLOB
    );
    CREATE UNIQUE INDEX IF NOT EXISTS tile_index ON tiles (zoom_level, tile_column, tile_row);
"#;

/// How long a write waits for another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state of a [`MbtilesSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkState {
    /// Connection released; every operation fails.
    Closed,
    /// Ready for metadata, reads, or a new write window.
    Open,
    /// Inside a write window; tiles may be stored.
    Writing,
}

impl SinkState {
    /// Returns the state as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SinkState::Closed => "closed",
            SinkState::Open => "open",
            SinkState::Writing => "writing",
        }
    }
}

impl std::fmt::Display for SinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only MBTiles container owned by one ingestion run.
pub struct MbtilesSink {
    path: PathBuf,
    conn: Option<Connection>,
    state: SinkState,
}

impl std::fmt::Debug for MbtilesSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MbtilesSink")
            .field("path", &self.path)
            .field("state", &self.state)
            .finish()
    }
}

impl MbtilesSink {
    /// Create or open the container at `path` for reading and writing.
    ///
    /// The parent directory must exist. An existing file that is not an SQLite
    /// database fails here rather than on the first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            r#"
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=OFF;
            "#,
        )?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), "opened tile container");

        Ok(Self {
            path,
            conn: Some(conn),
            state: SinkState::Open,
        })
    }

    /// Create an empty container at `path`, replacing any file already there.
    ///
    /// A leftover rollback journal from an interrupted writer is removed too,
    /// so nothing of the previous file survives into the new one.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut journal = path.as_os_str().to_owned();
        journal.push("-journal");
        for stale in [path, Path::new(&journal)] {
            match std::fs::remove_file(stale) {
                Ok(()) => debug!(path = %stale.display(), "removed existing file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Self::open(path)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SinkState {
        self.state
    }

    /// Location of the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upsert the tileset metadata. Allowed while open or writing.
    pub fn set_metadata(&mut self, metadata: &TilesetMetadata) -> Result<()> {
        let conn = self.connection("set metadata")?;
        let mut stmt =
            conn.prepare_cached("INSERT OR REPLACE INTO metadata (name, value) VALUES (?1, ?2)")?;
        for (name, value) in metadata.to_pairs() {
            stmt.execute(params![name, value])?;
        }
        Ok(())
    }

    /// Start a write window.
    pub fn begin_write(&mut self) -> Result<()> {
        self.expect_state(SinkState::Open, "begin a write")?;
        self.connection("begin a write")?
            .execute_batch("BEGIN IMMEDIATE")?;
        self.state = SinkState::Writing;
        Ok(())
    }

    /// Store `payload` under `address`, replacing any earlier payload for it.
    pub fn put_tile(&mut self, address: &TileAddress, payload: &[u8]) -> Result<()> {
        self.expect_state(SinkState::Writing, "put a tile")?;
        let conn = self.connection("put a tile")?;
        let mut stmt = conn.prepare_cached(
            "INSERT OR REPLACE INTO tiles (zoom_level, tile_column, tile_row, tile_data) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(params![
            address.zoom(),
            address.column(),
            address.tms_row(),
            payload
        ])?;
        Ok(())
    }

    /// Commit the write window.
    ///
    /// The window is released even when the commit fails; the failed batch is
    /// rolled back and the sink returns to `Open` so a new window can start.
    pub fn end_write(&mut self) -> Result<()> {
        self.finish_write("COMMIT", "end a write")
    }

    /// Discard everything stored since [`begin_write`](Self::begin_write).
    pub fn abort_write(&mut self) -> Result<()> {
        self.finish_write("ROLLBACK", "abort a write")
    }

    /// Start a write window that ends when the returned guard is finished or dropped.
    pub fn write_scope(&mut self) -> Result<WriteScope<'_>> {
        self.begin_write()?;
        Ok(WriteScope {
            sink: self,
            finished: false,
        })
    }

    /// Stored payload for `address`, if any.
    pub fn get_tile(&self, address: &TileAddress) -> Result<Option<Vec<u8>>> {
        let conn = self.connection("read a tile")?;
        let mut stmt = conn.prepare_cached(
            "SELECT tile_data FROM tiles \
             WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
        )?;
        let data = stmt
            .query_row(
                params![address.zoom(), address.column(), address.tms_row()],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(data)
    }

    /// Number of stored tiles.
    pub fn tile_count(&self) -> Result<u64> {
        let count: i64 = self
            .connection("count tiles")?
            .query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// All metadata rows.
    pub fn metadata(&self) -> Result<BTreeMap<String, String>> {
        let conn = self.connection("read metadata")?;
        let mut stmt = conn.prepare_cached("SELECT name, value FROM metadata")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;
        let mut metadata = BTreeMap::new();
        for row in rows {
            let (name, value) = row?;
            metadata.insert(name, value.unwrap_or_default());
        }
        Ok(metadata)
    }

    /// Commit any open window and release the connection. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let pending = if self.state == SinkState::Writing {
            self.end_write()
        } else {
            Ok(())
        };

        if let Some(conn) = self.conn.take() {
            self.state = SinkState::Closed;
            conn.close().map_err(|(_, e)| StoreError::Storage(e))?;
            debug!(path = %self.path.display(), "closed tile container");
        }
        self.state = SinkState::Closed;
        pending
    }

    fn finish_write(&mut self, statement: &str, operation: &'static str) -> Result<()> {
        self.expect_state(SinkState::Writing, operation)?;
        self.state = SinkState::Open;
        let conn = self.connection(operation)?;
        let result = conn.execute_batch(statement);
        if result.is_err() && !conn.is_autocommit() {
            // Leave no half-open transaction behind a failed commit.
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback after failed {} also failed", operation);
            }
        }
        result.map_err(StoreError::from)
    }

    fn expect_state(&self, expected: SinkState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(StoreError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn connection(&self, operation: &'static str) -> Result<&Connection> {
        self.conn.as_ref().ok_or(StoreError::InvalidState {
            operation,
            state: SinkState::Closed,
        })
    }
}

impl Drop for MbtilesSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "failed to close tile container");
        }
    }
}

/// A write window that is always ended, on every exit path.
///
/// Dropping the guard without calling [`finish`](Self::finish) commits what was
/// written so far, which keeps partial output from an interrupted run.
pub struct WriteScope<'a> {
    sink: &'a mut MbtilesSink,
    finished: bool,
}

impl WriteScope<'_> {
    /// Store a tile inside this window.
    pub fn put_tile(&mut self, address: &TileAddress, payload: &[u8]) -> Result<()> {
        self.sink.put_tile(address, payload)
    }

    /// Upsert tileset metadata inside this window.
    pub fn set_metadata(&mut self, metadata: &TilesetMetadata) -> Result<()> {
        self.sink.set_metadata(metadata)
    }

    /// Commit the tiles written so far and keep the window open.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.sink.end_write()?;
        self.sink.begin_write()
    }

    /// Commit and end the window.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.sink.end_write()
    }

    /// Roll back and end the window.
    pub fn abort(mut self) -> Result<()> {
        self.finished = true;
        self.sink.abort_write()
    }
}

impl Drop for WriteScope<'_> {
    fn drop(&mut self) {
        if self.finished || self.sink.state() != SinkState::Writing {
            return;
        }
        if let Err(e) = self.sink.end_write() {
            warn!(path = %self.sink.path().display(), error = %e, "failed to end write scope");
        }
    }
}
