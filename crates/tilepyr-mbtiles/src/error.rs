//! Error types for the MBTiles sink.

use crate::sink::SinkState;
use thiserror::Error;

/// Errors that can occur while writing or reading a tile container.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure: missing directory, permissions, corrupt file, full disk.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// I/O error outside SQLite.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation not allowed in the sink's current lifecycle state.
    #[error("Cannot {operation} while the sink is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the sink was in.
        state: SinkState,
    },
}
