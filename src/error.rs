//! Error types for the driver.

use std::io;
use thiserror::Error;

/// Result type alias for tinymouse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the virtual pointer.
#[derive(Debug, Error)]
pub enum Error {
    /// An axis range with `min > max` was requested. Nothing was changed.
    #[error("invalid area: min ({min_x}, {min_y}) exceeds max ({max_x}, {max_y})")]
    InvalidArea {
        min_x: i32,
        min_y: i32,
        max_x: i32,
        max_y: i32,
    },

    /// A shared mutex was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    Lock(&'static str),

    /// Every watcher slot is in use.
    #[error("watcher registry is full ({0} slots)")]
    RegistryFull(usize),

    /// A watcher for this device name is already registered.
    #[error("device {0} is already watched")]
    AlreadyWatched(String),

    /// Opening, listing or reading a device failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A directory-change notification record was malformed or truncated.
    #[error("malformed notification record: {0}")]
    Protocol(String),

    /// The driver is already initialized.
    #[error("driver is already running")]
    AlreadyRunning,

    /// The driver is not running.
    #[error("driver is not running")]
    NotRunning,

    /// The pending operation was cancelled by `dispose`.
    #[error("cancelled")]
    Cancelled,

    /// Thread-related error.
    #[error("thread error: {0}")]
    ThreadError(String),
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}
