//! The operating-system collaborators the driver consumes.
//!
//! The Linux implementation lives in the platform module ([`DevInput`]);
//! tests plug in simulated devices through the same traits.
//!
//! [`DevInput`]: crate::DevInput

use crate::error::Result;
use crate::notify::NotifyRecord;
use evdev::InputEvent;
use std::io;
use std::time::Duration;

/// A per-device stream of fixed-size input records.
pub trait EventStream: Send {
    /// Wait up to `timeout` for the next record.
    ///
    /// `Ok(None)` means nothing arrived in time. Any error, including
    /// `UnexpectedEof` when the device went away, ends the stream.
    fn next_event(&mut self, timeout: Duration) -> io::Result<Option<InputEvent>>;
}

/// A stream of create/delete notifications for the device directory.
pub trait NotifySource: Send {
    /// Wait up to `timeout` for the next record. `Ok(None)` means nothing
    /// arrived in time; an error is fatal to the hot-plug watcher.
    fn next_record(&mut self, timeout: Duration) -> Result<Option<NotifyRecord>>;
}

/// Where devices come from: listing, opening and watching.
pub trait DeviceSource: Send + Sync {
    /// Names of the entries currently in the device directory.
    fn list(&self) -> io::Result<Vec<String>>;

    /// Open one device's event stream.
    fn open(&self, name: &str) -> io::Result<Box<dyn EventStream>>;

    /// Subscribe to create/delete notifications on the device directory.
    fn watch(&self) -> io::Result<Box<dyn NotifySource>>;
}
