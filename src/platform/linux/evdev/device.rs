//! evdev device files.

use crate::source::EventStream;
use evdev::{Device, InputEvent};
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::time::Duration;

use super::poll_readable;

/// An open `/dev/input/eventN` device.
pub struct DeviceFile {
    device: Device,
    pending: VecDeque<InputEvent>,
}

impl DeviceFile {
    /// Open the device at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            device: Device::open(path)?,
            pending: VecDeque::new(),
        })
    }
}

#[cfg(test)]
impl std::fmt::Debug for DeviceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceFile")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl EventStream for DeviceFile {
    fn next_event(&mut self, timeout: Duration) -> io::Result<Option<InputEvent>> {
        if let Some(ev) = self.pending.pop_front() {
            return Ok(Some(ev));
        }
        if !poll_readable(&self.device, timeout)? {
            return Ok(None);
        }
        let events = self.device.fetch_events().map_err(end_of_stream)?;
        self.pending.extend(events);
        Ok(self.pending.pop_front())
    }
}

/// An unplugged device fails reads with `ENODEV`; report it as end of stream.
fn end_of_stream(e: io::Error) -> io::Error {
    if e.raw_os_error() == Some(libc::ENODEV) {
        io::Error::new(io::ErrorKind::UnexpectedEof, e)
    } else {
        e
    }
}
