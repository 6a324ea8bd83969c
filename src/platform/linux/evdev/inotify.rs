//! inotify subscription on the device directory.

use crate::error::{Error, Result};
use crate::notify::{IN_CREATE, IN_DELETE, NotifyDecoder, NotifyRecord};
use crate::source::NotifySource;
use std::ffi::CString;
use std::fs::File;
use std::io::{self, BufReader};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::FromRawFd;
use std::path::Path;
use std::time::Duration;

use super::poll_readable;

/// Enough for many records; the kernel never splits one across reads.
const READ_BUFFER_LEN: usize = 4096;

/// Create/delete notifications for one directory.
#[derive(Debug)]
pub struct Inotify {
    reader: BufReader<File>,
    decoder: NotifyDecoder,
}

impl Inotify {
    /// Start watching `dir` for entries being created or deleted.
    pub fn watch(dir: &Path) -> io::Result<Self> {
        let path = CString::new(dir.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let fd = unsafe { libc::inotify_init1(libc::IN_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        // Owned from here on, so the descriptor is closed on every path.
        let file = unsafe { File::from_raw_fd(fd) };

        let wd = unsafe { libc::inotify_add_watch(fd, path.as_ptr(), IN_CREATE | IN_DELETE) };
        if wd < 0 {
            return Err(io::Error::last_os_error());
        }
        log::debug!("watching {} (wd={})", dir.display(), wd);

        Ok(Self {
            reader: BufReader::with_capacity(READ_BUFFER_LEN, file),
            decoder: NotifyDecoder::new(),
        })
    }
}

impl NotifySource for Inotify {
    fn next_record(&mut self, timeout: Duration) -> Result<Option<NotifyRecord>> {
        if self.reader.buffer().is_empty() {
            let ready = poll_readable(self.reader.get_ref(), timeout)
                .map_err(|e| Error::io("polling inotify", e))?;
            if !ready {
                return Ok(None);
            }
        }
        self.decoder.read_record(&mut self.reader).map(Some)
    }
}
