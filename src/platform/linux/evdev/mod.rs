//! Linux evdev implementation.
//!
//! Reads input records directly from `/dev/input/event*` devices and
//! watches the directory with inotify. This works on X11, Wayland and a
//! bare console alike.
//!
//! ## Permissions
//!
//! To access input devices, the process must either:
//! - Run as root (not recommended)
//! - Run as a user in the `input` group (recommended)
//!
//! To add yourself to the input group:
//! ```bash
//! sudo usermod -aG input $USER
//! # Then log out and back in
//! ```

mod device;
mod inotify;

pub use device::DeviceFile;
pub use inotify::Inotify;

use crate::source::{DeviceSource, EventStream, NotifySource};
use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::time::Duration;

/// Devices under a real directory, `/dev/input` by default.
#[derive(Debug, Clone)]
pub struct DevInput {
    dir: PathBuf,
}

impl DevInput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DeviceSource for DevInput {
    fn list(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn open(&self, name: &str) -> io::Result<Box<dyn EventStream>> {
        Ok(Box::new(DeviceFile::open(&self.dir.join(name))?))
    }

    fn watch(&self) -> io::Result<Box<dyn NotifySource>> {
        Ok(Box::new(Inotify::watch(&self.dir)?))
    }
}

/// Wait until `fd` is readable or `timeout` passes.
///
/// Hang-up and error conditions count as readable so the following read
/// reports them.
fn poll_readable(fd: &impl AsRawFd, timeout: Duration) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd: fd.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

    let ret = unsafe { libc::poll(&mut pfd, 1, millis) };
    if ret < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(ret > 0 && pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
}
