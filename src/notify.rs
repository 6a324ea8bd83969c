//! Directory-change notification records.
//!
//! The hot-plug channel yields `struct inotify_event` records: a 16-byte
//! header (`wd`, `mask`, `cookie`, `len`) followed by `len` bytes of
//! NUL-padded entry name. [`NotifyDecoder`] reads them from any byte stream,
//! validating the declared length before it copies the payload.

use crate::error::{Error, Result};
use std::io::{self, Read};

/// Size of the fixed part of a record.
pub const HEADER_LEN: usize = 16;

/// Payload size the decoder buffer starts with (`NAME_MAX + 1`).
pub const INLINE_NAME_LEN: usize = 256;

/// Largest payload the decoder accepts.
pub const MAX_NAME_LEN: usize = 64 * 1024;

pub use libc::{IN_CREATE, IN_DELETE};

/// One decoded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRecord {
    pub wd: i32,
    pub mask: u32,
    pub cookie: u32,
    /// Entry name, `None` when the payload is empty.
    pub name: Option<String>,
}

impl NotifyRecord {
    pub fn is_create(&self) -> bool {
        self.mask & IN_CREATE != 0
    }

    pub fn is_delete(&self) -> bool {
        self.mask & IN_DELETE != 0
    }

    /// The entry name if it is an `eventN` device file.
    pub fn device_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| is_event_file(name))
    }

    /// Serialize into the wire layout with a NUL-padded name.
    #[cfg(test)]
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut payload = self.name.clone().unwrap_or_default().into_bytes();
        if !payload.is_empty() {
            // NUL-terminate and pad to a multiple of the header alignment.
            let padded = (payload.len() + 1).next_multiple_of(4);
            payload.resize(padded, 0);
        }
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(&self.wd.to_ne_bytes());
        out.extend_from_slice(&self.mask.to_ne_bytes());
        out.extend_from_slice(&self.cookie.to_ne_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
        out.extend_from_slice(&payload);
        out
    }
}

/// Whether `name` is `"event"` followed by one or more decimal digits.
pub fn is_event_file(name: &str) -> bool {
    match name.strip_prefix("event") {
        Some(index) => !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

struct Header {
    wd: i32,
    mask: u32,
    cookie: u32,
    len: usize,
}

impl Header {
    fn parse(raw: &[u8; HEADER_LEN]) -> Self {
        let word = |i: usize| [raw[i], raw[i + 1], raw[i + 2], raw[i + 3]];
        Self {
            wd: i32::from_ne_bytes(word(0)),
            mask: u32::from_ne_bytes(word(4)),
            cookie: u32::from_ne_bytes(word(8)),
            len: u32::from_ne_bytes(word(12)) as usize,
        }
    }
}

/// Reads records one at a time, reusing one growable payload buffer.
#[derive(Debug)]
pub struct NotifyDecoder {
    payload: Vec<u8>,
}

impl Default for NotifyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyDecoder {
    pub fn new() -> Self {
        Self {
            payload: Vec::with_capacity(INLINE_NAME_LEN),
        }
    }

    /// Read exactly one record from `reader`.
    ///
    /// A stream that ends inside a header or a payload, or a length above
    /// [`MAX_NAME_LEN`], is a [`Error::Protocol`].
    pub fn read_record<R: Read>(&mut self, reader: &mut R) -> Result<NotifyRecord> {
        let mut raw = [0u8; HEADER_LEN];
        reader
            .read_exact(&mut raw)
            .map_err(|e| truncated("header", e))?;
        let header = Header::parse(&raw);

        if header.len > MAX_NAME_LEN {
            return Err(Error::Protocol(format!(
                "declared name length {} exceeds {} (wd={}, mask={:#x})",
                header.len, MAX_NAME_LEN, header.wd, header.mask
            )));
        }

        let name = if header.len == 0 {
            None
        } else {
            if header.len > self.payload.capacity() {
                log::debug!("growing notification buffer to {} bytes", header.len);
            }
            self.payload.clear();
            self.payload.resize(header.len, 0);
            reader
                .read_exact(&mut self.payload)
                .map_err(|e| truncated("payload", e))?;
            let end = self
                .payload
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(self.payload.len());
            (end > 0).then(|| String::from_utf8_lossy(&self.payload[..end]).into_owned())
        };

        Ok(NotifyRecord {
            wd: header.wd,
            mask: header.mask,
            cookie: header.cookie,
            name,
        })
    }
}

fn truncated(part: &str, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::Protocol(format!("truncated {part}"))
    } else {
        Error::io(format!("reading notification {part}"), e)
    }
}
