//! Linux platform implementation.
//!
//! Only the evdev backend exists: pointer devices are read from
//! `/dev/input/event*` and hot-plug is detected with inotify.

mod evdev;

pub use self::evdev::*;
