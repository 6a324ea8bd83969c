//! # tinymouse
//!
//! A tiny composite mouse driver for Linux that needs no display server.
//!
//! Every pointer device under `/dev/input` is read directly, and all of them
//! drive one virtual cursor confined to a rectangle. Devices can be plugged
//! and unplugged at any time; the driver notices through inotify.
//!
//! ## Features
//!
//! - Works on a bare console, X11 or Wayland (reads evdev device files)
//! - Hot-plug: one watcher thread per device, started and stopped on the fly
//! - Half-open clamping: `x ∈ [min_x, max_x)`, `y ∈ [min_y, max_y)`
//! - Polling API: position and a Left/Middle/Right button mask
//!
//! ## Quick Start
//!
//! ```no_run
//! use tinymouse::{Driver, DriverConfig, MASK_LEFT, MASK_MIDDLE};
//!
//! let driver = Driver::new(DriverConfig::default());
//! driver.init(0, 0, 640, 480)?;
//!
//! let chord = MASK_LEFT | MASK_MIDDLE;
//! while driver.buttons() & chord != chord {
//!     let (x, y) = driver.xy();
//!     println!("pointer at ({x}, {y})");
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//!
//! driver.dispose()?;
//! # Ok::<(), tinymouse::Error>(())
//! ```
//!
//! ## Architecture
//!
//! The [`Driver`] owns one shared context. A hot-plug thread follows
//! directory changes, a bulk enumeration at `init` picks up devices that
//! are already attached, and each device gets a watcher thread tracked in a
//! bounded [`registry`]. Cursor, buttons and registry are guarded by three
//! independent mutexes that are never held together.
//!
//! Reading `/dev/input` usually requires membership in the `input` group.

pub mod config;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod event;
pub mod notify;
pub mod registry;
pub mod source;
pub mod state;

mod hotplug;
mod platform;
#[cfg(test)]
mod testing;
mod watcher;

// Re-exports
pub use config::DriverConfig;
pub use cursor::{Area, Axis, AxisRange, Cursor};
pub use driver::{Driver, Phase};
pub use error::{Error, Result};
pub use event::{Button, PointerEvent};
pub use notify::{NotifyDecoder, NotifyRecord, is_event_file};
pub use source::{DeviceSource, EventStream, NotifySource};
pub use state::{ButtonState, MASK_ALL_BUTTONS, MASK_LEFT, MASK_MIDDLE, MASK_RIGHT};

// Linux backend
pub use platform::{DevInput, DeviceFile, Inotify};
