//! Driver configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default directory holding the `eventN` device files.
pub const DEFAULT_DEVICE_DIR: &str = "/dev/input";

/// Default number of watcher slots.
pub const DEFAULT_CAPACITY: usize = 256 * 2;

/// Tunables for a [`Driver`](crate::Driver).
///
/// ```
/// use std::time::Duration;
/// use tinymouse::DriverConfig;
///
/// let config = DriverConfig::default()
///     .with_capacity(16)
///     .with_poll_interval(Duration::from_millis(50));
/// assert_eq!(config.capacity, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Directory that is enumerated at init and watched for hot-plug.
    pub device_dir: PathBuf,
    /// Maximum number of simultaneously watched devices.
    pub capacity: usize,
    /// Delay between attempts to open a device that is not yet readable.
    ///
    /// Right after a device node appears, udev may not have applied its
    /// permissions yet, so `EACCES` is retried at this interval.
    pub retry_delay: Duration,
    /// Upper bound on each blocking read. Watchers check for cancellation
    /// at least this often.
    pub poll_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
            capacity: DEFAULT_CAPACITY,
            retry_delay: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl DriverConfig {
    pub fn with_device_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.device_dir = dir.into();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
