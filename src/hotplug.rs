//! Hot-plug watcher and bulk enumeration.
//!
//! The hot-plug watcher is a single thread that follows create/delete
//! notifications on the device directory and keeps the registry in sync.
//! A malformed notification ends the thread for good: already running
//! watchers and the driver API keep working, but later attach/detach is no
//! longer noticed until the next `init`.

use crate::driver::{Phase, Shared};
use crate::error::{Error, Result};
use crate::notify::{NotifyRecord, is_event_file};
use crate::source::NotifySource;
use crate::watcher;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Handle to the running hot-plug thread.
pub(crate) struct HotplugWatcher {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl HotplugWatcher {
    /// Subscribe to the device directory and start following it.
    pub(crate) fn start(shared: &Arc<Shared>) -> Result<Self> {
        let source = shared.source.watch().map_err(|e| {
            Error::io(
                format!("watching {}", shared.config.device_dir.display()),
                e,
            )
        })?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread = thread::Builder::new()
            .name("tinymouse-hotplug".into())
            .spawn({
                let shared = Arc::clone(shared);
                let stop = Arc::clone(&stop);
                move || run(&shared, source, &stop)
            })
            .map_err(|e| Error::ThreadError(format!("failed to spawn hot-plug watcher: {e}")))?;

        Ok(Self { stop, thread })
    }

    /// Ask the thread to exit after its current poll.
    pub(crate) fn signal_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Whether the thread has exited, either stopped or after a fatal error.
    pub(crate) fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stop the thread and wait for it.
    pub(crate) fn join(self) -> Result<()> {
        self.signal_stop();
        self.thread
            .join()
            .map_err(|_| Error::ThreadError("failed to join hot-plug watcher".into()))
    }
}

fn run(shared: &Arc<Shared>, mut source: Box<dyn NotifySource>, stop: &AtomicBool) {
    let interval = shared.config.poll_interval;
    while !stop.load(Ordering::SeqCst) {
        match source.next_record(interval) {
            Ok(Some(record)) => handle_record(shared, &record),
            Ok(None) => {}
            Err(e) => {
                log::error!("hot-plug watcher stopped, attach/detach is no longer detected: {e}");
                return;
            }
        }
    }
    log::debug!("hot-plug watcher stopped");
}

/// Act on one notification. Entries that are not `eventN` are ignored.
pub(crate) fn handle_record(shared: &Arc<Shared>, record: &NotifyRecord) {
    let Some(name) = record.device_name() else {
        return;
    };
    if record.is_create() {
        attach(shared, name);
    }
    if record.is_delete() {
        detach(shared, name);
    }
}

fn attach(shared: &Arc<Shared>, name: &str) {
    let initializing = shared.phase() == Phase::Initializing;
    match watcher::spawn(shared, name) {
        Ok(()) => {}
        // Enumeration and the live stream can both report the same device.
        Err(Error::AlreadyWatched(_)) if initializing => {
            log::debug!("{name}: already enumerated");
        }
        Err(Error::AlreadyWatched(_)) => {
            log::warn!("{name}: duplicate create notification ignored");
        }
        Err(Error::Cancelled) => log::debug!("{name}: not attached, driver is stopping"),
        Err(e) => log::error!("{name}: cannot start watcher: {e}"),
    }
}

fn detach(shared: &Shared, name: &str) {
    match shared.registry() {
        Ok(mut registry) => {
            if registry.release_by_name(name) {
                log::info!("{name}: detached");
            } else {
                // The watcher saw end of stream first and released itself.
                log::debug!("{name}: already released");
            }
        }
        Err(e) => log::error!("{name}: cannot release watcher: {e}"),
    }
}

/// Start a watcher for every `eventN` entry already present.
///
/// Names that are already registered are skipped and a full registry is
/// logged and skipped; any other failure aborts the enumeration. Returns the
/// number of watchers started.
pub(crate) fn enumerate(shared: &Arc<Shared>) -> Result<usize> {
    let mut names: Vec<String> = shared
        .source
        .list()
        .map_err(|e| Error::io(format!("listing {}", shared.config.device_dir.display()), e))?
        .into_iter()
        .filter(|name| is_event_file(name))
        .collect();
    names.sort_by_key(|name| name["event".len()..].parse::<u64>().unwrap_or(u64::MAX));

    let mut started = 0;
    for name in &names {
        match watcher::spawn(shared, name) {
            Ok(()) => started += 1,
            Err(Error::AlreadyWatched(_)) => log::debug!("{name}: already watched"),
            Err(e @ Error::RegistryFull(_)) => log::error!("{name}: not watched: {e}"),
            Err(e) => return Err(e),
        }
    }
    Ok(started)
}
