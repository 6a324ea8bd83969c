//! Device watchers: one thread per attached device.
//!
//! A watcher owns its device's event stream, feeds motion into the shared
//! cursor and button records into the shared button state, and on end of
//! stream releases its own registry slot. The release is idempotent with
//! the hot-plug detach path, whichever runs first.

use crate::driver::Shared;
use crate::error::{Error, Result};
use crate::event::PointerEvent;
use crate::registry::{SlotId, WatchToken};
use crate::source::EventStream;
use evdev::InputEvent;
use std::io;
use std::sync::Arc;
use std::thread;

/// Reserve a slot for `name`, open the device and start its watcher.
///
/// Fails with [`Error::AlreadyWatched`] if the name is registered and
/// [`Error::RegistryFull`] if no slot is free, and with [`Error::Cancelled`]
/// once the registry is closed. A device that is not yet readable is retried
/// until it opens or the reservation is cancelled.
pub(crate) fn spawn(shared: &Arc<Shared>, name: &str) -> Result<()> {
    let (id, token) = shared.registry()?.allocate(name)?;

    let stream = match open_with_retry(shared, name, &token) {
        Ok(stream) => stream,
        Err(e) => {
            release(shared, id);
            return Err(e);
        }
    };

    let watcher = Watcher {
        shared: Arc::clone(shared),
        id,
        name: name.to_owned(),
        token,
    };
    let handle = thread::Builder::new()
        .name(format!("tinymouse-{name}"))
        .spawn(move || watcher.run(stream));
    let handle = match handle {
        Ok(handle) => handle,
        Err(e) => {
            release(shared, id);
            return Err(Error::ThreadError(format!(
                "failed to spawn watcher for {name}: {e}"
            )));
        }
    };

    // If the slot was released meanwhile, the watcher has seen its token and
    // is already on its way out, so the handle can be dropped.
    let _ = shared.registry_recovered().attach_thread(id, handle);
    log::info!("watching {name}");
    Ok(())
}

fn open_with_retry(
    shared: &Shared,
    name: &str,
    token: &WatchToken,
) -> Result<Box<dyn EventStream>> {
    let delay = shared.config.retry_delay;
    let mut denied = 0u32;
    loop {
        match shared.source.open(name) {
            Ok(stream) => {
                if denied > 0 {
                    log::debug!("{name}: opened after {denied} denied attempt(s)");
                }
                return Ok(stream);
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                if denied == 0 {
                    log::warn!(
                        "{name}: permission denied, retrying every {delay:?}. \
                         Make sure you're in the 'input' group."
                    );
                }
                denied += 1;
                thread::sleep(delay);
                if token.is_cancelled() {
                    return Err(Error::Cancelled);
                }
            }
            Err(e) => return Err(Error::io(format!("opening {name}"), e)),
        }
    }
}

fn release(shared: &Shared, id: SlotId) -> bool {
    match shared.registry() {
        Ok(mut registry) => registry.release(id),
        Err(e) => {
            log::error!("cannot release watcher slot: {e}");
            false
        }
    }
}

struct Watcher {
    shared: Arc<Shared>,
    id: SlotId,
    name: String,
    token: WatchToken,
}

impl Watcher {
    fn run(self, mut stream: Box<dyn EventStream>) {
        let interval = self.shared.config.poll_interval;
        let reason = loop {
            if self.token.is_cancelled() {
                break "cancelled".to_owned();
            }
            match stream.next_event(interval) {
                Ok(Some(ev)) => {
                    if let Err(e) = self.apply(&ev) {
                        break e.to_string();
                    }
                }
                Ok(None) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    break "end of stream".to_owned();
                }
                Err(e) => break e.to_string(),
            }
        };

        drop(stream);
        if release(&self.shared, self.id) {
            log::info!("{}: detached ({reason})", self.name);
        } else {
            log::debug!("{}: watcher stopped ({reason})", self.name);
        }
    }

    fn apply(&self, ev: &InputEvent) -> Result<()> {
        match PointerEvent::from_input(ev) {
            Some(PointerEvent::Motion { axis, delta }) => {
                self.shared.cursor.apply_delta(axis, delta)
            }
            Some(PointerEvent::Button { button, pressed }) => {
                self.shared.buttons.set_button(button, pressed)
            }
            None => Ok(()),
        }
    }
}
