//! Simulated devices for driver tests.

use crate::config::DriverConfig;
use crate::error::{Error, Result};
use crate::notify::{IN_CREATE, IN_DELETE, NotifyRecord};
use crate::source::{DeviceSource, EventStream, NotifySource};
use evdev::{EventType, InputEvent, Key, RelativeAxisType};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Short intervals so tests observe cancellation quickly.
pub(crate) fn test_config() -> DriverConfig {
    DriverConfig::default()
        .with_capacity(8)
        .with_retry_delay(Duration::from_millis(5))
        .with_poll_interval(Duration::from_millis(10))
}

/// Poll `cond` for up to five seconds.
pub(crate) fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[derive(Default)]
struct SimInner {
    /// Listed entries; `None` once opened or when the entry cannot be opened.
    devices: BTreeMap<String, Option<Receiver<InputEvent>>>,
    denials: HashMap<String, usize>,
    opens: HashMap<String, usize>,
    watchers: Vec<Sender<NotifyRecord>>,
}

/// An in-memory device directory.
#[derive(Clone, Default)]
pub(crate) struct SimSource {
    inner: Arc<Mutex<SimInner>>,
}

impl SimSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a device without any notification, as if present before init.
    pub(crate) fn plug(&self, name: &str) -> SimDevice {
        let (tx, rx) = mpsc::channel();
        self.inner
            .lock()
            .unwrap()
            .devices
            .insert(name.to_owned(), Some(rx));
        SimDevice { tx }
    }

    /// Add a device and announce it on the notification channel.
    pub(crate) fn hotplug(&self, name: &str) -> SimDevice {
        let device = self.plug(name);
        self.notify(notification(IN_CREATE, name));
        device
    }

    /// Remove a device entry and announce the deletion.
    pub(crate) fn unplug(&self, name: &str) {
        self.inner.lock().unwrap().devices.remove(name);
        self.notify(notification(IN_DELETE, name));
    }

    /// List an entry that fails to open with `NotFound`.
    pub(crate) fn list_only(&self, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .devices
            .insert(name.to_owned(), None);
    }

    /// Make the next `times` opens of `name` fail with `PermissionDenied`.
    pub(crate) fn deny(&self, name: &str, times: usize) {
        self.inner
            .lock()
            .unwrap()
            .denials
            .insert(name.to_owned(), times);
    }

    /// Number of open attempts for `name`, denied ones included.
    pub(crate) fn opens(&self, name: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .opens
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn notify(&self, record: NotifyRecord) {
        let inner = self.inner.lock().unwrap();
        for tx in &inner.watchers {
            let _ = tx.send(record.clone());
        }
    }

    /// Drop every notification channel, which the watcher sees as an error.
    pub(crate) fn close_notify(&self) {
        self.inner.lock().unwrap().watchers.clear();
    }
}

fn notification(mask: u32, name: &str) -> NotifyRecord {
    NotifyRecord {
        wd: 1,
        mask,
        cookie: 0,
        name: Some(name.to_owned()),
    }
}

impl DeviceSource for SimSource {
    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.inner.lock().unwrap().devices.keys().cloned().collect())
    }

    fn open(&self, name: &str) -> io::Result<Box<dyn EventStream>> {
        let mut inner = self.inner.lock().unwrap();
        *inner.opens.entry(name.to_owned()).or_default() += 1;
        if let Some(left) = inner.denials.get_mut(name) {
            if *left > 0 {
                *left -= 1;
                return Err(io::ErrorKind::PermissionDenied.into());
            }
        }
        match inner.devices.get_mut(name).and_then(Option::take) {
            Some(rx) => Ok(Box::new(SimStream(rx))),
            None => Err(io::ErrorKind::NotFound.into()),
        }
    }

    fn watch(&self) -> io::Result<Box<dyn NotifySource>> {
        let (tx, rx) = mpsc::channel();
        self.inner.lock().unwrap().watchers.push(tx);
        Ok(Box::new(SimNotify(rx)))
    }
}

/// Writer end of a simulated device. Dropping it ends the stream.
pub(crate) struct SimDevice {
    tx: Sender<InputEvent>,
}

impl SimDevice {
    pub(crate) fn send(&self, ev: InputEvent) {
        let _ = self.tx.send(ev);
    }

    pub(crate) fn move_x(&self, dx: i32) {
        self.send(InputEvent::new(
            EventType::RELATIVE,
            RelativeAxisType::REL_X.0,
            dx,
        ));
    }

    pub(crate) fn move_y(&self, dy: i32) {
        self.send(InputEvent::new(
            EventType::RELATIVE,
            RelativeAxisType::REL_Y.0,
            dy,
        ));
    }

    pub(crate) fn move_by(&self, dx: i32, dy: i32) {
        self.move_x(dx);
        self.move_y(dy);
        self.send(InputEvent::new(EventType::SYNCHRONIZATION, 0, 0));
    }

    pub(crate) fn key(&self, key: Key, value: i32) {
        self.send(InputEvent::new(EventType::KEY, key.code(), value));
    }

    pub(crate) fn press_left(&self) {
        self.key(Key::BTN_LEFT, 1);
    }

    pub(crate) fn release_left(&self) {
        self.key(Key::BTN_LEFT, 0);
    }
}

struct SimStream(Receiver<InputEvent>);

impl EventStream for SimStream {
    fn next_event(&mut self, timeout: Duration) -> io::Result<Option<InputEvent>> {
        match self.0.recv_timeout(timeout) {
            Ok(ev) => Ok(Some(ev)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(io::ErrorKind::UnexpectedEof.into()),
        }
    }
}

struct SimNotify(Receiver<NotifyRecord>);

impl NotifySource for SimNotify {
    fn next_record(&mut self, timeout: Duration) -> Result<Option<NotifyRecord>> {
        match self.0.recv_timeout(timeout) {
            Ok(record) => Ok(Some(record)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Protocol("truncated header".into()))
            }
        }
    }
}
