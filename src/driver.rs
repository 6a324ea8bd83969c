//! The driver facade and its lifecycle.

use crate::config::DriverConfig;
use crate::cursor::{Area, Cursor};
use crate::error::{Error, Result};
use crate::hotplug::{self, HotplugWatcher};
use crate::platform::DevInput;
use crate::registry::WatcherRegistry;
use crate::source::DeviceSource;
use crate::state::{ButtonState, MASK_LEFT, MASK_MIDDLE, MASK_RIGHT};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

/// Lifecycle state of a [`Driver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Never initialized, or the last `init` failed.
    Uninitialized = 0,
    /// Inside `init`: the hot-plug watcher is live and enumeration runs.
    Initializing = 1,
    /// Devices are being watched.
    Running = 2,
    /// `dispose` has run. `init` may be called again.
    Disposed = 3,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Phase::Initializing,
            2 => Phase::Running,
            3 => Phase::Disposed,
            _ => Phase::Uninitialized,
        }
    }
}

/// State shared by the facade, the hot-plug watcher and every device
/// watcher. Cursor, buttons and registry each have their own mutex and no
/// code path holds two of them at once.
pub(crate) struct Shared {
    pub(crate) config: DriverConfig,
    pub(crate) source: Box<dyn DeviceSource>,
    pub(crate) cursor: Cursor,
    pub(crate) buttons: ButtonState,
    registry: Mutex<WatcherRegistry>,
    phase: AtomicU8,
}

impl Shared {
    pub(crate) fn new(config: DriverConfig, source: Box<dyn DeviceSource>) -> Self {
        let registry = WatcherRegistry::new(config.capacity);
        Self {
            config,
            source,
            cursor: Cursor::new(),
            buttons: ButtonState::new(),
            registry: Mutex::new(registry),
            phase: AtomicU8::new(Phase::Uninitialized as u8),
        }
    }

    pub(crate) fn registry(&self) -> Result<MutexGuard<'_, WatcherRegistry>> {
        self.registry.lock().map_err(|_| Error::Lock("registry"))
    }

    /// The registry even if a watcher panicked while holding it. Slot
    /// bookkeeping stays consistent across a panic, so cleanup paths use this.
    pub(crate) fn registry_recovered(&self) -> MutexGuard<'_, WatcherRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }
}

/// A composite pointer merging every attached mouse into one cursor.
///
/// # Example
///
/// ```no_run
/// use tinymouse::{Driver, DriverConfig};
///
/// let driver = Driver::new(DriverConfig::default());
/// driver.init(0, 0, 640, 480)?;
/// loop {
///     let (x, y) = driver.xy();
///     if driver.is_left_pressed() && driver.is_middle_pressed() {
///         break;
///     }
///     println!("({x}, {y}) buttons={:03b}", driver.buttons());
/// }
/// driver.dispose()?;
/// # Ok::<(), tinymouse::Error>(())
/// ```
pub struct Driver {
    shared: Arc<Shared>,
    /// Serializes `init` and `dispose`. Watcher threads never take it.
    lifecycle: Mutex<Option<HotplugWatcher>>,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

impl Driver {
    /// Create a driver reading the devices under `config.device_dir`.
    pub fn new(config: DriverConfig) -> Self {
        let source = DevInput::new(config.device_dir.clone());
        Self::with_source(config, source)
    }

    /// Create a driver over any device source.
    pub fn with_source(config: DriverConfig, source: impl DeviceSource + 'static) -> Self {
        Self {
            shared: Arc::new(Shared::new(config, Box::new(source))),
            lifecycle: Mutex::new(None),
        }
    }

    /// Confine the cursor to `[min_x, max_x) × [min_y, max_y)`, move it to
    /// `(0, 0)` clamped, clear the buttons and start watching devices.
    ///
    /// On failure every thread that was started is stopped again and the
    /// driver returns to [`Phase::Uninitialized`].
    pub fn init(&self, min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Result<()> {
        let mut hotplug = self.lifecycle()?;
        match self.shared.phase() {
            Phase::Uninitialized | Phase::Disposed => {}
            Phase::Initializing | Phase::Running => return Err(Error::AlreadyRunning),
        }
        self.shared.set_phase(Phase::Initializing);

        match self.start(&mut hotplug, min_x, min_y, max_x, max_y) {
            Ok(()) => {
                self.shared.set_phase(Phase::Running);
                Ok(())
            }
            Err(e) => {
                log::error!("init failed: {e}");
                self.teardown(hotplug.take());
                self.shared.set_phase(Phase::Uninitialized);
                Err(e)
            }
        }
    }

    fn start(
        &self,
        hotplug: &mut Option<HotplugWatcher>,
        min_x: i32,
        min_y: i32,
        max_x: i32,
        max_y: i32,
    ) -> Result<()> {
        let area = Area::new(min_x, min_y, max_x, max_y)?;
        self.shared.cursor.configure_area(area)?;
        self.shared.cursor.set_position(0, 0)?;
        self.shared.buttons.reset()?;
        let stale = {
            let mut registry = self.shared.registry()?;
            registry.reopen();
            registry.dispose_all()
        };
        join_watchers(stale);

        // Subscribe before listing so no device falls between the two.
        *hotplug = Some(HotplugWatcher::start(&self.shared)?);
        let started = hotplug::enumerate(&self.shared)?;
        log::info!("tinymouse running: {started} device(s), area {area:?}");
        Ok(())
    }

    /// Stop watching: cancel every device watcher, stop the hot-plug
    /// watcher and wait for all of them to exit.
    ///
    /// Position and button state keep their last values.
    pub fn dispose(&self) -> Result<()> {
        let mut hotplug = self.lifecycle()?;
        if self.shared.phase() != Phase::Running {
            return Err(Error::NotRunning);
        }
        self.teardown(hotplug.take());
        self.shared.set_phase(Phase::Disposed);
        log::info!("tinymouse disposed");
        Ok(())
    }

    fn teardown(&self, hotplug: Option<HotplugWatcher>) {
        if let Some(hotplug) = &hotplug {
            hotplug.signal_stop();
        }
        // Close before joining: the hot-plug thread may be retrying a
        // reservation, and a closed registry refuses any new one.
        let mut handles = self.shared.registry_recovered().close();
        if let Some(hotplug) = hotplug {
            if let Err(e) = hotplug.join() {
                log::warn!("{e}");
            }
        }
        // Threads the hot-plug watcher spawned before the close.
        handles.extend(self.shared.registry_recovered().dispose_all());
        join_watchers(handles);
    }

    fn lifecycle(&self) -> Result<MutexGuard<'_, Option<HotplugWatcher>>> {
        self.lifecycle.lock().map_err(|_| Error::Lock("lifecycle"))
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.shared.phase()
    }

    pub fn x(&self) -> i32 {
        self.shared.cursor.position().0
    }

    pub fn y(&self) -> i32 {
        self.shared.cursor.position().1
    }

    /// Current position, read in one critical section.
    pub fn xy(&self) -> (i32, i32) {
        self.shared.cursor.position()
    }

    /// Button bitmask: left = 1, middle = 2, right = 4.
    pub fn buttons(&self) -> u8 {
        self.shared.buttons.mask()
    }

    pub fn is_left_pressed(&self) -> bool {
        self.shared.buttons.is_pressed(MASK_LEFT)
    }

    pub fn is_middle_pressed(&self) -> bool {
        self.shared.buttons.is_pressed(MASK_MIDDLE)
    }

    pub fn is_right_pressed(&self) -> bool {
        self.shared.buttons.is_pressed(MASK_RIGHT)
    }

    /// Move the cursor, clamped into the current area.
    pub fn set_position(&self, x: i32, y: i32) -> Result<()> {
        self.shared.cursor.set_position(x, y)
    }

    /// Change the area. The position is clamped on its next update.
    pub fn set_area(&self, min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Result<()> {
        let area = Area::new(min_x, min_y, max_x, max_y)?;
        self.shared.cursor.configure_area(area)
    }

    pub fn area(&self) -> Area {
        self.shared.cursor.area()
    }

    /// Names of the devices currently being watched.
    pub fn watched_devices(&self) -> Vec<String> {
        self.shared.registry_recovered().names()
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if self.phase() == Phase::Running {
            let _ = self.dispose();
        }
    }
}

fn join_watchers(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if handle.join().is_err() {
            log::warn!("device watcher panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{IN_DELETE, NotifyRecord};
    use crate::testing::{SimSource, test_config, wait_until};
    use evdev::Key;
    use std::thread;
    use std::time::{Duration, Instant};

    fn driver(sim: &SimSource) -> Driver {
        Driver::with_source(test_config(), sim.clone())
    }

    #[test]
    fn test_invalid_area_fails_init() {
        let sim = SimSource::new();
        let driver = driver(&sim);
        assert!(matches!(
            driver.init(10, 0, 0, 10),
            Err(Error::InvalidArea { .. })
        ));
        assert_eq!(driver.phase(), Phase::Uninitialized);
    }

    #[test]
    fn test_scenario_a_motion_and_chord() {
        let sim = SimSource::new();
        let device = sim.plug("event0");
        let driver = driver(&sim);

        driver.init(0, 0, 640, 480).unwrap();
        assert_eq!(driver.phase(), Phase::Running);
        assert_eq!(driver.xy(), (0, 0));
        assert_eq!(driver.watched_devices(), ["event0"]);

        device.move_by(10, -5);
        assert!(wait_until(|| driver.xy() == (10, 0)));

        device.press_left();
        assert!(wait_until(|| driver.buttons() == 1));
        device.key(Key::BTN_MIDDLE, 1);
        assert!(wait_until(|| driver.buttons() == 3));
        assert!(driver.is_left_pressed() && driver.is_middle_pressed());
        assert!(!driver.is_right_pressed());

        driver.dispose().unwrap();
    }

    #[test]
    fn test_scenario_b_concurrent_devices() {
        let sim = SimSource::new();
        let left = sim.plug("event0");
        let right = sim.plug("event1");
        let driver = driver(&sim);
        driver.init(0, 0, 640, 480).unwrap();

        // Each device ends with a one-pixel Y step so the test knows when
        // both devices' X motion has been applied.
        let run = |dx: i32| {
            driver.set_position(300, 0).unwrap();
            thread::scope(|s| {
                s.spawn(|| {
                    left.move_x(dx);
                    left.move_y(1);
                });
                s.spawn(|| {
                    right.move_x(-dx);
                    right.move_y(1);
                });
            });
            assert!(wait_until(|| driver.y() == 2));
            driver.x()
        };

        // Inside the area the deltas commute exactly.
        assert_eq!(run(200), 300);
        // Past the edges each delta is clamped on its own, so the order wins.
        let x = run(700);
        assert!(x == 0 || x == 639, "x = {x}");
    }

    #[test]
    fn test_scenario_c_self_release_then_delete() {
        let sim = SimSource::new();
        let device = sim.plug("event0");
        let driver = driver(&sim);
        driver.init(0, 0, 640, 480).unwrap();
        assert_eq!(driver.watched_devices(), ["event0"]);

        drop(device);
        assert!(wait_until(|| driver.watched_devices().is_empty()));

        sim.notify(NotifyRecord {
            wd: 1,
            mask: IN_DELETE,
            cookie: 0,
            name: Some("event0".into()),
        });
        // The hot-plug watcher is still alive and picks up new devices.
        let _late = sim.hotplug("event1");
        assert!(wait_until(|| driver.watched_devices() == ["event1"]));
    }

    #[test]
    fn test_scenario_d_reads_are_never_torn() {
        let sim = SimSource::new();
        let devices = [sim.plug("event0"), sim.plug("event1")];
        let driver = driver(&sim);
        driver.init(0, 0, 640, 480).unwrap();

        thread::scope(|s| {
            for (i, device) in devices.iter().enumerate() {
                s.spawn(move || {
                    for step in 0..500 {
                        let sign = if (step + i) % 2 == 0 { 1 } else { -1 };
                        device.move_by(sign * 37, sign * -53);
                        device.key(Key::BTN_RIGHT, (step % 2) as i32);
                    }
                });
            }
            for _ in 0..2000 {
                let (x, y) = driver.xy();
                assert!((0..640).contains(&x) && (0..480).contains(&y));
                assert_eq!(driver.buttons() & !0b111, 0);
            }
        });
    }

    #[test]
    fn test_hotplug_attach_and_detach() {
        let sim = SimSource::new();
        let driver = driver(&sim);
        driver.init(-100, -100, 100, 100).unwrap();
        assert!(driver.watched_devices().is_empty());

        let device = sim.hotplug("event3");
        assert!(wait_until(|| driver.watched_devices() == ["event3"]));
        device.move_by(-150, 20);
        assert!(wait_until(|| driver.xy() == (-100, 20)));

        sim.unplug("event3");
        assert!(wait_until(|| driver.watched_devices().is_empty()));
    }

    #[test]
    fn test_init_twice() {
        let sim = SimSource::new();
        let driver = driver(&sim);
        driver.init(0, 0, 10, 10).unwrap();
        assert!(matches!(
            driver.init(0, 0, 10, 10),
            Err(Error::AlreadyRunning)
        ));
        assert_eq!(driver.phase(), Phase::Running);
    }

    #[test]
    fn test_dispose_and_restart() {
        let sim = SimSource::new();
        let _first = sim.plug("event0");
        let driver = driver(&sim);

        driver.init(0, 0, 640, 480).unwrap();
        driver.set_position(50, 60).unwrap();
        driver.dispose().unwrap();
        assert_eq!(driver.phase(), Phase::Disposed);
        assert!(driver.watched_devices().is_empty());
        assert!(matches!(driver.dispose(), Err(Error::NotRunning)));

        // With the hot-plug watcher stopped nothing is picked up.
        let _ignored = sim.hotplug("event5");
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sim.opens("event5"), 0);

        let _second = sim.plug("event0");
        driver.init(0, 0, 320, 240).unwrap();
        assert_eq!(driver.xy(), (0, 0));
        let mut watched = driver.watched_devices();
        watched.sort();
        assert_eq!(watched, ["event0", "event5"]);
    }

    #[test]
    fn test_failed_enumeration_rolls_back() {
        let sim = SimSource::new();
        let _ok = sim.plug("event0");
        sim.list_only("event1");
        let driver = driver(&sim);

        assert!(matches!(
            driver.init(0, 0, 640, 480),
            Err(Error::Io { .. })
        ));
        assert_eq!(driver.phase(), Phase::Uninitialized);
        assert!(driver.watched_devices().is_empty());
    }

    #[test]
    fn test_full_registry_during_init_keeps_running() {
        let sim = SimSource::new();
        let _devices = [sim.plug("event0"), sim.plug("event1")];
        let driver = Driver::with_source(test_config().with_capacity(1), sim.clone());

        driver.init(0, 0, 640, 480).unwrap();
        assert_eq!(driver.phase(), Phase::Running);
        assert_eq!(driver.watched_devices(), ["event0"]);
        assert_eq!(sim.opens("event1"), 0);
        driver.dispose().unwrap();
    }

    #[test]
    fn test_dispose_while_hotplug_retries_permission() {
        let sim = SimSource::new();
        let driver = driver(&sim);
        driver.init(0, 0, 640, 480).unwrap();

        sim.deny("event1", usize::MAX);
        let _locked = sim.hotplug("event1");
        assert!(wait_until(|| sim.opens("event1") > 1));

        let started = Instant::now();
        driver.dispose().unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(driver.phase(), Phase::Disposed);
        assert!(driver.watched_devices().is_empty());

        // The next init accepts devices again.
        sim.deny("event1", 0);
        driver.init(0, 0, 640, 480).unwrap();
        assert_eq!(driver.watched_devices(), ["event1"]);
    }

    #[test]
    fn test_permission_denied_during_init() {
        let sim = SimSource::new();
        let device = sim.plug("event0");
        sim.deny("event0", 2);
        let driver = driver(&sim);

        driver.init(0, 0, 640, 480).unwrap();
        assert_eq!(sim.opens("event0"), 3);
        device.move_by(5, 5);
        assert!(wait_until(|| driver.xy() == (5, 5)));
    }

    #[test]
    fn test_dead_hotplug_watcher_keeps_existing_devices() {
        let sim = SimSource::new();
        let device = sim.plug("event0");
        let driver = driver(&sim);
        driver.init(0, 0, 640, 480).unwrap();

        sim.close_notify();
        let _late = sim.plug("event1");
        device.move_by(7, 8);
        assert!(wait_until(|| driver.xy() == (7, 8)));
        assert_eq!(driver.watched_devices(), ["event0"]);
        driver.dispose().unwrap();
    }

    #[test]
    fn test_invalid_set_area_changes_nothing() {
        let sim = SimSource::new();
        let driver = driver(&sim);
        driver.init(0, 0, 640, 480).unwrap();
        driver.set_position(100, 100).unwrap();

        assert!(matches!(
            driver.set_area(0, 500, 640, 480),
            Err(Error::InvalidArea { .. })
        ));
        assert_eq!(driver.area(), Area::new(0, 0, 640, 480).unwrap());
        assert_eq!(driver.xy(), (100, 100));

        driver.set_area(0, 0, 50, 50).unwrap();
        driver.set_position(100, 100).unwrap();
        assert_eq!(driver.xy(), (49, 49));
    }
}
