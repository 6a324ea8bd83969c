//! Bounded registry of device watchers.
//!
//! A fixed pool of slots, one per watched device, each holding the device
//! name, the watcher's thread handle and its cancellation token. The pool
//! never grows. Every allocation bumps a generation counter so a watcher
//! releasing its own slot cannot clobber a slot that has since been reused.
//! A closed registry refuses new reservations until it is reopened.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

/// Cancellation handle shared between a slot and its watcher thread.
#[derive(Debug, Clone, Default)]
pub struct WatchToken(Arc<AtomicBool>);

impl WatchToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Identity of one allocation of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId {
    index: usize,
    generation: u64,
}

#[derive(Debug, Default)]
struct WatcherSlot {
    name: Option<String>,
    token: Option<WatchToken>,
    thread: Option<JoinHandle<()>>,
    generation: u64,
}

impl WatcherSlot {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.token.is_none()
    }

    fn reset(&mut self) -> Option<JoinHandle<()>> {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.name = None;
        self.thread.take()
    }
}

/// Fixed-capacity pool of watcher slots. Callers hold it behind a mutex.
#[derive(Debug)]
pub struct WatcherRegistry {
    slots: Vec<WatcherSlot>,
    next_generation: u64,
    closed: bool,
}

impl WatcherRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| WatcherSlot::default()).collect(),
            next_generation: 1,
            closed: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all watched devices, in slot order.
    pub fn names(&self) -> Vec<String> {
        self.slots.iter().filter_map(|s| s.name.clone()).collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<SlotId> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, s)| s.name.as_deref() == Some(name))
            .map(|(index, s)| SlotId {
                index,
                generation: s.generation,
            })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reserve the first empty slot for `name`.
    ///
    /// Fails with [`Error::Cancelled`] while the registry is closed.
    pub fn allocate(&mut self, name: &str) -> Result<(SlotId, WatchToken)> {
        if self.closed {
            return Err(Error::Cancelled);
        }
        if self.find_by_name(name).is_some() {
            return Err(Error::AlreadyWatched(name.to_owned()));
        }
        let capacity = self.capacity();
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.is_empty())
            .ok_or(Error::RegistryFull(capacity))?;

        let token = WatchToken::new();
        slot.name = Some(name.to_owned());
        slot.token = Some(token.clone());
        slot.generation = self.next_generation;
        self.next_generation += 1;

        Ok((
            SlotId {
                index,
                generation: slot.generation,
            },
            token,
        ))
    }

    /// Store the watcher thread for a reserved slot. If the slot was released
    /// in the meantime the handle is given back.
    pub fn attach_thread(
        &mut self,
        id: SlotId,
        handle: JoinHandle<()>,
    ) -> std::result::Result<(), JoinHandle<()>> {
        match self.live_slot(id) {
            Some(slot) => {
                slot.thread = Some(handle);
                Ok(())
            }
            None => Err(handle),
        }
    }

    /// Cancel and clear a slot. Returns false if it was already released.
    pub fn release(&mut self, id: SlotId) -> bool {
        match self.live_slot(id) {
            Some(slot) => {
                // Dropping the handle detaches the thread; it exits on its own.
                drop(slot.reset());
                true
            }
            None => false,
        }
    }

    /// Release the slot watching `name`. Returns false if none does.
    pub fn release_by_name(&mut self, name: &str) -> bool {
        match self.find_by_name(name) {
            Some(id) => self.release(id),
            None => false,
        }
    }

    /// Cancel every watcher and empty every slot. The thread handles are
    /// returned so they can be joined once the registry lock is dropped.
    pub fn dispose_all(&mut self) -> Vec<JoinHandle<()>> {
        self.slots
            .iter_mut()
            .filter(|s| !s.is_empty())
            .filter_map(WatcherSlot::reset)
            .collect()
    }

    /// Refuse further reservations and dispose every slot.
    pub fn close(&mut self) -> Vec<JoinHandle<()>> {
        self.closed = true;
        self.dispose_all()
    }

    /// Accept reservations again after [`close`](Self::close).
    pub fn reopen(&mut self) {
        self.closed = false;
    }

    fn live_slot(&mut self, id: SlotId) -> Option<&mut WatcherSlot> {
        self.slots
            .get_mut(id.index)
            .filter(|s| !s.is_empty() && s.generation == id.generation)
    }
}
