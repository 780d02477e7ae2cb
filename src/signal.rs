// Signals - synchronous callback lists
//
// A Signal<T> calls every connected slot with a clone of the emitted value, on the
// emitting thread. Slots are snapshotted before the call so a slot may connect or
// disconnect without deadlocking.

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Slot<T> = Arc<dyn Fn(T) + Send + Sync>;

trait Disconnect: Send + Sync {
    fn disconnect(&self, id: u64) -> bool;
}

struct SlotList<T> {
    next_id: AtomicU64,
    slots: RwLock<IndexMap<u64, Slot<T>>>,
}

impl<T: 'static> Disconnect for SlotList<T> {
    fn disconnect(&self, id: u64) -> bool {
        self.slots.write().shift_remove(&id).is_some()
    }
}

/// Multi-subscriber notification with disconnectable [`Connection`]s
pub struct Signal<T> {
    slots: Arc<SlotList<T>>,
}

impl<T: Clone + 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(SlotList {
                next_id: AtomicU64::new(0),
                slots: RwLock::new(IndexMap::new()),
            }),
        }
    }

    /// Connect a slot; it stays connected until the returned connection is
    /// disconnected or the signal is dropped
    pub fn connect<F>(&self, slot: F) -> Connection
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let id = self.slots.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.slots.write().insert(id, Arc::new(slot));

        let list: Arc<dyn Disconnect> = self.slots.clone();
        Connection {
            id,
            list: Some(Arc::downgrade(&list)),
        }
    }

    /// Call every connected slot in connection order
    pub fn emit(&self, value: T) {
        let slots: Vec<Slot<T>> = self.slots.slots.read().values().cloned().collect();
        for slot in slots {
            slot(value.clone());
        }
    }

    pub fn num_slots(&self) -> usize {
        self.slots.slots.read().len()
    }
}

impl<T: Clone + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one connected slot
pub struct Connection {
    id: u64,
    list: Option<Weak<dyn Disconnect>>,
}

impl Connection {
    /// Disconnect the slot. Calling this more than once is harmless.
    pub fn disconnect(&mut self) {
        if let Some(list) = self.list.take().and_then(|weak| weak.upgrade()) {
            list.disconnect(self.id);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.list
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}
