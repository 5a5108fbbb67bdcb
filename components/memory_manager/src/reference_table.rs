//! Process-wide reference table.
//!
//! Stands in for native global handles when the runtime cannot hand out one
//! per bridge. Each reference occupies a slot addressed by a small non-zero
//! integer key. A strong slot pins its object on the managed heap; a weak
//! slot does not. Weakness is a flag on the slot, so weakening and
//! re-strengthening never move a reference to a different key.
//!
//! All operations take the table lock and may then take the heap lock,
//! never the other way around.

use crate::heap::ManagedHeap;
use core_types::{HandleError, HandleResult, ObjectRef};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Key of a reference-table slot. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey(NonZeroU32);

impl TableKey {
    /// Returns the raw key value.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct Slot {
    /// `None` once a weak slot was found collected and cleared
    object: Option<ObjectRef>,
    weak: bool,
}

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<TableKey, Slot>,
    last_key: u32,
}

impl Slots {
    fn next_key(&mut self) -> TableKey {
        loop {
            self.last_key = self.last_key.wrapping_add(1);
            if let Some(raw) = NonZeroU32::new(self.last_key) {
                let key = TableKey(raw);
                if !self.entries.contains_key(&key) {
                    return key;
                }
            }
        }
    }
}

/// Slot table mapping integer keys to managed objects.
pub struct ReferenceTable {
    heap: Arc<ManagedHeap>,
    slots: Mutex<Slots>,
}

impl ReferenceTable {
    /// Creates an empty table over `heap`.
    pub fn new(heap: Arc<ManagedHeap>) -> Self {
        Self {
            heap,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Returns the heap this table pins objects on.
    pub fn heap(&self) -> &Arc<ManagedHeap> {
        &self.heap
    }

    /// Stores a strong reference to `object` in a new slot.
    ///
    /// # Errors
    ///
    /// Returns `ObjectCollected` if the object is already gone.
    pub fn create_reference(&self, object: ObjectRef) -> HandleResult<TableKey> {
        let mut slots = self.slots.lock();
        self.heap.pin(object)?;
        let key = slots.next_key();
        slots.entries.insert(
            key,
            Slot {
                object: Some(object),
                weak: false,
            },
        );
        log::trace!("reference table: slot {} -> {}", key, object);
        Ok(key)
    }

    /// Marks a slot weak in place. Weakening a weak slot does nothing.
    pub fn make_weak(&self, key: TableKey) -> HandleResult<()> {
        let mut slots = self.slots.lock();
        let slot = slots
            .entries
            .get_mut(&key)
            .ok_or(HandleError::UnknownSlot(key.get()))?;
        if !slot.weak {
            if let Some(object) = slot.object {
                self.heap.unpin(object);
            }
            slot.weak = true;
        }
        Ok(())
    }

    /// Clears a slot's weak flag, making it strong again.
    ///
    /// # Returns
    ///
    /// The object, or `None` if the collector reclaimed it while the slot was
    /// weak. In that case the slot becomes a strong slot holding nothing.
    pub fn clear_weak(&self, key: TableKey) -> HandleResult<Option<ObjectRef>> {
        let mut slots = self.slots.lock();
        let slot = slots
            .entries
            .get_mut(&key)
            .ok_or(HandleError::UnknownSlot(key.get()))?;
        if !slot.weak {
            return Ok(slot.object);
        }

        slot.weak = false;
        let Some(object) = slot.object else {
            return Ok(None);
        };
        match self.heap.pin(object) {
            Ok(()) => Ok(Some(object)),
            Err(_) => {
                log::warn!(
                    "reference table: weak slot {} lost {} to the collector",
                    key,
                    object
                );
                slot.object = None;
                Ok(None)
            }
        }
    }

    /// Reads a slot.
    ///
    /// Weak slots yield their object only while it is still alive.
    pub fn get_reference(&self, key: TableKey) -> HandleResult<Option<ObjectRef>> {
        let slots = self.slots.lock();
        let slot = slots
            .entries
            .get(&key)
            .ok_or(HandleError::UnknownSlot(key.get()))?;
        match slot.object {
            Some(object) if slot.weak => Ok(self.heap.is_alive(object).then_some(object)),
            other => Ok(other),
        }
    }

    /// Frees a slot, unpinning its object if the slot was strong.
    pub fn destroy_reference(&self, key: TableKey) -> HandleResult<()> {
        let mut slots = self.slots.lock();
        let slot = slots
            .entries
            .remove(&key)
            .ok_or(HandleError::UnknownSlot(key.get()))?;
        if let (false, Some(object)) = (slot.weak, slot.object) {
            self.heap.unpin(object);
        }
        log::trace!("reference table: slot {} destroyed", key);
        Ok(())
    }

    /// Returns whether a slot is weak, or `None` for an unknown key.
    pub fn is_weak(&self, key: TableKey) -> Option<bool> {
        self.slots.lock().entries.get(&key).map(|slot| slot.weak)
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    /// Returns true if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ReferenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceTable")
            .field("slots", &self.len())
            .finish()
    }
}
