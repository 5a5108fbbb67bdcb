//! Managed heap with native-interop style handles.
//!
//! The heap owns a graph of objects identified by [`ObjectRef`]. Objects
//! survive a collection when they are reachable from a pin (local
//! references, strong reference-table slots) or from a strong global handle.
//! All state sits behind one lock so the heap can be shared between threads.

use crate::gc::{self, MarkColor};
use crate::handles::{GlobalRef, LocalRef, WeakGlobalRef};
use core_types::{HandleError, HandleResult, ObjectRef};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A heap-allocated object in the managed heap.
#[derive(Debug)]
pub(crate) struct ManagedObject {
    /// Class name, for diagnostics
    pub(crate) class_name: String,
    /// Outgoing references to other managed objects
    pub(crate) references: Vec<ObjectRef>,
    /// Number of outstanding pins (local refs, strong table slots)
    pub(crate) pins: usize,
    /// Marking state for the collector
    pub(crate) mark: MarkColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlobalKind {
    Strong,
    Weak,
}

#[derive(Debug)]
struct GlobalEntry {
    object: ObjectRef,
    kind: GlobalKind,
}

#[derive(Debug, Default)]
struct HeapState {
    objects: HashMap<ObjectRef, ManagedObject>,
    globals: HashMap<u64, GlobalEntry>,
    next_object: u64,
    next_handle: u64,
    collections: usize,
}

impl HeapState {
    fn ensure_alive(&self, object: ObjectRef) -> HandleResult<()> {
        if self.objects.contains_key(&object) {
            Ok(())
        } else {
            Err(HandleError::ObjectCollected(object))
        }
    }

    fn insert_global(
        &mut self,
        capacity: Option<usize>,
        object: ObjectRef,
        kind: GlobalKind,
    ) -> HandleResult<u64> {
        if let Some(capacity) = capacity {
            if self.globals.len() >= capacity {
                return Err(HandleError::GlobalCapacityExhausted { capacity });
            }
        }
        self.next_handle += 1;
        let id = self.next_handle;
        self.globals.insert(id, GlobalEntry { object, kind });
        Ok(id)
    }
}

/// The managed heap.
///
/// Contains:
/// - The object graph
/// - The global handle table (strong and weak entries share one capacity)
/// - Collection bookkeeping
#[derive(Debug)]
pub struct ManagedHeap {
    state: Mutex<HeapState>,
    /// Maximum number of live global handles, strong and weak combined
    global_capacity: Option<usize>,
}

impl ManagedHeap {
    /// Creates a heap with an unbounded global handle table.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HeapState::default()),
            global_capacity: None,
        }
    }

    /// Creates a heap that refuses to create more than `capacity` global
    /// handles at once.
    pub fn with_global_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(HeapState::default()),
            global_capacity: Some(capacity),
        }
    }

    /// Returns the configured global handle capacity, if any.
    pub fn global_capacity(&self) -> Option<usize> {
        self.global_capacity
    }

    /// Allocates a new object and returns a local reference pinning it.
    ///
    /// # Arguments
    ///
    /// * `class_name` - Class name recorded for diagnostics
    pub fn allocate(self: &Arc<Self>, class_name: &str) -> LocalRef {
        let object = {
            let mut state = self.state.lock();
            state.next_object += 1;
            let object = ObjectRef::from_raw(state.next_object);
            state.objects.insert(
                object,
                ManagedObject {
                    class_name: class_name.to_string(),
                    references: Vec::new(),
                    pins: 1,
                    mark: MarkColor::White,
                },
            );
            object
        };
        log::trace!("allocated {} ({})", object, class_name);
        LocalRef::new(Arc::clone(self), object)
    }

    /// Creates another local reference to a live object.
    pub fn new_local_ref(self: &Arc<Self>, object: ObjectRef) -> HandleResult<LocalRef> {
        self.pin(object)?;
        Ok(LocalRef::new(Arc::clone(self), object))
    }

    /// Adds one pin to a live object.
    pub(crate) fn pin(&self, object: ObjectRef) -> HandleResult<()> {
        let mut state = self.state.lock();
        match state.objects.get_mut(&object) {
            Some(obj) => {
                obj.pins += 1;
                Ok(())
            }
            None => Err(HandleError::ObjectCollected(object)),
        }
    }

    /// Removes one pin. Unpinning a collected object is ignored.
    pub(crate) fn unpin(&self, object: ObjectRef) {
        let mut state = self.state.lock();
        if let Some(obj) = state.objects.get_mut(&object) {
            debug_assert!(obj.pins > 0, "unbalanced unpin of {}", object);
            obj.pins = obj.pins.saturating_sub(1);
        }
    }

    /// Records a reference from `from` to `to`.
    ///
    /// Both objects must be alive.
    pub fn add_reference(&self, from: ObjectRef, to: ObjectRef) -> HandleResult<()> {
        let mut state = self.state.lock();
        state.ensure_alive(to)?;
        match state.objects.get_mut(&from) {
            Some(obj) => {
                obj.references.push(to);
                Ok(())
            }
            None => Err(HandleError::ObjectCollected(from)),
        }
    }

    /// Creates a strong global handle to a live object.
    ///
    /// # Errors
    ///
    /// Returns `ObjectCollected` if the object is gone and
    /// `GlobalCapacityExhausted` if the handle table is full.
    pub fn new_global_ref(&self, object: ObjectRef) -> HandleResult<GlobalRef> {
        let mut state = self.state.lock();
        state.ensure_alive(object)?;
        let id = state.insert_global(self.global_capacity, object, GlobalKind::Strong)?;
        Ok(GlobalRef { id, object })
    }

    /// Creates a weak global handle to the object behind a strong handle.
    ///
    /// The strong handle is left untouched; delete it separately to make the
    /// object collectible.
    pub fn new_weak_global_ref(&self, global: &GlobalRef) -> HandleResult<WeakGlobalRef> {
        let mut state = self.state.lock();
        let id = state.insert_global(self.global_capacity, global.object, GlobalKind::Weak)?;
        Ok(WeakGlobalRef {
            id,
            object: global.object,
        })
    }

    /// Creates a strong global handle from a weak one.
    ///
    /// # Errors
    ///
    /// Returns `ObjectCollected` if the weak handle's object was reclaimed.
    pub fn upgrade_weak(&self, weak: &WeakGlobalRef) -> HandleResult<GlobalRef> {
        let mut state = self.state.lock();
        state.ensure_alive(weak.object)?;
        let id = state.insert_global(self.global_capacity, weak.object, GlobalKind::Strong)?;
        Ok(GlobalRef {
            id,
            object: weak.object,
        })
    }

    /// Returns the weak handle's object if it is still alive.
    pub fn resolve_weak(&self, weak: &WeakGlobalRef) -> Option<ObjectRef> {
        let state = self.state.lock();
        state.objects.contains_key(&weak.object).then_some(weak.object)
    }

    /// Deletes a strong global handle.
    pub fn delete_global_ref(&self, global: GlobalRef) {
        let removed = self.state.lock().globals.remove(&global.id);
        debug_assert!(
            matches!(removed, Some(GlobalEntry { kind: GlobalKind::Strong, .. })),
            "deleted unknown global handle {}",
            global.id
        );
    }

    /// Deletes a weak global handle.
    pub fn delete_weak_global_ref(&self, weak: WeakGlobalRef) {
        let removed = self.state.lock().globals.remove(&weak.id);
        debug_assert!(
            matches!(removed, Some(GlobalEntry { kind: GlobalKind::Weak, .. })),
            "deleted unknown weak global handle {}",
            weak.id
        );
    }

    /// Performs a full collection.
    ///
    /// # Returns
    ///
    /// The number of objects reclaimed.
    pub fn collect_garbage(&self) -> usize {
        let mut state = self.state.lock();
        let HeapState {
            objects, globals, ..
        } = &mut *state;

        let pinned = objects
            .iter()
            .filter(|(_, obj)| obj.pins > 0)
            .map(|(id, _)| *id);
        let strong_globals = globals
            .values()
            .filter(|entry| entry.kind == GlobalKind::Strong)
            .map(|entry| entry.object);
        let roots: Vec<ObjectRef> = pinned.chain(strong_globals).collect();

        let marked = gc::mark(objects, roots);
        let dead = gc::sweep(objects);
        state.collections += 1;

        log::debug!(
            "managed gc #{}: marked={} reclaimed={}",
            state.collections,
            marked,
            dead.len()
        );
        dead.len()
    }

    /// Returns whether the object has not been collected.
    pub fn is_alive(&self, object: ObjectRef) -> bool {
        self.state.lock().objects.contains_key(&object)
    }

    /// Returns the class name of a live object.
    pub fn class_name(&self, object: ObjectRef) -> Option<String> {
        self.state
            .lock()
            .objects
            .get(&object)
            .map(|obj| obj.class_name.clone())
    }

    /// Returns the number of live objects.
    pub fn live_object_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Returns the number of global handles, strong and weak.
    pub fn global_ref_count(&self) -> usize {
        self.state.lock().globals.len()
    }

    /// Returns the number of strong global handles.
    pub fn strong_global_count(&self) -> usize {
        self.count_globals(GlobalKind::Strong)
    }

    /// Returns the number of weak global handles.
    pub fn weak_global_count(&self) -> usize {
        self.count_globals(GlobalKind::Weak)
    }

    /// Returns the number of collections performed.
    pub fn collection_count(&self) -> usize {
        self.state.lock().collections
    }

    fn count_globals(&self, kind: GlobalKind) -> usize {
        self.state
            .lock()
            .globals
            .values()
            .filter(|entry| entry.kind == kind)
            .count()
    }
}

impl Default for ManagedHeap {
    fn default() -> Self {
        Self::new()
    }
}
