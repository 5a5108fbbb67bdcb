//! Mode-specific reference primitives.
//!
//! Both backends hand out a strong reference that keeps the managed object
//! alive and a weak reference that does not. The bridge only ever moves a
//! reference between the two kinds; it never holds one of each.

use core_types::{HandleError, HandleResult, ObjectRef, ReferenceMode};
use memory_manager::{GlobalRef, ManagedHeap, ReferenceTable, TableKey, WeakGlobalRef};
use std::fmt;
use std::sync::Arc;

/// Strong/weak reference primitives of one reference mode.
pub trait ReferenceBackend: Clone + fmt::Debug + 'static {
    /// Reference keeping the object alive.
    type Strong: fmt::Debug + 'static;
    /// Reference letting the managed collector reclaim the object.
    type Weak: fmt::Debug + 'static;

    /// Mode implemented by this backend.
    const MODE: ReferenceMode;

    /// Creates a strong reference to `object`.
    fn create(&self, object: ObjectRef) -> HandleResult<Self::Strong>;

    /// Converts a strong reference into a weak one.
    ///
    /// On failure the strong reference is handed back unchanged.
    fn downgrade(&self, strong: Self::Strong) -> Result<Self::Weak, (Self::Strong, HandleError)>;

    /// Converts a weak reference back into a strong one.
    ///
    /// On failure the weak reference is handed back unchanged.
    fn upgrade(&self, weak: Self::Weak) -> Result<Self::Strong, (Self::Weak, HandleError)>;

    /// Reads the object behind a strong reference, `None` if it is gone.
    fn read(&self, strong: &Self::Strong) -> Option<ObjectRef>;

    /// Deletes a strong reference.
    fn release_strong(&self, strong: Self::Strong);

    /// Deletes a weak reference.
    fn release_weak(&self, weak: Self::Weak);
}

/// Native global handles on the managed heap.
#[derive(Clone)]
pub struct DirectHandles {
    heap: Arc<ManagedHeap>,
}

impl DirectHandles {
    /// Creates the backend over `heap`.
    pub fn new(heap: Arc<ManagedHeap>) -> Self {
        Self { heap }
    }

    /// Returns the managed heap.
    pub fn heap(&self) -> &Arc<ManagedHeap> {
        &self.heap
    }
}

impl fmt::Debug for DirectHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectHandles")
            .field("global_refs", &self.heap.global_ref_count())
            .finish()
    }
}

impl ReferenceBackend for DirectHandles {
    type Strong = GlobalRef;
    type Weak = WeakGlobalRef;

    const MODE: ReferenceMode = ReferenceMode::DirectHandles;

    fn create(&self, object: ObjectRef) -> HandleResult<GlobalRef> {
        self.heap.new_global_ref(object)
    }

    fn downgrade(&self, strong: GlobalRef) -> Result<WeakGlobalRef, (GlobalRef, HandleError)> {
        match self.heap.new_weak_global_ref(&strong) {
            Ok(weak) => {
                self.heap.delete_global_ref(strong);
                Ok(weak)
            }
            Err(err) => Err((strong, err)),
        }
    }

    fn upgrade(&self, weak: WeakGlobalRef) -> Result<GlobalRef, (WeakGlobalRef, HandleError)> {
        match self.heap.upgrade_weak(&weak) {
            Ok(strong) => {
                self.heap.delete_weak_global_ref(weak);
                Ok(strong)
            }
            Err(err) => Err((weak, err)),
        }
    }

    fn read(&self, strong: &GlobalRef) -> Option<ObjectRef> {
        Some(strong.object())
    }

    fn release_strong(&self, strong: GlobalRef) {
        self.heap.delete_global_ref(strong);
    }

    fn release_weak(&self, weak: WeakGlobalRef) {
        self.heap.delete_weak_global_ref(weak);
    }
}

/// Slots in the process-wide reference table.
///
/// Strong and weak references are the same key; weakness lives in the slot.
#[derive(Clone)]
pub struct IndirectTable {
    table: Arc<ReferenceTable>,
}

impl IndirectTable {
    /// Creates the backend over `table`.
    pub fn new(table: Arc<ReferenceTable>) -> Self {
        Self { table }
    }

    /// Returns the reference table.
    pub fn table(&self) -> &Arc<ReferenceTable> {
        &self.table
    }
}

impl fmt::Debug for IndirectTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndirectTable")
            .field("slots", &self.table.len())
            .finish()
    }
}

/// A bridge owns its slot for its whole life; a missing slot means the table
/// and the bridge disagree.
fn slot_lost(key: TableKey, err: HandleError) -> ! {
    panic!("reference table lost slot {} owned by a bridge: {}", key, err)
}

impl ReferenceBackend for IndirectTable {
    type Strong = TableKey;
    type Weak = TableKey;

    const MODE: ReferenceMode = ReferenceMode::IndirectTable;

    fn create(&self, object: ObjectRef) -> HandleResult<TableKey> {
        self.table.create_reference(object)
    }

    fn downgrade(&self, key: TableKey) -> Result<TableKey, (TableKey, HandleError)> {
        if let Err(err) = self.table.make_weak(key) {
            slot_lost(key, err);
        }
        Ok(key)
    }

    fn upgrade(&self, key: TableKey) -> Result<TableKey, (TableKey, HandleError)> {
        // A collected object leaves an empty strong slot behind; `read`
        // reports it.
        if let Err(err) = self.table.clear_weak(key) {
            slot_lost(key, err);
        }
        Ok(key)
    }

    fn read(&self, key: &TableKey) -> Option<ObjectRef> {
        self.table
            .get_reference(*key)
            .unwrap_or_else(|err| slot_lost(*key, err))
    }

    fn release_strong(&self, key: TableKey) {
        if let Err(err) = self.table.destroy_reference(key) {
            slot_lost(key, err);
        }
    }

    fn release_weak(&self, key: TableKey) {
        self.release_strong(key);
    }
}
