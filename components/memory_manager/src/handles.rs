//! Handles into the managed heap.
//!
//! Handles are move-only: deleting a global or weak global handle consumes
//! it, so a handle cannot be deleted twice.

use crate::heap::ManagedHeap;
use core_types::ObjectRef;
use std::fmt;
use std::sync::Arc;

/// Scoped pin on a managed object, released on drop.
///
/// Mirrors a native-interop local reference: the object stays alive at
/// least as long as this value.
#[must_use = "dropping a LocalRef unpins the object immediately"]
pub struct LocalRef {
    heap: Arc<ManagedHeap>,
    object: ObjectRef,
}

impl LocalRef {
    pub(crate) fn new(heap: Arc<ManagedHeap>, object: ObjectRef) -> Self {
        Self { heap, object }
    }

    /// Returns the pinned object.
    pub fn object(&self) -> ObjectRef {
        self.object
    }
}

impl Drop for LocalRef {
    fn drop(&mut self) {
        self.heap.unpin(self.object);
    }
}

impl fmt::Debug for LocalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRef").field("object", &self.object).finish()
    }
}

/// Strong global handle: a collector root until deleted.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a GlobalRef must be deleted through ManagedHeap::delete_global_ref"]
pub struct GlobalRef {
    pub(crate) id: u64,
    pub(crate) object: ObjectRef,
}

impl GlobalRef {
    /// Returns the referenced object.
    ///
    /// A strong handle keeps its object alive, so this identity is always
    /// valid while the handle exists.
    pub fn object(&self) -> ObjectRef {
        self.object
    }
}

/// Weak global handle: does not keep its object alive.
///
/// The handle itself remains valid after the object is collected; use
/// [`ManagedHeap::resolve_weak`] or [`ManagedHeap::upgrade_weak`] to find out.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a WeakGlobalRef must be deleted through ManagedHeap::delete_weak_global_ref"]
pub struct WeakGlobalRef {
    pub(crate) id: u64,
    pub(crate) object: ObjectRef,
}
