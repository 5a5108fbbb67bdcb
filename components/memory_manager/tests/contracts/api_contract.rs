//! Contract tests verifying the memory_manager API matches what the bridge consumes.
//! These tests ensure all exported types and functions exist with correct signatures.

use core_types::{HandleResult, ObjectRef};
use memory_manager::{GlobalRef, LocalRef, ManagedHeap, ReferenceTable, TableKey, WeakGlobalRef};
use std::sync::Arc;

/// Test ManagedHeap contract: allocate(&Arc<Self>, &str) -> LocalRef
#[test]
fn contract_heap_allocate() {
    let heap = Arc::new(ManagedHeap::new());
    let local: LocalRef = heap.allocate("Widget");
    assert!(heap.is_alive(local.object()));
}

/// Test direct-mode contract: create strong, create weak, delete both
#[test]
fn contract_direct_handle_operations() {
    let heap = Arc::new(ManagedHeap::new());
    let local = heap.allocate("Widget");

    let _create: fn(&ManagedHeap, ObjectRef) -> HandleResult<GlobalRef> = ManagedHeap::new_global_ref;
    let _weaken: fn(&ManagedHeap, &GlobalRef) -> HandleResult<WeakGlobalRef> =
        ManagedHeap::new_weak_global_ref;
    let _upgrade: fn(&ManagedHeap, &WeakGlobalRef) -> HandleResult<GlobalRef> =
        ManagedHeap::upgrade_weak;

    let global = heap.new_global_ref(local.object()).unwrap();
    let weak = heap.new_weak_global_ref(&global).unwrap();
    heap.delete_global_ref(global);
    heap.delete_weak_global_ref(weak);
    assert_eq!(heap.global_ref_count(), 0);
}

/// Test indirect-mode contract: createSlot, weakenSlot, clearWeak, readSlot, destroySlot
#[test]
fn contract_table_operations() {
    let heap = Arc::new(ManagedHeap::new());
    let table = ReferenceTable::new(Arc::clone(&heap));
    let local = heap.allocate("Widget");

    let key: TableKey = table.create_reference(local.object()).unwrap();
    table.make_weak(key).unwrap();
    let restored: Option<ObjectRef> = table.clear_weak(key).unwrap();
    assert_eq!(restored, Some(local.object()));
    assert_eq!(table.get_reference(key).unwrap(), Some(local.object()));
    table.destroy_reference(key).unwrap();
}

/// Test the table is shareable across threads
#[test]
fn contract_table_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ReferenceTable>();
    assert_send_sync::<ManagedHeap>();
    assert_send_sync::<GlobalRef>();
    assert_send_sync::<WeakGlobalRef>();
}
