//! Process-wide runtime integration tests
//!
//! Every test in this binary runs with the process fixed to table mode and
//! builds its runtimes over one managed heap, so they all share the process
//! reference table.

use memory_manager::ManagedHeap;
use once_cell::sync::OnceCell;
use reference_bridge::{select_process_mode, BridgeConfig, BridgeRuntime, ConfigError, ReferenceMode};
use script_heap::ScriptHeap;
use std::sync::Arc;

fn process_heap() -> Arc<ManagedHeap> {
    static HEAP: OnceCell<Arc<ManagedHeap>> = OnceCell::new();
    Arc::clone(HEAP.get_or_init(|| Arc::new(ManagedHeap::new())))
}

fn table_config() -> BridgeConfig {
    select_process_mode(ReferenceMode::IndirectTable).unwrap();
    BridgeConfig::default().with_mode(ReferenceMode::IndirectTable)
}

/// Test: runtimes over the process heap share one table
#[test]
fn test_runtimes_share_the_process_table() {
    let config = table_config();
    let managed = process_heap();
    let first = BridgeRuntime::new(&config, Arc::clone(&managed)).unwrap();
    let second = BridgeRuntime::new(&config, Arc::clone(&managed)).unwrap();

    let (a, b) = (first.table().unwrap(), second.table().unwrap());
    assert!(Arc::ptr_eq(a, b));

    let script = ScriptHeap::new();
    let one = script.new_proxy(1);
    let two = script.new_proxy(1);
    let before = a.len();
    let x = managed.allocate("A");
    let y = managed.allocate("B");
    first.wrap(&script, one.proxy(), Some(x.object())).unwrap();
    second.wrap(&script, two.proxy(), Some(y.object())).unwrap();
    assert_eq!(b.len(), before + 2);
}

/// Test: the process cannot switch to direct handles
#[test]
fn test_direct_runtime_is_rejected() {
    table_config();
    let config = BridgeConfig::default().with_mode(ReferenceMode::DirectHandles);

    assert_eq!(
        BridgeRuntime::new(&config, process_heap()).unwrap_err(),
        ConfigError::ModeAlreadySelected {
            selected: ReferenceMode::IndirectTable,
            requested: ReferenceMode::DirectHandles
        }
    );
}

/// Test: the process table stays bound to the heap it was created over
#[test]
fn test_process_table_rejects_other_heaps() {
    let config = table_config();
    let runtime = BridgeRuntime::for_process(process_heap()).unwrap();
    assert_eq!(runtime.mode(), ReferenceMode::IndirectTable);
    assert!(Arc::ptr_eq(runtime.table().unwrap().heap(), &process_heap()));

    assert_eq!(
        BridgeRuntime::new(&config, Arc::new(ManagedHeap::new())).unwrap_err(),
        ConfigError::TableHeapMismatch
    );
}
