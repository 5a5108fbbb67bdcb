//! Bridge Lifecycle Scenarios
//!
//! Walks a bridge through construction, weakening, re-attachment and
//! teardown in each reference mode.

use integration_tests::{World, MODES};
use memory_manager::{ManagedHeap, ReferenceTable};
use reference_bridge::{
    BridgeError, DirectHandles, IndirectTable, ReferenceBridge, ReferenceMode, Strength,
};
use script_heap::ScriptHeap;
use std::sync::Arc;

/// Test: direct construction holds the target strongly
#[test]
fn test_direct_construction_is_strong() {
    let managed = Arc::new(ManagedHeap::new());
    let script = ScriptHeap::new();
    let root = script.new_proxy(1);
    let target = managed.allocate("T");

    let mut bridge = ReferenceBridge::with_target(
        DirectHandles::new(Arc::clone(&managed)),
        script.persistent(root.proxy()).unwrap(),
        None,
        target.object(),
    )
    .unwrap();

    assert_eq!(bridge.strength(), Strength::Strong);
    assert!(!bridge.is_detached());
    assert_eq!(bridge.target().unwrap(), target.object());
}

/// Test: weakening detaches, target() re-attaches to the same object
#[test]
fn test_weaken_then_target_reattaches() {
    let managed = Arc::new(ManagedHeap::new());
    let script = ScriptHeap::new();
    let root = script.new_proxy(1);
    let target = managed.allocate("T");
    let mut bridge = ReferenceBridge::with_target(
        DirectHandles::new(Arc::clone(&managed)),
        script.persistent(root.proxy()).unwrap(),
        None,
        target.object(),
    )
    .unwrap();

    bridge.weaken();
    assert_eq!(bridge.strength(), Strength::Weak);
    assert!(bridge.is_detached());

    assert_eq!(bridge.target().unwrap(), target.object());
    assert_eq!(bridge.strength(), Strength::Strong);
}

/// Test: a bridge constructed without target attaches later and tears down
#[test]
fn test_attach_later_then_teardown() {
    for mode in MODES {
        let world = World::new(mode);
        let root = world.script.new_proxy(1);
        let target = world.managed.allocate("T");

        world.runtime.wrap(&world.script, root.proxy(), None).unwrap();
        assert_eq!(
            world.runtime.strength(&world.script, root.proxy()).unwrap(),
            Strength::Unattached
        );
        world
            .runtime
            .attach(&world.script, root.proxy(), Some(target.object()))
            .unwrap();
        assert_eq!(
            world.runtime.strength(&world.script, root.proxy()).unwrap(),
            Strength::Strong
        );

        // Finalizing the proxy drops the bridge, which releases its handle.
        let proxy = root.proxy();
        drop(root);
        world.script.collect_garbage();
        world.script.collect_garbage();
        assert!(!world.script.is_alive(proxy));
        assert_eq!(world.managed.global_ref_count(), 0, "{mode}");
        if let Some(table) = world.runtime.table() {
            assert!(table.is_empty());
        }
    }
}

/// Test: a weakened table slot whose object was collected yields an error
#[test]
fn test_table_stale_slot_yields_error() {
    let managed = Arc::new(ManagedHeap::new());
    let table = Arc::new(ReferenceTable::new(Arc::clone(&managed)));
    let script = ScriptHeap::new();
    let root = script.new_proxy(1);
    let target = managed.allocate("T").object();
    let mut bridge = ReferenceBridge::with_target(
        IndirectTable::new(Arc::clone(&table)),
        script.persistent(root.proxy()).unwrap(),
        None,
        target,
    )
    .unwrap();

    bridge.weaken();
    managed.collect_garbage();
    assert!(!managed.is_alive(target));

    assert_eq!(bridge.target().unwrap_err(), BridgeError::TargetCollected);
    assert_eq!(table.len(), 1);
    drop(bridge);
    assert!(table.is_empty());
}

/// Test: full lifecycle driven purely by the two collectors
#[test]
fn test_collector_driven_lifecycle() {
    for mode in MODES {
        let world = World::new(mode);
        let root = world.script.new_proxy(1);
        let proxy = root.proxy();
        let target = world.managed.allocate("T").object();
        world.runtime.wrap(&world.script, proxy, Some(target)).unwrap();

        world.collect_both();
        assert!(world.managed.is_alive(target), "{mode}: rooted proxy");

        drop(root);
        world.collect_both();
        assert!(world.script.is_alive(proxy), "{mode}: notified proxy survives");
        assert!(!world.managed.is_alive(target), "{mode}: weak target reclaimed");

        world.collect_both();
        assert!(!world.script.is_alive(proxy), "{mode}: proxy finalized");
    }
}

/// Test: handle exhaustion in direct mode, table mode unaffected
#[test]
fn test_handle_exhaustion_surfaces_from_wrap() {
    let direct = World::with_heap(
        ReferenceMode::DirectHandles,
        ManagedHeap::with_global_capacity(1),
    );
    let first = direct.script.new_proxy(1);
    let second = direct.script.new_proxy(1);
    let a = direct.managed.allocate("A");
    let b = direct.managed.allocate("B");

    direct
        .runtime
        .wrap(&direct.script, first.proxy(), Some(a.object()))
        .unwrap();
    assert!(matches!(
        direct
            .runtime
            .wrap(&direct.script, second.proxy(), Some(b.object())),
        Err(BridgeError::Handle(_))
    ));

    let table = World::with_heap(
        ReferenceMode::IndirectTable,
        ManagedHeap::with_global_capacity(1),
    );
    let roots: Vec<_> = (0..4).map(|_| table.script.new_proxy(1)).collect();
    for root in &roots {
        let target = table.managed.allocate("T").object();
        table
            .runtime
            .wrap(&table.script, root.proxy(), Some(target))
            .unwrap();
    }
}
