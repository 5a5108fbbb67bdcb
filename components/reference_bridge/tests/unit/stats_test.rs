//! Diagnostics counters across many bridges

#![cfg(debug_assertions)]

use memory_manager::ManagedHeap;
use reference_bridge::{BridgeRuntime, BridgeStats, StatsSnapshot};
use script_heap::ScriptHeap;
use std::sync::Arc;

#[test]
fn test_detached_count_matches_bridges() {
    let managed = Arc::new(ManagedHeap::new());
    let stats = Arc::new(BridgeStats::new());
    let runtime = BridgeRuntime::direct(Arc::clone(&managed)).with_stats(Arc::clone(&stats));
    let script = ScriptHeap::new();

    let kept = script.new_proxy(1);
    let dropped = script.new_proxy(1);
    let pending = script.new_proxy(1);
    for root in [&kept, &dropped] {
        runtime
            .wrap(&script, root.proxy(), Some(managed.allocate("T").object()))
            .unwrap();
    }
    runtime.wrap(&script, pending.proxy(), None).unwrap();
    assert_eq!(
        stats.snapshot(),
        StatsSnapshot {
            total: 3,
            detached: 1
        }
    );

    let dropped_id = dropped.proxy();
    drop(dropped);
    script.collect_garbage();
    assert_eq!(stats.snapshot().detached, 2);
    assert!(runtime.is_detached(&script, dropped_id).unwrap());

    script.collect_garbage();
    assert_eq!(
        stats.snapshot(),
        StatsSnapshot {
            total: 2,
            detached: 1
        }
    );
}

#[test]
fn test_runtime_without_stats_counts_nothing() {
    let managed = Arc::new(ManagedHeap::new());
    let runtime = BridgeRuntime::direct(Arc::clone(&managed));
    assert!(runtime.stats().is_none());

    let script = ScriptHeap::new();
    let root = script.new_proxy(1);
    runtime.wrap(&script, root.proxy(), None).unwrap();
}
