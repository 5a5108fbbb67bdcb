//! Contract tests for the script_heap public API

use script_heap::{
    CollectionReport, NativeObject, Persistent, ProxyId, Root, ScriptHeap, ScriptHeapError,
    ScriptResult,
};

#[test]
fn test_heap_api_signatures() {
    let _: fn() -> ScriptHeap = ScriptHeap::new;
    let _: fn(&ScriptHeap, usize) -> Root = ScriptHeap::new_proxy;
    let _: fn(&ScriptHeap, ProxyId) -> ScriptResult<Root> = ScriptHeap::root;
    let _: fn(&ScriptHeap, ProxyId) -> ScriptResult<Persistent> = ScriptHeap::persistent;
    let _: fn(&ScriptHeap, ProxyId, ProxyId) -> ScriptResult<()> = ScriptHeap::add_reference;
    let _: fn(&ScriptHeap, ProxyId, usize, Box<dyn NativeObject>) -> ScriptResult<()> =
        ScriptHeap::set_internal_field;
    let _: fn(&ScriptHeap) -> CollectionReport = ScriptHeap::collect_garbage;
    let _: fn(&ScriptHeap) -> CollectionReport = ScriptHeap::scavenge;
}

#[test]
fn test_persistent_api_signatures() {
    let _: fn(&Persistent) = Persistent::set_weak;
    let _: fn(&Persistent) = Persistent::clear_weak;
    let _: fn(&Persistent) = Persistent::mark_independent;
    let _: fn(&Persistent) -> bool = Persistent::is_weak;
    let _: fn(Persistent) = Persistent::reset;
    let _: fn(&Persistent) -> ProxyId = Persistent::proxy;
}

#[test]
fn test_heap_clones_share_state() {
    let heap = ScriptHeap::new();
    let other = heap.clone();
    let root = heap.new_proxy(0);
    assert!(other.is_alive(root.proxy()));
}

#[test]
fn test_errors_render_proxy_identity() {
    let heap = ScriptHeap::new();
    let root = heap.new_proxy(0);
    let err = ScriptHeapError::PersistentExists(root.proxy());
    assert_eq!(
        err.to_string(),
        format!("proxy {} already has a persistent handle", root.proxy())
    );
    assert!(root.proxy().to_string().starts_with("proxy#"));
}
