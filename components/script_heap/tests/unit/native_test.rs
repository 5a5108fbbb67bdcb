//! Typed access to natives in internal fields

use script_heap::{NativeObject, ScriptHeap, ScriptHeapError};
use std::any::Any;

struct Counter(u32);

impl NativeObject for Counter {
    fn on_weak(&mut self) {}
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Other;

impl NativeObject for Other {
    fn on_weak(&mut self) {}
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn test_with_native_mutates_in_place() {
    let heap = ScriptHeap::new();
    let root = heap.new_proxy(1);
    heap.set_internal_field(root.proxy(), 0, Box::new(Counter(1)))
        .unwrap();

    heap.with_native::<Counter, _>(root.proxy(), |c| c.0 += 1)
        .unwrap();
    let value = heap
        .with_native::<Counter, _>(root.proxy(), |c| c.0)
        .unwrap();
    assert_eq!(value, 2);
}

#[test]
fn test_type_mismatch_keeps_native() {
    let heap = ScriptHeap::new();
    let root = heap.new_proxy(1);
    heap.set_internal_field(root.proxy(), 0, Box::new(Counter(7)))
        .unwrap();

    assert_eq!(
        heap.with_native::<Other, _>(root.proxy(), |_| ()).unwrap_err(),
        ScriptHeapError::NativeTypeMismatch(root.proxy())
    );
    assert_eq!(
        heap.with_native::<Counter, _>(root.proxy(), |c| c.0).unwrap(),
        7
    );
}

#[test]
fn test_nested_access_sees_empty_field() {
    let heap = ScriptHeap::new();
    let root = heap.new_proxy(1);
    let proxy = root.proxy();
    heap.set_internal_field(proxy, 0, Box::new(Counter(0)))
        .unwrap();

    let inner = heap
        .with_native::<Counter, _>(proxy, |_| heap.with_native::<Counter, _>(proxy, |c| c.0))
        .unwrap();
    assert_eq!(
        inner.unwrap_err(),
        ScriptHeapError::FieldEmpty { proxy, index: 0 }
    );
}

#[test]
fn test_occupied_and_missing_fields() {
    let heap = ScriptHeap::new();
    let root = heap.new_proxy(1);
    let proxy = root.proxy();
    let bare = heap.new_proxy(0);

    heap.set_internal_field(proxy, 0, Box::new(Counter(0)))
        .unwrap();
    assert_eq!(
        heap.set_internal_field(proxy, 0, Box::new(Other))
            .unwrap_err(),
        ScriptHeapError::FieldOccupied { proxy, index: 0 }
    );
    assert_eq!(heap.internal_field_count(bare.proxy()).unwrap(), 0);
    assert!(matches!(
        heap.with_native::<Counter, _>(bare.proxy(), |_| ()),
        Err(ScriptHeapError::FieldOutOfRange { index: 0, count: 0, .. })
    ));
}
