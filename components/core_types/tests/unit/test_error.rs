//! Unit tests for HandleError

use core_types::{HandleError, ObjectRef};

#[test]
fn test_handle_error_equality() {
    let a = HandleError::ObjectCollected(ObjectRef::from_raw(1));
    let b = HandleError::ObjectCollected(ObjectRef::from_raw(1));
    assert_eq!(a, b);
    assert_ne!(a, HandleError::UnknownSlot(1));
}

#[test]
fn test_handle_error_is_std_error() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
    assert_error(&HandleError::GlobalCapacityExhausted { capacity: 1 });
}
