//! Managed-heap object identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an object living on the managed heap.
///
/// Identities are never reused by a heap, so a stale `ObjectRef` can always
/// be told apart from a newer object: asking the heap about it simply reports
/// the object as gone.
///
/// # Examples
///
/// ```
/// use core_types::ObjectRef;
///
/// let obj = ObjectRef::from_raw(7);
/// assert_eq!(obj.as_raw(), 7);
/// assert_eq!(obj.to_string(), "obj#7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef(u64);

impl ObjectRef {
    /// Wraps a raw identity value.
    pub const fn from_raw(raw: u64) -> Self {
        ObjectRef(raw)
    }

    /// Returns the raw identity value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}
