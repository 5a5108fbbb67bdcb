//! Errors raised by managed-heap handle operations.

use crate::ObjectRef;
use thiserror::Error;

/// Failure of a managed-heap handle or reference-table operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    /// The runtime cannot create another global handle
    #[error("global handle capacity exhausted ({capacity} handles in use)")]
    GlobalCapacityExhausted {
        /// Configured capacity that was reached
        capacity: usize,
    },
    /// The object was reclaimed by the managed collector
    #[error("{0} has been collected")]
    ObjectCollected(ObjectRef),
    /// The reference table has no slot under this key
    #[error("no reference table slot for key {0}")]
    UnknownSlot(u32),
}

/// Result type for handle operations
pub type HandleResult<T> = Result<T, HandleError>;

/// A string did not name a known reference mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown reference mode `{0}` (expected `direct` or `table`)")]
pub struct ParseModeError(pub String);
