//! Error types for bridge operations

use core_types::HandleError;
use script_heap::ScriptHeapError;
use thiserror::Error;

/// Bridge errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The managed collector reclaimed the target while the bridge was weak
    #[error("managed target was collected while the bridge was weak")]
    TargetCollected,

    /// The managed runtime refused a handle
    #[error(transparent)]
    Handle(#[from] HandleError),

    /// The proxy or its internal field could not be used
    #[error(transparent)]
    Script(#[from] ScriptHeapError),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
