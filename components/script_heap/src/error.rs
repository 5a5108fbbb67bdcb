//! Error types for script heap operations

use crate::ProxyId;
use thiserror::Error;

/// Script heap errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptHeapError {
    /// The proxy was finalized or never existed
    #[error("proxy {0} does not exist")]
    UnknownProxy(ProxyId),

    /// The proxy has fewer internal fields than the requested index
    #[error("proxy {proxy} has {count} internal fields, index {index} requested")]
    FieldOutOfRange {
        /// Proxy being accessed
        proxy: ProxyId,
        /// Requested field index
        index: usize,
        /// Number of internal fields on the proxy
        count: usize,
    },

    /// The internal field already holds a native
    #[error("internal field {index} of proxy {proxy} is already set")]
    FieldOccupied {
        /// Proxy being accessed
        proxy: ProxyId,
        /// Field index
        index: usize,
    },

    /// The internal field holds no native, or it is in use further up the stack
    #[error("internal field {index} of proxy {proxy} is empty")]
    FieldEmpty {
        /// Proxy being accessed
        proxy: ProxyId,
        /// Field index
        index: usize,
    },

    /// The native in the internal field is not of the requested type
    #[error("native in proxy {0} has an unexpected type")]
    NativeTypeMismatch(ProxyId),

    /// A persistent handle already exists for the proxy
    #[error("proxy {0} already has a persistent handle")]
    PersistentExists(ProxyId),
}

/// Result type for script heap operations
pub type ScriptResult<T> = Result<T, ScriptHeapError>;
