//! Reference Bridge - coordinates object lifetimes across two collectors
//!
//! A script-heap proxy and a managed-heap target are paired by a
//! [`ReferenceBridge`] stored in the proxy's first internal field. The bridge
//! holds the target strongly while script code may still use the proxy, and
//! downgrades to a weak reference when the script collector reports the
//! proxy unreachable. Neither collector ever waits on the other.
//!
//! Two backends share one contract, selected once per process:
//! - [`DirectHandles`]: one strong or weak global handle per bridge
//! - [`IndirectTable`]: one slot in the process-wide reference table, weak
//!   as a per-slot flag
//!
//! # Example
//!
//! ```
//! use memory_manager::ManagedHeap;
//! use reference_bridge::BridgeRuntime;
//! use script_heap::ScriptHeap;
//! use std::sync::Arc;
//!
//! let managed = Arc::new(ManagedHeap::new());
//! let script = ScriptHeap::new();
//! let runtime = BridgeRuntime::for_process(Arc::clone(&managed)).unwrap();
//!
//! let target = managed.allocate("Widget");
//! let proxy = script.new_proxy(1);
//! runtime.wrap(&script, proxy.proxy(), Some(target.object())).unwrap();
//!
//! assert_eq!(runtime.target(&script, proxy.proxy()).unwrap(), target.object());
//! assert!(!runtime.is_detached(&script, proxy.proxy()).unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backend;
pub mod bridge;
pub mod config;
pub mod error;
pub mod runtime;
pub mod stats;

pub use backend::{DirectHandles, IndirectTable, ReferenceBackend};
pub use bridge::{ProxyBridge, ReferenceBridge};
pub use config::{process_mode, select_process_mode, BridgeConfig, ConfigError};
pub use error::{BridgeError, BridgeResult};
pub use runtime::BridgeRuntime;
pub use stats::{BridgeStats, StatsSnapshot};

pub use core_types::{ObjectRef, ReferenceMode, Strength};
