//! Script Heap - the script engine side of the reference bridge
//!
//! This component provides:
//! - Proxy objects with internal fields that hold native wrappers
//! - Roots standing in for reachability from script code
//! - Persistent handles that can be made weak, with a notification delivered
//!   to the native wrapper when the proxy becomes unreachable
//! - Full collections and minor collections (scavenges) that only process
//!   handles marked independent
//!
//! The heap is single-threaded: it is shared through `Rc` and every
//! operation runs on the thread that owns it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod heap;
mod native;
mod persistent;

pub use error::{ScriptHeapError, ScriptResult};
pub use heap::{CollectionReport, ProxyId, Root, ScriptHeap};
pub use native::NativeObject;
pub use persistent::Persistent;
