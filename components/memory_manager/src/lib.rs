//! Memory Manager - managed heap and native-interop reference surface
//!
//! This component provides:
//! - A managed heap with a tri-color mark-and-sweep collector
//! - JNI-style local, global and weak global handles
//! - A bounded global handle capacity, to model runtimes that run out of them
//! - The process-wide reference table used when global handles are scarce

pub mod gc;
pub mod handles;
pub mod heap;
pub mod reference_table;

// Re-export main types
pub use gc::MarkColor;
pub use handles::{GlobalRef, LocalRef, WeakGlobalRef};
pub use heap::ManagedHeap;
pub use reference_table::{ReferenceTable, TableKey};
