//! Core types shared by both heaps and the reference bridge.
//!
//! This crate provides the vocabulary every other component speaks:
//! managed-object identity, the process-wide reference mode, bridge
//! strength states and the errors raised by handle operations.
//!
//! # Overview
//!
//! - [`ObjectRef`] - Identity of an object on the managed heap
//! - [`ReferenceMode`] - Direct global handles or the indirection table
//! - [`Strength`] - Reference strength held by a bridge
//! - [`HandleError`] - Failures of managed-heap handle operations
//!
//! # Examples
//!
//! ```
//! use core_types::{ReferenceMode, Strength};
//!
//! let mode: ReferenceMode = "table".parse().unwrap();
//! assert_eq!(mode, ReferenceMode::IndirectTable);
//!
//! assert!(Strength::Weak.is_detached());
//! assert!(!Strength::Strong.is_detached());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod mode;
mod object;

pub use error::{HandleError, HandleResult, ParseModeError};
pub use mode::{ReferenceMode, Strength};
pub use object::ObjectRef;
