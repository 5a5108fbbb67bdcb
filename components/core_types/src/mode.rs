//! Reference modes and bridge strength states.

use crate::error::ParseModeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How bridges hold their managed-heap targets.
///
/// Selected once per process. `DirectHandles` is used when the managed
/// runtime can hand out as many global handles as there are live bridges;
/// `IndirectTable` routes every reference through a single process-wide
/// slot table instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    /// Native strong and weak global handles, one per bridge
    #[default]
    DirectHandles,
    /// Integer-keyed slots in the indirection table, weak as a per-slot flag
    IndirectTable,
}

impl ReferenceMode {
    /// Returns the short name used in configuration and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceMode::DirectHandles => "direct",
            ReferenceMode::IndirectTable => "table",
        }
    }
}

impl fmt::Display for ReferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "direct_handles" | "global" => Ok(ReferenceMode::DirectHandles),
            "table" | "indirect" | "indirect_table" => Ok(ReferenceMode::IndirectTable),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Strength of the reference a bridge holds on its managed target.
///
/// ```text
/// Unattached ── attach(target) ──► Strong ◄──► Weak
///      │                              │         │
///      └──────────── release() ───────┴─────────┴──► Released
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strength {
    /// Constructed without a target; waiting for the first attach
    Unattached,
    /// Holds a reference that keeps the target alive
    Strong,
    /// Holds a reference that lets the managed collector reclaim the target
    Weak,
    /// Torn down; holds nothing
    Released,
}

impl Strength {
    /// Returns true when the target is not pinned by this reference.
    ///
    /// Everything except `Strong` counts as detached.
    pub fn is_detached(self) -> bool {
        !matches!(self, Strength::Strong)
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strength::Unattached => "unattached",
            Strength::Strong => "strong",
            Strength::Weak => "weak",
            Strength::Released => "released",
        };
        f.write_str(name)
    }
}
