//! Debug-build bridge counters.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Live and detached bridge counts, shared by every bridge of a runtime.
///
/// Counters only move in builds with debug assertions; release builds keep
/// the type but skip the bookkeeping.
#[derive(Debug, Default)]
pub struct BridgeStats {
    total: AtomicUsize,
    detached: AtomicUsize,
}

/// Point-in-time view of [`BridgeStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Live bridges
    pub total: usize,
    /// Live bridges whose target is not held strongly
    pub detached: usize,
}

fn apply(counter: &AtomicUsize, delta: isize) -> usize {
    let magnitude = delta.unsigned_abs();
    if delta >= 0 {
        counter.fetch_add(magnitude, Ordering::Relaxed) + magnitude
    } else {
        counter
            .fetch_sub(magnitude, Ordering::Relaxed)
            .wrapping_sub(magnitude)
    }
}

impl BridgeStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, total: isize, detached: isize) {
        if !cfg!(debug_assertions) || (total == 0 && detached == 0) {
            return;
        }
        let total = apply(&self.total, total);
        let detached = apply(&self.detached, detached);
        log::debug!("bridges: total={} detached={}", total, detached);
    }

    /// Reads both counters.
    #[cfg(debug_assertions)]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            detached: self.detached.load(Ordering::Relaxed),
        }
    }
}
