//! The per-proxy bridge and its state machine.
//!
//! ```text
//! Unattached ── attach(Some) ──► Strong
//! Strong     ── weaken() ──────► Weak
//! Weak       ── target()/attach(None) ──► Strong
//! any        ── release() ─────► Released   (teardown only)
//! ```
//!
//! Every transition re-arms the weak notification on the script peer, since
//! the script heap disarms it each time it fires.

use crate::backend::ReferenceBackend;
use crate::error::{BridgeError, BridgeResult};
use crate::stats::BridgeStats;
use core_types::{HandleError, ObjectRef, ReferenceMode, Strength};
use script_heap::{NativeObject, Persistent};
use std::any::Any;
use std::fmt;
use std::mem;
use std::sync::Arc;

/// Operations the proxy catalog performs on a bridge, independent of mode.
pub trait ProxyBridge {
    /// Attaches a target, or re-strengthens the current one with `None`.
    fn attach(&mut self, target: Option<ObjectRef>) -> BridgeResult<()>;

    /// Returns the target, re-strengthening first if detached.
    fn target(&mut self) -> BridgeResult<ObjectRef>;

    /// Downgrades to a weak reference. Idempotent.
    fn weaken(&mut self);

    /// Returns true unless the target is held strongly.
    fn is_detached(&self) -> bool;

    /// Returns the current strength.
    fn strength(&self) -> Strength;

    /// Returns the reference mode of this bridge.
    fn mode(&self) -> ReferenceMode;
}

/// Exactly one reference kind, or none.
enum TargetRef<B: ReferenceBackend> {
    Unattached,
    Strong(B::Strong),
    Weak(B::Weak),
    Released,
}

impl<B: ReferenceBackend> TargetRef<B> {
    fn strength(&self) -> Strength {
        match self {
            TargetRef::Unattached => Strength::Unattached,
            TargetRef::Strong(_) => Strength::Strong,
            TargetRef::Weak(_) => Strength::Weak,
            TargetRef::Released => Strength::Released,
        }
    }
}

/// Pairs one script proxy with one managed-heap target.
///
/// The bridge lives in internal field 0 of its proxy and is dropped when the
/// proxy is finalized, releasing whatever reference it still holds. Its
/// persistent handle on the proxy is kept weak at all times.
pub struct ReferenceBridge<B: ReferenceBackend> {
    backend: B,
    peer: Persistent,
    target: TargetRef<B>,
    stats: Option<Arc<BridgeStats>>,
}

impl<B: ReferenceBackend> ReferenceBridge<B> {
    /// Creates an unattached bridge; the target comes later via `attach`.
    pub fn new(backend: B, peer: Persistent, stats: Option<Arc<BridgeStats>>) -> Self {
        let bridge = Self {
            backend,
            peer,
            target: TargetRef::Unattached,
            stats,
        };
        bridge.arm_peer();
        bridge.record(1, 1);
        bridge
    }

    /// Creates a bridge holding `target` strongly.
    pub fn with_target(
        backend: B,
        peer: Persistent,
        stats: Option<Arc<BridgeStats>>,
        target: ObjectRef,
    ) -> BridgeResult<Self> {
        let mut bridge = Self::new(backend, peer, stats);
        bridge.attach(Some(target))?;
        Ok(bridge)
    }

    /// Attaches `target`, or re-strengthens the held reference when `None`.
    ///
    /// # Panics
    ///
    /// On a released bridge, when a new target is offered to an attached
    /// bridge, or when `None` is passed to an unattached one.
    pub fn attach(&mut self, target: Option<ObjectRef>) -> BridgeResult<()> {
        match (&self.target, target) {
            (TargetRef::Released, _) => panic!("attach on a released bridge"),
            (TargetRef::Strong(_) | TargetRef::Weak(_), Some(object)) => {
                panic!("attach({}) on a bridge that already holds a target", object)
            }
            (TargetRef::Unattached, None) => panic!("attach(None) on an unattached bridge"),
            _ => {}
        }

        self.arm_peer();
        match target {
            Some(object) => {
                let strong = self.backend.create(object)?;
                log::trace!("bridge for {} attached {}", self.peer.proxy(), object);
                self.target = TargetRef::Strong(strong);
                self.record(0, -1);
                Ok(())
            }
            None => self.strengthen(),
        }
    }

    /// Returns the target, holding it strongly from here on.
    ///
    /// # Errors
    ///
    /// `TargetCollected` if the managed collector reclaimed the target while
    /// the bridge was weak; `Handle` if no strong reference could be created.
    ///
    /// # Panics
    ///
    /// On an unattached or released bridge.
    pub fn target(&mut self) -> BridgeResult<ObjectRef> {
        match self.target {
            TargetRef::Released => panic!("target() on a released bridge"),
            TargetRef::Unattached => panic!("target() on an unattached bridge"),
            TargetRef::Weak(_) => {
                self.arm_peer();
                self.strengthen()?;
            }
            TargetRef::Strong(_) => {}
        }

        let TargetRef::Strong(strong) = &self.target else {
            unreachable!("strengthen leaves the bridge strong on success");
        };
        self.backend.read(strong).ok_or_else(|| {
            log::error!(
                "bridge for {}: {} slot emptied by the collector before re-attach",
                self.peer.proxy(),
                B::MODE
            );
            BridgeError::TargetCollected
        })
    }

    /// Downgrades the held reference so the managed collector may reclaim
    /// the target. Does nothing when already detached.
    ///
    /// # Panics
    ///
    /// On a released bridge.
    pub fn weaken(&mut self) {
        if matches!(self.target, TargetRef::Released) {
            panic!("weaken on a released bridge");
        }
        self.peer.set_weak();

        let Some(strong) = self.take_strong() else {
            return;
        };
        self.target = match self.backend.downgrade(strong) {
            Ok(weak) => {
                self.record(0, 1);
                TargetRef::Weak(weak)
            }
            Err((strong, err)) => {
                log::warn!(
                    "bridge for {} stays strong, downgrade failed: {}",
                    self.peer.proxy(),
                    err
                );
                TargetRef::Strong(strong)
            }
        };
    }

    /// Returns true unless the target is held strongly.
    pub fn is_detached(&self) -> bool {
        self.strength().is_detached()
    }

    /// Returns the current strength.
    pub fn strength(&self) -> Strength {
        self.target.strength()
    }

    /// Returns the proxy this bridge belongs to.
    pub fn proxy(&self) -> script_heap::ProxyId {
        self.peer.proxy()
    }

    /// Deletes the held reference. Teardown only.
    ///
    /// # Panics
    ///
    /// When called twice.
    pub(crate) fn release(&mut self) {
        match mem::replace(&mut self.target, TargetRef::Released) {
            TargetRef::Released => panic!("bridge released twice"),
            TargetRef::Strong(strong) => {
                self.backend.release_strong(strong);
                self.record(0, 1);
            }
            TargetRef::Weak(weak) => self.backend.release_weak(weak),
            TargetRef::Unattached => {}
        }
    }

    fn strengthen(&mut self) -> BridgeResult<()> {
        let Some(weak) = self.take_weak() else {
            return Ok(());
        };
        match self.backend.upgrade(weak) {
            Ok(strong) => {
                self.target = TargetRef::Strong(strong);
                self.record(0, -1);
                Ok(())
            }
            Err((weak, err)) => {
                self.target = TargetRef::Weak(weak);
                match err {
                    HandleError::ObjectCollected(object) => {
                        log::error!(
                            "bridge for {}: {} was collected before re-attach",
                            self.peer.proxy(),
                            object
                        );
                        Err(BridgeError::TargetCollected)
                    }
                    other => Err(other.into()),
                }
            }
        }
    }

    fn take_strong(&mut self) -> Option<B::Strong> {
        match mem::replace(&mut self.target, TargetRef::Unattached) {
            TargetRef::Strong(strong) => Some(strong),
            other => {
                self.target = other;
                None
            }
        }
    }

    fn take_weak(&mut self) -> Option<B::Weak> {
        match mem::replace(&mut self.target, TargetRef::Unattached) {
            TargetRef::Weak(weak) => Some(weak),
            other => {
                self.target = other;
                None
            }
        }
    }

    fn arm_peer(&self) {
        self.peer.set_weak();
        self.peer.mark_independent();
    }

    fn record(&self, total: isize, detached: isize) {
        if let Some(stats) = &self.stats {
            stats.record(total, detached);
        }
    }
}

impl<B: ReferenceBackend> ProxyBridge for ReferenceBridge<B> {
    fn attach(&mut self, target: Option<ObjectRef>) -> BridgeResult<()> {
        ReferenceBridge::attach(self, target)
    }

    fn target(&mut self) -> BridgeResult<ObjectRef> {
        ReferenceBridge::target(self)
    }

    fn weaken(&mut self) {
        ReferenceBridge::weaken(self)
    }

    fn is_detached(&self) -> bool {
        ReferenceBridge::is_detached(self)
    }

    fn strength(&self) -> Strength {
        ReferenceBridge::strength(self)
    }

    fn mode(&self) -> ReferenceMode {
        B::MODE
    }
}

impl<B: ReferenceBackend> NativeObject for ReferenceBridge<B> {
    fn on_weak(&mut self) {
        match self.target {
            TargetRef::Released => {}
            TargetRef::Strong(_) => self.weaken(),
            TargetRef::Unattached | TargetRef::Weak(_) => self.peer.set_weak(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<B: ReferenceBackend> Drop for ReferenceBridge<B> {
    fn drop(&mut self) {
        if !matches!(self.target, TargetRef::Released) {
            self.release();
        }
        self.record(-1, -1);
    }
}

impl<B: ReferenceBackend> fmt::Debug for ReferenceBridge<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceBridge")
            .field("mode", &B::MODE)
            .field("proxy", &self.peer.proxy())
            .field("strength", &self.strength())
            .finish()
    }
}
