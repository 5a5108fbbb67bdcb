//! Persistent handles to proxies.

use crate::heap::{HeapInner, PersistentState, ProxyId, ProxyObject};
use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

/// Handle that outlives any [`crate::Root`] and can be made weak.
///
/// A strong persistent handle keeps its proxy alive. After [`set_weak`]
/// the proxy may become unreachable, at which point the native in internal
/// field 0 receives exactly one `on_weak` call. Calling `set_weak` again
/// re-arms the notification.
///
/// Dropping the handle disposes of it, like [`reset`]. Operations on a
/// handle whose proxy was finalized, or whose heap is gone, do nothing.
///
/// [`set_weak`]: Persistent::set_weak
/// [`reset`]: Persistent::reset
pub struct Persistent {
    heap: Weak<RefCell<HeapInner>>,
    proxy: ProxyId,
}

impl Persistent {
    pub(crate) fn new(heap: Weak<RefCell<HeapInner>>, proxy: ProxyId) -> Self {
        Self { heap, proxy }
    }

    /// Returns the proxy this handle refers to.
    pub fn proxy(&self) -> ProxyId {
        self.proxy
    }

    /// Makes the handle weak and arms the weak notification.
    pub fn set_weak(&self) {
        self.update(|obj| obj.persistent = PersistentState::Weak { armed: true });
    }

    /// Makes the handle strong again.
    pub fn clear_weak(&self) {
        self.update(|obj| obj.persistent = PersistentState::Strong);
    }

    /// Lets minor collections process this handle.
    pub fn mark_independent(&self) {
        self.update(|obj| obj.independent = true);
    }

    /// Returns whether the handle is weak.
    pub fn is_weak(&self) -> bool {
        self.read(|obj| matches!(obj.persistent, PersistentState::Weak { .. }))
            .unwrap_or(false)
    }

    /// Returns whether the weak notification is armed.
    pub fn is_armed(&self) -> bool {
        self.read(|obj| obj.persistent == PersistentState::Weak { armed: true })
            .unwrap_or(false)
    }

    /// Returns whether the handle was marked independent.
    pub fn is_independent(&self) -> bool {
        self.read(|obj| obj.independent).unwrap_or(false)
    }

    /// Returns whether the handle no longer refers to a live proxy.
    pub fn is_empty(&self) -> bool {
        self.read(|obj| obj.persistent == PersistentState::Empty)
            .unwrap_or(true)
    }

    /// Disposes of the handle. The proxy stays alive only through roots and
    /// references.
    pub fn reset(self) {
        drop(self);
    }

    fn update(&self, f: impl FnOnce(&mut ProxyObject)) {
        let Some(heap) = self.heap.upgrade() else {
            return;
        };
        let Ok(mut inner) = heap.try_borrow_mut() else {
            log::warn!("persistent handle for {} used during collection", self.proxy);
            return;
        };
        match inner.objects.get_mut(&self.proxy) {
            Some(obj) => f(obj),
            None => log::trace!("persistent handle for finalized {}", self.proxy),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&ProxyObject) -> R) -> Option<R> {
        let heap = self.heap.upgrade()?;
        let inner = heap.borrow();
        inner.objects.get(&self.proxy).map(f)
    }
}

impl Drop for Persistent {
    fn drop(&mut self) {
        self.update(|obj| {
            obj.persistent = PersistentState::Empty;
            obj.independent = false;
            obj.notified = false;
        });
    }
}

impl fmt::Debug for Persistent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistent")
            .field("proxy", &self.proxy)
            .field("weak", &self.is_weak())
            .finish()
    }
}
