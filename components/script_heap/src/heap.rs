//! Proxy objects and the script-side collector.
//!
//! Reachability is modeled with roots: a proxy is reachable while a [`Root`]
//! for it is alive, while it is referenced from a reachable proxy, or while
//! its persistent handle is strong. A weak persistent handle does not keep
//! its proxy alive; instead the native in internal field 0 is notified.
//!
//! A collection runs in phases:
//! 1. mark from roots and strong persistents
//! 2. unreachable proxies with an armed weak handle that were not notified
//!    yet survive this cycle and are queued for notification
//! 3. every other unreachable proxy is finalized and its natives dropped
//! 4. with the heap borrow released, queued natives receive `on_weak`
//!
//! A proxy that stays unreachable after its notification is finalized by
//! the next collection that processes it, whether or not the handle was
//! re-armed. A proxy found reachable again forgets its notification.

use crate::error::{ScriptHeapError, ScriptResult};
use crate::native::NativeObject;
use crate::persistent::Persistent;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identity of a proxy object on the script heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(u64);

impl ProxyId {
    /// Returns the raw identity value.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proxy#{}", self.0)
    }
}

/// State of a proxy's persistent handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PersistentState {
    /// No handle
    Empty,
    /// Handle keeps the proxy alive
    Strong,
    /// Handle does not keep the proxy alive; `armed` until the notification fires
    Weak { armed: bool },
}

pub(crate) struct ProxyObject {
    pub(crate) internal_fields: Vec<Option<Box<dyn NativeObject>>>,
    pub(crate) references: Vec<ProxyId>,
    pub(crate) roots: usize,
    pub(crate) persistent: PersistentState,
    pub(crate) independent: bool,
    /// Weak notification delivered while unreachable
    pub(crate) notified: bool,
}

impl ProxyObject {
    fn new(internal_field_count: usize) -> Self {
        Self {
            internal_fields: (0..internal_field_count).map(|_| None).collect(),
            references: Vec::new(),
            roots: 0,
            persistent: PersistentState::Empty,
            independent: false,
            notified: false,
        }
    }

    fn is_armed(&self) -> bool {
        matches!(self.persistent, PersistentState::Weak { armed: true })
    }
}

#[derive(Default)]
pub(crate) struct HeapInner {
    pub(crate) objects: HashMap<ProxyId, ProxyObject>,
    next_id: u64,
    collections: usize,
}

impl HeapInner {
    fn object_mut(&mut self, proxy: ProxyId) -> ScriptResult<&mut ProxyObject> {
        self.objects
            .get_mut(&proxy)
            .ok_or(ScriptHeapError::UnknownProxy(proxy))
    }

    fn mark_from(&self, roots: impl IntoIterator<Item = ProxyId>, marked: &mut HashSet<ProxyId>) {
        let mut pending: Vec<ProxyId> = roots.into_iter().collect();
        while let Some(id) = pending.pop() {
            if !marked.insert(id) {
                continue;
            }
            if let Some(obj) = self.objects.get(&id) {
                pending.extend(obj.references.iter().copied());
            }
        }
    }
}

/// Outcome of one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionReport {
    /// Weak notifications delivered
    pub notified: usize,
    /// Proxies finalized
    pub finalized: usize,
}

/// Scoped root keeping a proxy reachable from script code.
#[must_use = "dropping a Root makes the proxy unreachable immediately"]
pub struct Root {
    heap: Weak<RefCell<HeapInner>>,
    proxy: ProxyId,
}

impl Root {
    /// Returns the rooted proxy.
    pub fn proxy(&self) -> ProxyId {
        self.proxy
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        if let Some(heap) = self.heap.upgrade() {
            if let Some(obj) = heap.borrow_mut().objects.get_mut(&self.proxy) {
                obj.roots = obj.roots.saturating_sub(1);
            }
        }
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("proxy", &self.proxy).finish()
    }
}

/// The script heap.
#[derive(Clone, Default)]
pub struct ScriptHeap {
    inner: Rc<RefCell<HeapInner>>,
}

impl ScriptHeap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a proxy with `internal_field_count` empty internal fields.
    ///
    /// The proxy starts out rooted by the returned [`Root`].
    pub fn new_proxy(&self, internal_field_count: usize) -> Root {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let proxy = ProxyId(inner.next_id);
        let mut object = ProxyObject::new(internal_field_count);
        object.roots = 1;
        inner.objects.insert(proxy, object);
        Root {
            heap: Rc::downgrade(&self.inner),
            proxy,
        }
    }

    /// Roots an existing proxy.
    pub fn root(&self, proxy: ProxyId) -> ScriptResult<Root> {
        self.inner.borrow_mut().object_mut(proxy)?.roots += 1;
        Ok(Root {
            heap: Rc::downgrade(&self.inner),
            proxy,
        })
    }

    /// Records a reference from one proxy to another.
    pub fn add_reference(&self, from: ProxyId, to: ProxyId) -> ScriptResult<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.objects.contains_key(&to) {
            return Err(ScriptHeapError::UnknownProxy(to));
        }
        inner.object_mut(from)?.references.push(to);
        Ok(())
    }

    /// Creates the persistent handle of a proxy.
    ///
    /// The handle starts strong. Each proxy has at most one.
    pub fn persistent(&self, proxy: ProxyId) -> ScriptResult<Persistent> {
        let mut inner = self.inner.borrow_mut();
        let obj = inner.object_mut(proxy)?;
        if obj.persistent != PersistentState::Empty {
            return Err(ScriptHeapError::PersistentExists(proxy));
        }
        obj.persistent = PersistentState::Strong;
        Ok(Persistent::new(Rc::downgrade(&self.inner), proxy))
    }

    /// Returns the number of internal fields of a proxy.
    pub fn internal_field_count(&self, proxy: ProxyId) -> ScriptResult<usize> {
        Ok(self.inner.borrow_mut().object_mut(proxy)?.internal_fields.len())
    }

    /// Stores a native in an empty internal field.
    pub fn set_internal_field(
        &self,
        proxy: ProxyId,
        index: usize,
        native: Box<dyn NativeObject>,
    ) -> ScriptResult<()> {
        let result = {
            let mut inner = self.inner.borrow_mut();
            match inner.object_mut(proxy) {
                Err(err) => Err((native, err)),
                Ok(obj) => {
                    let count = obj.internal_fields.len();
                    match obj.internal_fields.get_mut(index) {
                        None => Err((
                            native,
                            ScriptHeapError::FieldOutOfRange {
                                proxy,
                                index,
                                count,
                            },
                        )),
                        Some(Some(_)) => Err((native, ScriptHeapError::FieldOccupied { proxy, index })),
                        Some(slot) => {
                            *slot = Some(native);
                            Ok(())
                        }
                    }
                }
            }
        };
        // A rejected native is dropped outside the borrow; it may own a
        // persistent handle on this heap.
        result.map_err(|(_, err)| err)
    }

    /// Runs `f` on the native in internal field 0, downcast to `T`.
    ///
    /// The native is taken out of the proxy for the duration of the call, so
    /// `f` may freely use the heap (and the proxy's persistent handle).
    pub fn with_native<T, R>(&self, proxy: ProxyId, f: impl FnOnce(&mut T) -> R) -> ScriptResult<R>
    where
        T: NativeObject,
    {
        let mut native = self.take_field(proxy, 0)?;
        let result = match native.as_any_mut().downcast_mut::<T>() {
            Some(typed) => Ok(f(typed)),
            None => Err(ScriptHeapError::NativeTypeMismatch(proxy)),
        };
        self.restore_field(proxy, 0, native);
        result
    }

    /// Returns whether the proxy has not been finalized.
    pub fn is_alive(&self, proxy: ProxyId) -> bool {
        self.inner.borrow().objects.contains_key(&proxy)
    }

    /// Returns the number of live proxies.
    pub fn live_count(&self) -> usize {
        self.inner.borrow().objects.len()
    }

    /// Returns the number of collections performed.
    pub fn collection_count(&self) -> usize {
        self.inner.borrow().collections
    }

    /// Performs a full collection.
    pub fn collect_garbage(&self) -> CollectionReport {
        self.collect(false)
    }

    /// Performs a minor collection.
    ///
    /// Only proxies whose persistent handle was marked independent are
    /// notified or finalized; other unreachable proxies wait for a full
    /// collection.
    pub fn scavenge(&self) -> CollectionReport {
        self.collect(true)
    }

    fn take_field(&self, proxy: ProxyId, index: usize) -> ScriptResult<Box<dyn NativeObject>> {
        let mut inner = self.inner.borrow_mut();
        let obj = inner.object_mut(proxy)?;
        let count = obj.internal_fields.len();
        obj.internal_fields
            .get_mut(index)
            .ok_or(ScriptHeapError::FieldOutOfRange {
                proxy,
                index,
                count,
            })?
            .take()
            .ok_or(ScriptHeapError::FieldEmpty { proxy, index })
    }

    fn restore_field(&self, proxy: ProxyId, index: usize, native: Box<dyn NativeObject>) {
        let leftover = {
            let mut inner = self.inner.borrow_mut();
            match inner
                .objects
                .get_mut(&proxy)
                .and_then(|obj| obj.internal_fields.get_mut(index))
            {
                Some(slot) if slot.is_none() => {
                    *slot = Some(native);
                    None
                }
                _ => Some(native),
            }
        };
        // Proxy finalized or field replaced meanwhile; drop outside the borrow.
        drop(leftover);
    }

    fn collect(&self, minor: bool) -> CollectionReport {
        let (pending, notified, finalized, finalized_count) = {
            let mut inner = self.inner.borrow_mut();
            inner.collections += 1;

            let roots: Vec<ProxyId> = inner
                .objects
                .iter()
                .filter(|(_, obj)| obj.roots > 0 || obj.persistent == PersistentState::Strong)
                .map(|(id, _)| *id)
                .collect();
            let mut reachable = HashSet::new();
            inner.mark_from(roots, &mut reachable);

            let mut unreachable: Vec<ProxyId> = inner
                .objects
                .keys()
                .filter(|id| !reachable.contains(*id))
                .copied()
                .collect();
            unreachable.sort_unstable();

            let mut retained = Vec::new();
            let mut notify = Vec::new();
            for id in &unreachable {
                let obj = &inner.objects[id];
                if minor && !obj.independent {
                    retained.push(*id);
                } else if obj.is_armed() && !obj.notified {
                    retained.push(*id);
                    notify.push(*id);
                }
            }
            let mut surviving = reachable.clone();
            inner.mark_from(retained, &mut surviving);

            for (id, obj) in inner.objects.iter_mut() {
                if reachable.contains(id) {
                    obj.notified = false;
                }
            }

            let mut pending: Vec<(ProxyId, Box<dyn NativeObject>)> = Vec::new();
            for id in &notify {
                if let Some(obj) = inner.objects.get_mut(id) {
                    obj.persistent = PersistentState::Weak { armed: false };
                    obj.notified = true;
                    if let Some(native) = obj.internal_fields.first_mut().and_then(Option::take) {
                        pending.push((*id, native));
                    }
                }
            }

            let mut finalized: Vec<Box<dyn NativeObject>> = Vec::new();
            let mut finalized_count = 0;
            for id in unreachable.iter().filter(|id| !surviving.contains(*id)) {
                if let Some(obj) = inner.objects.remove(id) {
                    finalized_count += 1;
                    finalized.extend(obj.internal_fields.into_iter().flatten());
                }
            }

            log::debug!(
                "script {} #{}: notified={} finalized={}",
                if minor { "scavenge" } else { "gc" },
                inner.collections,
                notify.len(),
                finalized_count
            );
            (pending, notify.len(), finalized, finalized_count)
        };

        for (proxy, mut native) in pending {
            log::trace!("weak notification for {}", proxy);
            native.on_weak();
            self.restore_field(proxy, 0, native);
        }
        drop(finalized);

        CollectionReport {
            notified,
            finalized: finalized_count,
        }
    }
}

impl fmt::Debug for ScriptHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ScriptHeap")
            .field("proxies", &inner.objects.len())
            .field("collections", &inner.collections)
            .finish()
    }
}
