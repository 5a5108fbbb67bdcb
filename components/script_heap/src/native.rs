//! Native objects stored in proxy internal fields.

use std::any::Any;

/// A native value wrapped by a proxy.
///
/// The object in internal field 0 receives the weak notification of the
/// proxy's persistent handle. The callback runs during a collection, after
/// the heap borrow has been released. It must not allocate proxies, run
/// script code or touch the proxy's internal fields.
pub trait NativeObject: Any {
    /// Called when the proxy is found unreachable while its persistent
    /// handle is weak. Delivered once per `set_weak`.
    fn on_weak(&mut self);

    /// Upcast for typed access through [`crate::ScriptHeap::with_native`].
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
