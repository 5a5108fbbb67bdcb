//! Process context tying proxies to bridges.

use crate::backend::{DirectHandles, IndirectTable, ReferenceBackend};
use crate::bridge::{ProxyBridge, ReferenceBridge};
use crate::config::{process_mode, select_process_mode, BridgeConfig, ConfigError};
use crate::error::BridgeResult;
use crate::stats::BridgeStats;
use core_types::{ObjectRef, ReferenceMode, Strength};
use memory_manager::{ManagedHeap, ReferenceTable};
use once_cell::sync::OnceCell;
use script_heap::{NativeObject, ProxyId, ScriptHeapError, ScriptHeap};
use std::sync::Arc;

static PROCESS_TABLE: OnceCell<Arc<ReferenceTable>> = OnceCell::new();

/// Returns the table in `cell`, creating it over `heap` on first use.
fn shared_table(
    cell: &OnceCell<Arc<ReferenceTable>>,
    heap: &Arc<ManagedHeap>,
) -> Result<Arc<ReferenceTable>, ConfigError> {
    let table = cell.get_or_init(|| {
        log::debug!("creating process reference table");
        Arc::new(ReferenceTable::new(Arc::clone(heap)))
    });
    if !Arc::ptr_eq(table.heap(), heap) {
        return Err(ConfigError::TableHeapMismatch);
    }
    Ok(Arc::clone(table))
}

#[derive(Debug, Clone)]
enum Backend {
    Direct(DirectHandles),
    Table(IndirectTable),
}

/// One reference mode plus the optional diagnostics shared by its bridges.
///
/// Runtimes built with [`new`](Self::new) or [`for_process`](Self::for_process)
/// all run in the process reference mode, and in table mode they share the
/// single process reference table.
#[derive(Debug, Clone)]
pub struct BridgeRuntime {
    backend: Backend,
    stats: Option<Arc<BridgeStats>>,
}

impl BridgeRuntime {
    /// Creates a runtime over `heap` as described by `config`.
    ///
    /// The first runtime fixes the process reference mode; table mode uses
    /// the process reference table, created over `heap` on first use.
    ///
    /// # Errors
    ///
    /// `ModeAlreadySelected` if the process runs in another mode;
    /// `TableHeapMismatch` if the process table belongs to another heap.
    pub fn new(config: &BridgeConfig, heap: Arc<ManagedHeap>) -> Result<Self, ConfigError> {
        let backend = match select_process_mode(config.mode)? {
            ReferenceMode::DirectHandles => Backend::Direct(DirectHandles::new(heap)),
            ReferenceMode::IndirectTable => {
                Backend::Table(IndirectTable::new(shared_table(&PROCESS_TABLE, &heap)?))
            }
        };
        Ok(Self::configured(backend, config))
    }

    /// Creates a runtime with its own reference table, outside the process
    /// mode. Used by tests and simulations that need several heaps.
    #[doc(hidden)]
    pub fn isolated(config: &BridgeConfig, heap: Arc<ManagedHeap>) -> Self {
        let backend = match config.mode {
            ReferenceMode::DirectHandles => Backend::Direct(DirectHandles::new(heap)),
            ReferenceMode::IndirectTable => {
                Backend::Table(IndirectTable::new(Arc::new(ReferenceTable::new(heap))))
            }
        };
        Self::configured(backend, config)
    }

    /// Creates a runtime using global handles on `heap`, outside the process
    /// mode.
    #[doc(hidden)]
    pub fn direct(heap: Arc<ManagedHeap>) -> Self {
        Self {
            backend: Backend::Direct(DirectHandles::new(heap)),
            stats: None,
        }
    }

    /// Creates a runtime using slots in `table`, outside the process mode.
    #[doc(hidden)]
    pub fn indirect(table: Arc<ReferenceTable>) -> Self {
        Self {
            backend: Backend::Table(IndirectTable::new(table)),
            stats: None,
        }
    }

    /// Creates a runtime in the process reference mode, configured from the
    /// environment.
    pub fn for_process(heap: Arc<ManagedHeap>) -> Result<Self, ConfigError> {
        let config = BridgeConfig::from_env()?.with_mode(process_mode()?);
        log::debug!(
            "bridge runtime: mode={} diagnostics={}",
            config.mode,
            config.diagnostics
        );
        Self::new(&config, heap)
    }

    fn configured(backend: Backend, config: &BridgeConfig) -> Self {
        Self {
            backend,
            stats: config
                .diagnostics
                .then(|| Arc::new(BridgeStats::new())),
        }
    }

    /// Shares `stats` with every bridge created from now on.
    pub fn with_stats(mut self, stats: Arc<BridgeStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Returns the diagnostics counters, if enabled.
    pub fn stats(&self) -> Option<&Arc<BridgeStats>> {
        self.stats.as_ref()
    }

    /// Returns the reference mode.
    pub fn mode(&self) -> ReferenceMode {
        match self.backend {
            Backend::Direct(_) => DirectHandles::MODE,
            Backend::Table(_) => IndirectTable::MODE,
        }
    }

    /// Returns the managed heap targets live on.
    pub fn heap(&self) -> &Arc<ManagedHeap> {
        match &self.backend {
            Backend::Direct(direct) => direct.heap(),
            Backend::Table(table) => table.table().heap(),
        }
    }

    /// Returns the reference table in table mode.
    pub fn table(&self) -> Option<&Arc<ReferenceTable>> {
        match &self.backend {
            Backend::Direct(_) => None,
            Backend::Table(table) => Some(table.table()),
        }
    }

    /// Pairs `proxy` with a new bridge stored in its internal field 0.
    ///
    /// With `None` the bridge starts unattached and takes its target from a
    /// later [`attach`](Self::attach).
    ///
    /// # Errors
    ///
    /// `Script` if the proxy is gone, has no internal field, already has a
    /// persistent handle or an occupied field 0; `Handle` if the managed
    /// runtime refuses a handle.
    pub fn wrap(
        &self,
        script: &ScriptHeap,
        proxy: ProxyId,
        target: Option<ObjectRef>,
    ) -> BridgeResult<()> {
        let count = script.internal_field_count(proxy)?;
        if count == 0 {
            return Err(ScriptHeapError::FieldOutOfRange {
                proxy,
                index: 0,
                count,
            }
            .into());
        }
        let peer = script.persistent(proxy)?;
        let bridge: Box<dyn NativeObject> = match &self.backend {
            Backend::Direct(direct) => Box::new(self.build(direct.clone(), peer, target)?),
            Backend::Table(table) => Box::new(self.build(table.clone(), peer, target)?),
        };
        script.set_internal_field(proxy, 0, bridge)?;
        log::trace!("wrapped {} ({})", proxy, self.mode());
        Ok(())
    }

    /// Runs `f` on the bridge of `proxy`.
    ///
    /// The bridge is taken out of the proxy for the call, so `f` must not
    /// reach the same proxy's bridge again.
    pub fn with_bridge<R>(
        &self,
        script: &ScriptHeap,
        proxy: ProxyId,
        f: impl FnOnce(&mut dyn ProxyBridge) -> R,
    ) -> BridgeResult<R> {
        let result = match self.backend {
            Backend::Direct(_) => {
                script.with_native::<ReferenceBridge<DirectHandles>, _>(proxy, |b| f(b))
            }
            Backend::Table(_) => {
                script.with_native::<ReferenceBridge<IndirectTable>, _>(proxy, |b| f(b))
            }
        };
        Ok(result?)
    }

    /// Returns the target of `proxy`'s bridge, re-strengthening if needed.
    pub fn target(&self, script: &ScriptHeap, proxy: ProxyId) -> BridgeResult<ObjectRef> {
        self.with_bridge(script, proxy, |bridge| bridge.target())?
    }

    /// Attaches a target to `proxy`'s bridge, or re-strengthens with `None`.
    pub fn attach(
        &self,
        script: &ScriptHeap,
        proxy: ProxyId,
        target: Option<ObjectRef>,
    ) -> BridgeResult<()> {
        self.with_bridge(script, proxy, |bridge| bridge.attach(target))?
    }

    /// Downgrades `proxy`'s bridge to a weak reference.
    pub fn weaken(&self, script: &ScriptHeap, proxy: ProxyId) -> BridgeResult<()> {
        self.with_bridge(script, proxy, |bridge| bridge.weaken())
    }

    /// Returns whether `proxy`'s bridge is detached.
    pub fn is_detached(&self, script: &ScriptHeap, proxy: ProxyId) -> BridgeResult<bool> {
        self.with_bridge(script, proxy, |bridge| bridge.is_detached())
    }

    /// Returns the strength of `proxy`'s bridge.
    pub fn strength(&self, script: &ScriptHeap, proxy: ProxyId) -> BridgeResult<Strength> {
        self.with_bridge(script, proxy, |bridge| bridge.strength())
    }

    fn build<B: ReferenceBackend>(
        &self,
        backend: B,
        peer: script_heap::Persistent,
        target: Option<ObjectRef>,
    ) -> BridgeResult<ReferenceBridge<B>> {
        let stats = self.stats.clone();
        match target {
            Some(object) => ReferenceBridge::with_target(backend, peer, stats, object),
            None => Ok(ReferenceBridge::new(backend, peer, stats)),
        }
    }
}
