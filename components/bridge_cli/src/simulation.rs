//! Proxy churn simulation
//!
//! Creates proxies paired with managed objects, lets most of them become
//! unreachable, and runs both collectors for a number of cycles.
//!
//! Retained proxies spend every other cycle unrooted. The script collector
//! notifies them and their bridges go weak; afterwards they are rooted again
//! and their targets touched, which re-strengthens the bridges. Touching
//! normally happens before the managed collector runs. With
//! `managed_first` it happens after, so the targets of weak bridges are
//! already reclaimed and the lookups come back stale.

use crate::error::{CliError, CliResult};
use core_types::ReferenceMode;
use memory_manager::ManagedHeap;
use reference_bridge::{BridgeConfig, BridgeError, BridgeRuntime, StatsSnapshot};
use script_heap::{ProxyId, Root, ScriptHeap};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Simulation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationOptions {
    /// Reference mode of every bridge
    pub mode: ReferenceMode,
    /// Proxies to create
    pub proxies: usize,
    /// Collection cycles to run
    pub cycles: usize,
    /// Keep every Nth proxy rooted; 0 keeps none
    pub retain_every: usize,
    /// Global handle limit of the managed heap
    pub global_capacity: Option<usize>,
    /// Run the managed collector before unrooted proxies are touched again
    pub managed_first: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            mode: ReferenceMode::DirectHandles,
            proxies: 1000,
            cycles: 3,
            retain_every: 10,
            global_capacity: None,
            managed_first: false,
        }
    }
}

/// What happened during a simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    /// Reference mode used
    pub mode: ReferenceMode,
    /// Proxies created
    pub proxies_created: usize,
    /// Proxies left without a bridge because a handle was refused
    pub wrap_failures: usize,
    /// Weak notifications delivered by the script collector
    pub notifications: usize,
    /// Proxies finalized by the script collector
    pub finalized_proxies: usize,
    /// Managed objects reclaimed by the managed collector
    pub reclaimed_objects: usize,
    /// Target lookups that re-strengthened a weak bridge
    pub reattached: usize,
    /// Target lookups that found the target collected
    pub stale_targets: usize,
    /// Managed objects alive at the end
    pub live_managed_objects: usize,
    /// Proxies alive at the end
    pub live_script_objects: usize,
    /// Global handles in use at the end
    pub global_refs: usize,
    /// Reference table slots in use at the end (table mode only)
    pub table_slots: Option<usize>,
    /// Bridge counters at the end (debug builds only)
    pub bridges: Option<StatsSnapshot>,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mode:                 {}", self.mode)?;
        writeln!(f, "proxies created:      {}", self.proxies_created)?;
        writeln!(f, "wrap failures:        {}", self.wrap_failures)?;
        writeln!(f, "notifications:        {}", self.notifications)?;
        writeln!(f, "finalized proxies:    {}", self.finalized_proxies)?;
        writeln!(f, "reclaimed objects:    {}", self.reclaimed_objects)?;
        writeln!(f, "reattached:           {}", self.reattached)?;
        writeln!(f, "stale targets:        {}", self.stale_targets)?;
        writeln!(f, "live managed objects: {}", self.live_managed_objects)?;
        writeln!(f, "live script objects:  {}", self.live_script_objects)?;
        writeln!(f, "global refs:          {}", self.global_refs)?;
        if let Some(slots) = self.table_slots {
            writeln!(f, "table slots:          {}", slots)?;
        }
        if let Some(bridges) = self.bridges {
            writeln!(
                f,
                "bridges:              {} live, {} detached",
                bridges.total, bridges.detached
            )?;
        }
        Ok(())
    }
}

/// One simulation over a fresh pair of heaps
pub struct Simulation {
    options: SimulationOptions,
    managed: Arc<ManagedHeap>,
    script: ScriptHeap,
    runtime: BridgeRuntime,
}

impl Simulation {
    /// Sets up both heaps and a runtime in the process reference mode.
    ///
    /// Diagnostics follow the environment.
    ///
    /// # Errors
    ///
    /// `InvalidOption` when no proxies are requested; `Config` when the
    /// environment is malformed or the process runs in another mode.
    pub fn new(options: SimulationOptions) -> CliResult<Self> {
        Self::setup(options, BridgeRuntime::new)
    }

    /// Like [`new`](Self::new), but with a runtime outside the process mode
    /// and reference table, so one process may run many simulations.
    #[doc(hidden)]
    pub fn standalone(options: SimulationOptions) -> CliResult<Self> {
        Self::setup(options, |config, heap| Ok(BridgeRuntime::isolated(config, heap)))
    }

    fn setup(
        options: SimulationOptions,
        runtime: impl FnOnce(
            &BridgeConfig,
            Arc<ManagedHeap>,
        ) -> Result<BridgeRuntime, reference_bridge::ConfigError>,
    ) -> CliResult<Self> {
        if options.proxies == 0 {
            return Err(CliError::InvalidOption(
                "--proxies must be at least 1".to_string(),
            ));
        }
        let managed = Arc::new(match options.global_capacity {
            Some(capacity) => ManagedHeap::with_global_capacity(capacity),
            None => ManagedHeap::new(),
        });
        let config = BridgeConfig::from_env()?.with_mode(options.mode);
        let runtime = runtime(&config, Arc::clone(&managed))?;
        Ok(Self {
            options,
            managed,
            script: ScriptHeap::new(),
            runtime,
        })
    }

    /// Runs the simulation to completion.
    pub fn run(self) -> CliResult<SimulationReport> {
        let mut report = SimulationReport {
            mode: self.options.mode,
            proxies_created: 0,
            wrap_failures: 0,
            notifications: 0,
            finalized_proxies: 0,
            reclaimed_objects: 0,
            reattached: 0,
            stale_targets: 0,
            live_managed_objects: 0,
            live_script_objects: 0,
            global_refs: 0,
            table_slots: None,
            bridges: None,
        };

        let mut retained = self.populate(&mut report)?;
        log::info!(
            "created {} proxies ({} retained, {} without bridge)",
            report.proxies_created,
            retained.len(),
            report.wrap_failures
        );

        for cycle in 1..=self.options.cycles {
            let unrooted = cycle % 2 == 1;
            let proxies: Vec<ProxyId> = retained.iter().map(Root::proxy).collect();
            if unrooted {
                retained.clear();
            }

            let collected = self.script.collect_garbage();
            report.notifications += collected.notified;
            report.finalized_proxies += collected.finalized;

            if unrooted {
                retained = proxies
                    .iter()
                    .map(|proxy| self.script.root(*proxy))
                    .collect::<Result<_, _>>()
                    .map_err(BridgeError::from)?;
            }
            if !self.options.managed_first {
                self.touch(&proxies, &mut report)?;
            }
            report.reclaimed_objects += self.managed.collect_garbage();
            if self.options.managed_first {
                self.touch(&proxies, &mut report)?;
            }

            log::debug!(
                "cycle {}: {} proxies, {} managed objects",
                cycle,
                self.script.live_count(),
                self.managed.live_object_count()
            );
        }

        report.live_managed_objects = self.managed.live_object_count();
        report.live_script_objects = self.script.live_count();
        report.global_refs = self.managed.global_ref_count();
        report.table_slots = self.runtime.table().map(|table| table.len());
        report.bridges = self.bridge_counts();
        Ok(report)
    }

    /// Looks up the target of every proxy in `proxies`.
    fn touch(&self, proxies: &[ProxyId], report: &mut SimulationReport) -> CliResult<()> {
        for proxy in proxies {
            let (was_detached, target) = self.runtime.with_bridge(&self.script, *proxy, |bridge| {
                (bridge.is_detached(), bridge.target())
            })?;
            match target {
                Ok(_) if was_detached => report.reattached += 1,
                Ok(_) => {}
                Err(BridgeError::TargetCollected) => report.stale_targets += 1,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Creates the proxies; returns the roots of the retained ones.
    fn populate(&self, report: &mut SimulationReport) -> CliResult<Vec<Root>> {
        let mut retained = Vec::new();
        for index in 0..self.options.proxies {
            let root = self.script.new_proxy(1);
            let target = self.managed.allocate("Widget");
            report.proxies_created += 1;

            match self
                .runtime
                .wrap(&self.script, root.proxy(), Some(target.object()))
            {
                Ok(()) => {}
                Err(BridgeError::Handle(e)) => {
                    log::warn!("{} left without bridge: {}", root.proxy(), e);
                    report.wrap_failures += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            if self.options.retain_every > 0 && index % self.options.retain_every == 0 {
                retained.push(root);
            }
        }
        Ok(retained)
    }

    #[cfg(debug_assertions)]
    fn bridge_counts(&self) -> Option<StatsSnapshot> {
        self.runtime.stats().map(|stats| stats.snapshot())
    }

    #[cfg(not(debug_assertions))]
    fn bridge_counts(&self) -> Option<StatsSnapshot> {
        None
    }
}
