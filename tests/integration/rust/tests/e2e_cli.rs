//! End-to-End CLI Integration Tests
//!
//! Runs the bridge-sim simulation through the bridge_cli library API. This
//! is the highest level integration test: options in, report out.

use bridge_cli::{Simulation, SimulationOptions};
use integration_tests::MODES;

fn run(options: SimulationOptions) -> bridge_cli::SimulationReport {
    Simulation::standalone(options)
        .expect("Simulation setup failed")
        .run()
        .expect("Simulation failed")
}

/// Test: no leaks and no premature collection in either mode
#[test]
fn test_e2e_no_leaks_no_premature_collection() {
    for mode in MODES {
        let report = run(SimulationOptions {
            mode,
            proxies: 200,
            cycles: 4,
            retain_every: 4,
            global_capacity: None,
            managed_first: false,
        });

        assert_eq!(report.proxies_created, 200);
        assert_eq!(report.stale_targets, 0, "{mode}");
        assert_eq!(report.live_script_objects, 50, "{mode}");
        assert_eq!(report.live_managed_objects, 50, "{mode}");
        assert_eq!(report.finalized_proxies, 150, "{mode}");
        assert_eq!(report.reclaimed_objects, 150, "{mode}");
        // Retained proxies go weak on cycles 1 and 3 and are re-attached.
        assert_eq!(report.reattached, 100, "{mode}");
    }
}

/// Test: bridge counters agree with the surviving proxies
#[cfg(debug_assertions)]
#[test]
fn test_e2e_bridge_counters() {
    for mode in MODES {
        let report = run(SimulationOptions {
            mode,
            proxies: 30,
            cycles: 2,
            retain_every: 3,
            global_capacity: None,
            managed_first: false,
        });

        let bridges = report.bridges.expect("diagnostics enabled in debug builds");
        assert_eq!(bridges.total, 10, "{mode}");
        assert_eq!(bridges.detached, 0, "{mode}");
    }
}

/// Test: a single cycle only notifies, the next one finalizes
#[test]
fn test_e2e_two_phase_reclamation() {
    let one = run(SimulationOptions {
        proxies: 10,
        cycles: 1,
        retain_every: 0,
        ..SimulationOptions::default()
    });
    assert_eq!(one.notifications, 10);
    assert_eq!(one.finalized_proxies, 0);
    assert_eq!(one.reclaimed_objects, 10);
    assert_eq!(one.live_script_objects, 10);

    let two = run(SimulationOptions {
        proxies: 10,
        cycles: 2,
        retain_every: 0,
        ..SimulationOptions::default()
    });
    assert_eq!(two.finalized_proxies, 10);
    assert_eq!(two.live_script_objects, 0);
    assert_eq!(two.global_refs, 0);
}

/// Test: a managed collection between notification and lookup leaves the
/// lookups stale without collecting the proxies early
#[test]
fn test_e2e_managed_collector_first() {
    for mode in MODES {
        let report = run(SimulationOptions {
            mode,
            proxies: 12,
            cycles: 2,
            retain_every: 3,
            global_capacity: None,
            managed_first: true,
        });

        assert_eq!(report.reclaimed_objects, 12, "{mode}");
        // Four lookups per cycle, both after the targets were reclaimed.
        assert_eq!(report.stale_targets, 8, "{mode}");
        assert_eq!(report.live_script_objects, 4, "{mode}");
        assert_eq!(report.live_managed_objects, 0, "{mode}");
    }
}
