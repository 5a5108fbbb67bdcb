//! Unit test runner for the reference_bridge component

mod stats_test;
