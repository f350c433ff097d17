//! Cluster Orchestration Tests
//!
//! Topology synthesis, dnode config files, registration and readiness polling.

#[path = "../common/mod.rs"]
mod common;

mod topology_invariants;
