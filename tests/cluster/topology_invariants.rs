//! Topology Invariant Tests
//!
//! - Exactly `dnode_nums` descriptors
//! - Ports strictly increase by `port_step`
//! - Dnodes 1..=mnode_nums are mnode-only
//! - Invalid numeric input is rejected

use proptest::prelude::*;
use tsdb_harness::{build_topology, HarnessError, NodeRole, TopologyParams};

fn params(dnodes: i64, mnodes: i64, start_port: i64, port_step: i64) -> TopologyParams {
    TopologyParams {
        dnode_nums: dnodes,
        mnode_nums: mnodes,
        start_port,
        port_step,
        hostname: "host".to_string(),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn default_cluster_node_three_endpoints() {
    let nodes = build_topology(&params(5, 0, 6030, 100)).unwrap();
    let node3 = &nodes[2];
    assert_eq!(node3.server_port(), 6230);
    assert_eq!(node3.second_ep(), "host:6130");
    assert_eq!(node3.cfg("serverPort"), Some("6230"));
    assert_eq!(node3.cfg("fqdn"), Some("host"));
}

#[test]
fn default_params_describe_five_dnodes() {
    let defaults = TopologyParams::default();
    assert_eq!(defaults.dnode_nums, 5);
    assert_eq!(defaults.mnode_nums, 0);
    assert_eq!(defaults.start_port, 6030);
    assert_eq!(defaults.port_step, 100);
    assert!(!defaults.hostname.is_empty());
}

#[test]
fn zero_mnodes_marks_no_node_mnode_only() {
    let nodes = build_topology(&params(5, 0, 6030, 100)).unwrap();
    assert!(nodes.iter().all(|n| n.role() == NodeRole::Data));
}

#[test]
fn topology_is_deterministic() {
    let p = params(4, 1, 7000, 10);
    assert_eq!(build_topology(&p).unwrap(), build_topology(&p).unwrap());
}

#[test]
fn non_positive_counts_rejected() {
    for (d, m) in [(0, 0), (-1, 0), (3, -1)] {
        let err = build_topology(&params(d, m, 6030, 100)).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidTopology { .. }));
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn descriptors_follow_port_and_role_rules(
        dnodes in 1i64..40,
        mnode_frac in 0.0f64..=1.0,
        start_port in 1024i64..20000,
        port_step in 1i64..1000,
    ) {
        let mnodes = ((dnodes as f64) * mnode_frac).floor() as i64;
        let nodes = build_topology(&params(dnodes, mnodes, start_port, port_step)).unwrap();

        prop_assert_eq!(nodes.len() as i64, dnodes);
        for (i, node) in nodes.iter().enumerate() {
            prop_assert_eq!(node.index() as usize, i + 1);
            prop_assert_eq!(node.server_port() as i64, start_port + i as i64 * port_step);
            prop_assert_eq!(node.first_ep(), format!("host:{}", start_port));
            prop_assert_eq!(node.second_ep(), format!("host:{}", start_port + port_step));
            let expected_role = if mnodes > 0 && (i as i64) < mnodes {
                NodeRole::MnodeOnly
            } else {
                NodeRole::Data
            };
            prop_assert_eq!(node.role(), expected_role);
        }
        for pair in nodes.windows(2) {
            prop_assert_eq!(
                pair[1].server_port() as i64,
                pair[0].server_port() as i64 + port_step
            );
        }
    }
}
