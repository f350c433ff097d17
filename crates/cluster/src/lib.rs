//! Cluster orchestration
//!
//! - Topology: dnode descriptors from cluster-size parameters
//! - Deploy: per-dnode directories and config files
//! - Bootstrap: `create dnode` registration and readiness polling
//! - Topic / UDF: the DDL test cases issue before consuming

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod deploy;
pub mod topic;
pub mod topology;
pub mod udf;

pub use bootstrap::{
    await_ready, node_states, register_nodes, Bootstrapper, NodeReadiness, Readiness, READY_STATUS,
};
pub use deploy::{node_cfg_contents, write_node_configs};
pub use topic::{create_topic, drop_topic, drop_topics, validate_identifier};
pub use topology::{build_topology, ClusterDescriptor, NodeDescriptor, NodeRole, TopologyParams};
pub use udf::{create_udf_function, locate_udf_library, project_root, UdfSpec};
