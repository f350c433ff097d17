//! Cluster topology
//!
//! Turns cluster-size parameters into an ordered list of [`NodeDescriptor`]s.
//! Dnode `N` (1-based) listens on `start_port + (N - 1) * port_step`. Every
//! dnode joins through `firstEp = host:start_port` (the seed) and falls back to
//! `secondEp = host:start_port + port_step`. Dnodes `1..=mnode_nums` are
//! mnode-only and get `supportVnodes 0`.

use harness_core::{ClusterSettings, DeployMode, HarnessError, Result};
use std::fmt;
use tracing::debug;

/// Highest valid server port.
const MAX_PORT: i64 = u16::MAX as i64;

/// Inputs to [`build_topology`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyParams {
    /// Number of dnodes
    pub dnode_nums: i64,
    /// Number of mnode-only dnodes
    pub mnode_nums: i64,
    /// Server port of dnode 1
    pub start_port: i64,
    /// Port distance between consecutive dnodes
    pub port_step: i64,
    /// FQDN shared by all dnodes
    pub hostname: String,
}

impl Default for TopologyParams {
    fn default() -> Self {
        TopologyParams::from(&ClusterSettings::default())
    }
}

impl From<&ClusterSettings> for TopologyParams {
    fn from(settings: &ClusterSettings) -> Self {
        TopologyParams {
            dnode_nums: settings.dnode_nums,
            mnode_nums: settings.mnode_nums,
            start_port: settings.start_port,
            port_step: settings.port_step,
            hostname: settings.hostname.clone(),
        }
    }
}

/// Whether a dnode hosts data vnodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Regular dnode, hosts vnodes
    Data,
    /// Management-only dnode, `supportVnodes 0`
    MnodeOnly,
}

/// Static configuration of one dnode.
///
/// Created once by [`build_topology`] and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    index: u32,
    hostname: String,
    server_port: u16,
    role: NodeRole,
    extra_cfg: Vec<(String, String)>,
}

impl NodeDescriptor {
    /// 1-based sequence number
    pub fn index(&self) -> u32 {
        self.index
    }

    /// FQDN
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Server port
    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    /// Role
    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// `host:port` identity used by `create dnode`
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.hostname, self.server_port)
    }

    /// Seed endpoint every dnode joins through
    pub fn first_ep(&self) -> &str {
        self.cfg("firstEp").unwrap_or_default()
    }

    /// Fallback join endpoint
    pub fn second_ep(&self) -> &str {
        self.cfg("secondEp").unwrap_or_default()
    }

    /// Look up a config entry
    pub fn cfg(&self, key: &str) -> Option<&str> {
        self.extra_cfg
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Config entries in insertion order
    pub fn extra_cfg(&self) -> &[(String, String)] {
        &self.extra_cfg
    }

    /// Render the config entries as `key value` lines.
    pub fn render_cfg(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.extra_cfg {
            out.push_str(key);
            out.push(' ');
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dnode{}({})", self.index, self.endpoint())
    }
}

fn check_params(params: &TopologyParams) -> Result<()> {
    if params.dnode_nums <= 0 {
        return Err(HarnessError::InvalidTopology {
            field: "dnode_nums",
            value: params.dnode_nums,
        });
    }
    if params.mnode_nums < 0 || params.mnode_nums > params.dnode_nums {
        return Err(HarnessError::InvalidTopology {
            field: "mnode_nums",
            value: params.mnode_nums,
        });
    }
    if params.start_port <= 0 || params.start_port > MAX_PORT {
        return Err(HarnessError::InvalidTopology {
            field: "start_port",
            value: params.start_port,
        });
    }
    if params.port_step <= 0 {
        return Err(HarnessError::InvalidTopology {
            field: "port_step",
            value: params.port_step,
        });
    }
    // secondEp is start_port + port_step even for a single-dnode cluster
    let second_port = params.start_port.checked_add(params.port_step);
    let last_port = (params.dnode_nums - 1)
        .checked_mul(params.port_step)
        .and_then(|span| span.checked_add(params.start_port));
    match (second_port, last_port) {
        (Some(second), Some(last)) if second <= MAX_PORT && last <= MAX_PORT => Ok(()),
        _ => Err(HarnessError::InvalidTopology {
            field: "port_step",
            value: params.port_step,
        }),
    }
}

/// Compute the dnode list for a cluster.
///
/// Pure: no I/O and no side effects. Fails only on invalid numeric input.
pub fn build_topology(params: &TopologyParams) -> Result<Vec<NodeDescriptor>> {
    check_params(params)?;

    let host = &params.hostname;
    let first_ep = format!("{}:{}", host, params.start_port);
    let second_ep = format!("{}:{}", host, params.start_port + params.port_step);

    let mut nodes = Vec::with_capacity(params.dnode_nums as usize);
    for num in 1..=params.dnode_nums {
        let server_port = (params.start_port + (num - 1) * params.port_step) as u16;
        let role = if params.mnode_nums != 0 && num <= params.mnode_nums {
            NodeRole::MnodeOnly
        } else {
            NodeRole::Data
        };

        let mut extra_cfg = vec![
            ("firstEp".to_string(), first_ep.clone()),
            ("fqdn".to_string(), host.clone()),
            ("serverPort".to_string(), server_port.to_string()),
            ("secondEp".to_string(), second_ep.clone()),
        ];
        if role == NodeRole::MnodeOnly {
            extra_cfg.push(("supportVnodes".to_string(), "0".to_string()));
        }

        nodes.push(NodeDescriptor {
            index: num as u32,
            hostname: host.clone(),
            server_port,
            role,
            extra_cfg,
        });
    }

    debug!(
        target: "harness::topology",
        dnodes = params.dnode_nums,
        mnodes = params.mnode_nums,
        first_ep = %first_ep,
        "Built cluster topology"
    );
    Ok(nodes)
}

/// Dnode list plus cluster-wide parameters.
///
/// The first node is the bootstrap seed; it is the cluster's implicit first
/// member and is never registered with `create dnode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDescriptor {
    nodes: Vec<NodeDescriptor>,
    /// Replica count for created databases
    pub replica: u32,
    /// Number of mnode-only dnodes
    pub mnode_count: u32,
    /// Deployment mode
    pub deploy: DeployMode,
    /// Run binaries under valgrind memcheck
    pub fault_injection: bool,
}

impl ClusterDescriptor {
    /// Build the topology and cluster flags from settings.
    pub fn from_settings(settings: &ClusterSettings) -> Result<Self> {
        let nodes = build_topology(&TopologyParams::from(settings))?;
        Ok(ClusterDescriptor {
            nodes,
            replica: settings.replica,
            mnode_count: settings.mnode_nums as u32,
            deploy: settings.deploy,
            fault_injection: settings.fault_injection,
        })
    }

    /// All dnodes in index order
    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    /// Number of dnodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a cluster has at least its seed
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dnode 1
    pub fn seed(&self) -> &NodeDescriptor {
        &self.nodes[0]
    }

    /// Dnodes 2..=N, the ones registered with `create dnode`
    pub fn joiners(&self) -> &[NodeDescriptor] {
        &self.nodes[1..]
    }
}
