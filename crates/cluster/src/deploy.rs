//! Per-dnode config files
//!
//! Lays out `<work>/dnode<N>/{cfg,data,log}` and writes `cfg/taos.cfg` from the
//! node's config entries plus its own data and log directories.

use crate::topology::{ClusterDescriptor, NodeDescriptor};
use harness_core::{DeployMode, NodePaths, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Full config file content for one dnode deployed under `work_dir`.
pub fn node_cfg_contents(node: &NodeDescriptor, work_dir: &Path) -> String {
    let paths = NodePaths::new(work_dir, node.index());
    let mut out = node.render_cfg();
    out.push_str(&format!("dataDir {}\n", paths.data_dir().display()));
    out.push_str(&format!("logDir {}\n", paths.log_dir().display()));
    out
}

/// Create every dnode's directories and config file.
///
/// Returns the written config file paths in node order. Remote clusters are
/// laid out by their own deployer, so nothing is written for them.
pub fn write_node_configs(cluster: &ClusterDescriptor, work_dir: &Path) -> Result<Vec<PathBuf>> {
    if cluster.deploy == DeployMode::Remote {
        info!(target: "harness::topology", "Remote deployment, skipping local dnode configs");
        return Ok(Vec::new());
    }

    let mut written = Vec::with_capacity(cluster.len());
    for node in cluster.nodes() {
        let paths = NodePaths::new(work_dir, node.index());
        paths.create_directories()?;
        std::fs::write(paths.cfg_file(), node_cfg_contents(node, work_dir))?;
        written.push(paths.cfg_file());
    }

    info!(
        target: "harness::topology",
        dnodes = written.len(),
        work_dir = %work_dir.display(),
        "Wrote dnode configs"
    );
    Ok(written)
}
