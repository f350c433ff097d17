//! Harness configuration via `harness.toml`
//!
//! Every field has a default, so an empty file (or no file) describes a
//! five-dnode local cluster on port 6030 with a step of 100.

use crate::error::{HarnessError, Result};
use crate::paths::HarnessPaths;
use crate::poll::PollPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "harness.toml";

/// Where dnodes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// All dnodes on this host
    #[default]
    Local,
    /// Dnodes deployed to remote hosts by an external deployer
    Remote,
}

/// Cluster shape and deployment flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
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
    /// Replica count for created databases
    pub replica: u32,
    /// Deployment mode
    pub deploy: DeployMode,
    /// Run binaries under valgrind memcheck
    pub fault_injection: bool,
}

/// Local hostname, `localhost` when it cannot be determined.
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

impl Default for ClusterSettings {
    fn default() -> Self {
        ClusterSettings {
            dnode_nums: 5,
            mnode_nums: 0,
            start_port: 6030,
            port_step: 100,
            hostname: local_hostname(),
            replica: 1,
            deploy: DeployMode::Local,
            fault_injection: false,
        }
    }
}

/// Directories of the build under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Directory containing `build/bin`
    pub build_path: PathBuf,
    /// Client config directory passed to `-c`
    pub cfg_path: PathBuf,
    /// Root under which `dnode<N>/` directories are created
    pub work_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            build_path: PathBuf::from("debug"),
            cfg_path: PathBuf::from("sim/psim/cfg"),
            work_dir: PathBuf::from("sim"),
        }
    }
}

/// Polling bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Cluster readiness polling
    pub readiness: PollPolicy,
    /// Consumer result collection
    pub results: PollPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            readiness: PollPolicy::READINESS,
            results: PollPolicy::RESULTS,
        }
    }
}

/// Consumer simulator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TmqSettings {
    /// Database holding the consumer registry tables
    pub cdb_name: String,
    /// Ceiling after which a running simulator is killed
    pub sim_timeout_secs: u64,
}

impl Default for TmqSettings {
    fn default() -> Self {
        TmqSettings {
            cdb_name: "cdb".to_string(),
            sim_timeout_secs: 600,
        }
    }
}

/// Harness configuration loaded from `harness.toml`.
///
/// # Example
///
/// ```toml
/// [cluster]
/// dnode_nums = 3
/// mnode_nums = 1
///
/// [paths]
/// build_path = "/src/debug"
/// cfg_path = "/src/sim/psim/cfg"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Cluster shape
    pub cluster: ClusterSettings,
    /// Build directories
    pub paths: PathSettings,
    /// Polling bounds
    pub poll: PollSettings,
    /// Simulator settings
    pub tmq: TmqSettings,
}

impl HarnessConfig {
    /// Paths to binaries and result files.
    pub fn harness_paths(&self) -> HarnessPaths {
        HarnessPaths::new(&self.paths.build_path, &self.paths.cfg_path)
    }

    /// Reject topology values no cluster can be built from.
    pub fn validate(&self) -> Result<()> {
        let c = &self.cluster;
        if c.dnode_nums <= 0 {
            return Err(HarnessError::InvalidTopology {
                field: "dnode_nums",
                value: c.dnode_nums,
            });
        }
        if c.mnode_nums < 0 || c.mnode_nums > c.dnode_nums {
            return Err(HarnessError::InvalidTopology {
                field: "mnode_nums",
                value: c.mnode_nums,
            });
        }
        if c.start_port <= 0 {
            return Err(HarnessError::InvalidTopology {
                field: "start_port",
                value: c.start_port,
            });
        }
        if c.port_step <= 0 {
            return Err(HarnessError::InvalidTopology {
                field: "port_step",
                value: c.port_step,
            });
        }
        if c.hostname.is_empty() {
            return Err(HarnessError::Config("cluster.hostname is empty".to_string()));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Harness configuration
#
# [cluster] describes the dnodes to deploy. Dnode N listens on
#   start_port + (N - 1) * port_step
# and dnodes 1..=mnode_nums host no vnodes.
[cluster]
dnode_nums = 5
mnode_nums = 0
start_port = 6030
port_step = 100
# hostname = "my-host"          # defaults to the local hostname
replica = 1
deploy = "local"
fault_injection = false         # run binaries under valgrind

[paths]
build_path = "debug"
cfg_path = "sim/psim/cfg"
work_dir = "sim"

[poll.readiness]
attempts = 5
interval_ms = 1000

[poll.results]
attempts = 60
interval_ms = 5000

[tmq]
cdb_name = "cdb"
sim_timeout_secs = 600
"#
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            HarnessError::Config(msg) => {
                HarnessError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: HarnessConfig = toml::from_str(content)
            .map_err(|e| HarnessError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                HarnessError::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HarnessError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            HarnessError::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
