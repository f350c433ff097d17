//! Filesystem layout shared with the external binaries
//!
//! The client binary, the TMQ simulator and the verifier agree on these paths:
//!
//! ```text
//! <build>/build/bin/taos          # command-line client
//! <build>/build/bin/tmq_sim       # consumer simulator
//! <cfg>/../log/
//! ├── consumerid_<id>.txt         # rows observed by consumer <id>
//! ├── dstrows_<id>.txt            # rows exported by the direct query
//! └── valgrind-tmq.log            # simulator memcheck log
//! <work>/dnode<N>/
//! ├── cfg/taos.cfg
//! ├── data/
//! └── log/
//! ```
//!
//! The first line of each rows file is reserved for a schema header.

use std::path::{Path, PathBuf};

/// Name of the command-line client binary
pub const CLIENT_BINARY: &str = "taos";
/// Name of the consumer simulator binary
pub const TMQ_SIM_BINARY: &str = "tmq_sim";
/// Name of a dnode config file
pub const NODE_CFG_FILE: &str = "taos.cfg";

/// Paths derived from the build and client config directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessPaths {
    build_path: PathBuf,
    cfg_path: PathBuf,
}

impl HarnessPaths {
    /// Create paths from the build root and the client config directory
    pub fn new(build_path: impl AsRef<Path>, cfg_path: impl AsRef<Path>) -> Self {
        HarnessPaths {
            build_path: build_path.as_ref().to_path_buf(),
            cfg_path: cfg_path.as_ref().to_path_buf(),
        }
    }

    /// Build root (contains `build/bin`)
    pub fn build_path(&self) -> &Path {
        &self.build_path
    }

    /// Client config directory
    pub fn cfg_path(&self) -> &Path {
        &self.cfg_path
    }

    /// Directory holding the built binaries
    pub fn bin_dir(&self) -> PathBuf {
        self.build_path.join("build").join("bin")
    }

    /// Command-line client binary
    pub fn client_binary(&self) -> PathBuf {
        self.bin_dir().join(CLIENT_BINARY)
    }

    /// Consumer simulator binary
    pub fn tmq_sim_binary(&self) -> PathBuf {
        self.bin_dir().join(TMQ_SIM_BINARY)
    }

    /// `<cfg>/../log`, kept unnormalised so it matches what the simulator writes
    pub fn log_dir(&self) -> PathBuf {
        self.cfg_path.join("..").join("log")
    }

    /// Rows persisted by a consumer
    pub fn consumer_rows_file(&self, consumer_id: i64) -> PathBuf {
        self.log_dir().join(format!("consumerid_{}.txt", consumer_id))
    }

    /// Rows exported by the reference query
    pub fn dst_rows_file(&self, consumer_id: i64) -> PathBuf {
        self.log_dir().join(format!("dstrows_{}.txt", consumer_id))
    }

    /// Memcheck log of the simulator when run under valgrind
    pub fn valgrind_tmq_log(&self) -> PathBuf {
        self.log_dir().join("valgrind-tmq.log")
    }
}

/// Per-dnode deployment directories under a work root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePaths {
    root: PathBuf,
}

impl NodePaths {
    /// Directories for dnode `index` (1-based) under `work_dir`
    pub fn new(work_dir: impl AsRef<Path>, index: u32) -> Self {
        NodePaths {
            root: work_dir.as_ref().join(format!("dnode{}", index)),
        }
    }

    /// Node root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Config directory
    pub fn cfg_dir(&self) -> PathBuf {
        self.root.join("cfg")
    }

    /// Config file
    pub fn cfg_file(&self) -> PathBuf {
        self.cfg_dir().join(NODE_CFG_FILE)
    }

    /// Data directory
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Log directory
    pub fn log_dir(&self) -> PathBuf {
        self.root.join("log")
    }

    /// Create the full directory structure
    pub fn create_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.cfg_dir())?;
        std::fs::create_dir_all(self.data_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}
