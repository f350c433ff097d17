//! tsdb-harness - cluster orchestration and TMQ consumption verification
//!
//! Deploys a multi-dnode cluster description, registers and awaits its dnodes,
//! and coordinates external consumer processes whose output is reconciled with
//! direct queries.
//!
//! # Quick Start
//!
//! ```ignore
//! use tsdb_harness::*;
//!
//! let config = HarnessConfig::from_file(Path::new(CONFIG_FILE_NAME))?;
//! let cluster = ClusterDescriptor::from_settings(&config.cluster)?;
//! write_node_configs(&cluster, &config.paths.work_dir)?;
//!
//! let mut seed = CliSession::new(ClientRunner::new(&config.harness_paths()))?;
//! let readiness = Bootstrapper::new(&cluster)
//!     .with_policy(config.poll.readiness)
//!     .bootstrap(&mut seed)?;
//! readiness.into_result()?;
//!
//! let mut runner = CaseRunner::new();
//! runner.add(
//!     TmqUdfCase::new(
//!         TmqUdfParams::from_config(&config),
//!         udf,
//!         config.harness_paths(),
//!         ConsumerRegistry::new(SqlTableStore::new(Box::new(cdb_session), &config.tmq.cdb_name)?),
//!         Supervisor::from_config(&config),
//!         Box::new(ClientRunner::new(&config.harness_paths())),
//!     )
//!     .with_results_policy(config.poll.results),
//! );
//! let summary = runner.run_all(&mut seed);
//! ```
//!
//! # Architecture
//!
//! - `harness-core`: errors, config, file layout, the `SqlSession` seam, bounded polling
//! - `harness-cluster`: topology, dnode configs, bootstrap, topics, UDFs
//! - `harness-tmq`: consumer registry, simulator supervision, verification

pub mod case;
pub mod cases;
pub mod logging;

pub use harness_cluster::*;
pub use harness_core::*;
pub use harness_tmq::*;

pub use case::{CaseRunner, RunSummary, TestCase};
pub use cases::{ResultsFrom, TmqUdfCase, TmqUdfParams};
