//! Core types for the harness
//!
//! This crate defines what every other harness crate builds on:
//! - Error: the failure taxonomy of a test run
//! - Config: `harness.toml` loading and validation
//! - Paths: file locations shared with the external binaries
//! - Session: the `SqlSession` seam and `ResultSet`
//! - Poll: bounded polling with a fixed attempt count

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod paths;
pub mod poll;
pub mod session;

pub use config::{
    local_hostname, ClusterSettings, DeployMode, HarnessConfig, PathSettings, PollSettings,
    TmqSettings, CONFIG_FILE_NAME,
};
pub use error::{HarnessError, Result};
pub use paths::{HarnessPaths, NodePaths, CLIENT_BINARY, NODE_CFG_FILE, TMQ_SIM_BINARY};
pub use poll::{poll_bounded, PollOutcome, PollPolicy, Probe};
pub use session::{ResultSet, SqlSession};
