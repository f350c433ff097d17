//! TMQ consumption harness
//!
//! Test cases register consume jobs, run the consumer simulator over them and
//! reconcile what the consumers observed with direct queries:
//!
//! ```ignore
//! let mut registry = ConsumerRegistry::new(MemoryStore::new());
//! registry.reset()?;
//! registry.insert_job(ConsumerJob::new(0, 1000, ["topic1"]))?;
//! Supervisor::new(paths.clone()).start(&SimParams::new(10, "db1", true, true))?;
//! let rows = Verifier::new(paths, PollPolicy::RESULTS).collect_results(&mut registry, 1)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod job;
pub mod registry;
pub mod store;
pub mod supervisor;
pub mod verifier;

pub use client::{parse_affected_rows, parse_export, CliSession, ClientRunner};
pub use job::{parse_key_list, parse_topic_list, ConsumerJob, ConsumerOptions};
pub use registry::ConsumerRegistry;
pub use store::{ConsumeResult, MemoryStore, RegistryStore, ResultSource, SqlTableStore};
pub use supervisor::{ProcessOutcome, SimParams, Supervisor, SupervisorReport};
pub use verifier::{
    compare_rows, ReferenceExporter, RowFileResults, VerificationRecord, VerificationReport,
    Verifier,
};
