//! Consumer registry
//!
//! The list of pending consume jobs for the current test case. Callers pass
//! the registry explicitly to whatever needs it; there is no process-wide
//! instance.

use crate::job::ConsumerJob;
use crate::store::{ConsumeResult, RegistryStore, ResultSource};
use harness_core::Result;
use tracing::info;

/// Pending consume jobs, persisted in a [`RegistryStore`].
pub struct ConsumerRegistry<S: RegistryStore> {
    store: S,
}

impl<S: RegistryStore> ConsumerRegistry<S> {
    /// Registry over `store`. The store is not reset.
    pub fn new(store: S) -> Self {
        ConsumerRegistry { store }
    }

    /// Clear every job and result. Safe to call at the start of every case.
    pub fn reset(&mut self) -> Result<()> {
        self.store.reset()
    }

    /// Append one job.
    ///
    /// Ids must be unique within a test case; the registry does not check.
    pub fn insert_job(&mut self, job: ConsumerJob) -> Result<()> {
        job.validate()?;
        self.store.insert_job(&job)?;
        info!(
            target: "harness::tmq",
            consumer_id = job.id,
            expected_rows = job.expected_rows,
            topics = %job.topic_list(),
            "Registered consumer job"
        );
        Ok(())
    }

    /// Jobs in insertion order
    pub fn jobs(&mut self) -> Result<Vec<ConsumerJob>> {
        self.store.jobs()
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Underlying store, mutably
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

impl<S: RegistryStore> ResultSource for ConsumerRegistry<S> {
    fn results(&mut self) -> Result<Vec<ConsumeResult>> {
        self.store.results()
    }
}
