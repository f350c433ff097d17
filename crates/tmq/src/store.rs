//! Consumer registry storage
//!
//! The registry is the hand-off point between a test case and the consumer
//! simulator: the test case writes jobs, the simulator reads them and writes
//! one result per consumer, and the verifier reads the results back. Within a
//! test case there is exactly one writer and one reader per record, so stores
//! do no locking beyond what makes a handle shareable.

use crate::job::{parse_key_list, parse_topic_list, ConsumerJob};
use chrono::Utc;
use harness_core::{HarnessError, Result, ResultSet, SqlSession};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// What one consumer reported when it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeResult {
    /// Consumer id
    pub consumer_id: i64,
    /// Messages polled
    pub msg_count: u64,
    /// Rows consumed
    pub row_count: u64,
}

/// Source of per-consumer results.
pub trait ResultSource {
    /// Results present so far, ordered by job insertion.
    fn results(&mut self) -> Result<Vec<ConsumeResult>>;
}

/// Backing storage of a consumer registry.
pub trait RegistryStore: ResultSource {
    /// Drop all jobs and results.
    fn reset(&mut self) -> Result<()>;

    /// Append one job.
    fn insert_job(&mut self, job: &ConsumerJob) -> Result<()>;

    /// Jobs in insertion order.
    fn jobs(&mut self) -> Result<Vec<ConsumerJob>>;
}

/// Order `results` by the position of their consumer in `jobs`.
///
/// Results for consumers with no job keep their relative order at the end.
pub(crate) fn order_by_jobs(jobs: &[ConsumerJob], mut results: Vec<ConsumeResult>) -> Vec<ConsumeResult> {
    let position: HashMap<i64, usize> = jobs
        .iter()
        .enumerate()
        .map(|(pos, job)| (job.id, pos))
        .collect();
    results.sort_by_key(|r| position.get(&r.consumer_id).copied().unwrap_or(usize::MAX));
    results
}

#[derive(Debug, Default)]
struct MemoryInner {
    jobs: Vec<ConsumerJob>,
    results: Vec<ConsumeResult>,
}

/// In-process registry store.
///
/// Cloning yields another handle to the same storage, so an in-process
/// consumer can report results to the store the verifier reads.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a consumer's result.
    pub fn record_result(&self, result: ConsumeResult) {
        self.inner.lock().results.push(result);
    }
}

impl ResultSource for MemoryStore {
    fn results(&mut self) -> Result<Vec<ConsumeResult>> {
        let inner = self.inner.lock();
        Ok(order_by_jobs(&inner.jobs, inner.results.clone()))
    }
}

impl RegistryStore for MemoryStore {
    fn reset(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.jobs.clear();
        inner.results.clear();
        Ok(())
    }

    fn insert_job(&mut self, job: &ConsumerJob) -> Result<()> {
        self.inner.lock().jobs.push(job.clone());
        Ok(())
    }

    fn jobs(&mut self) -> Result<Vec<ConsumerJob>> {
        Ok(self.inner.lock().jobs.clone())
    }
}

/// Registry kept in the `consumeinfo` / `consumeresult` tables of a dedicated
/// database, where the simulator reads jobs and writes results.
pub struct SqlTableStore {
    session: Box<dyn SqlSession>,
    cdb_name: String,
    base_ts: i64,
    next_seq: i64,
}

impl SqlTableStore {
    /// Store in database `cdb_name`, reached through `session`.
    pub fn new(session: Box<dyn SqlSession>, cdb_name: impl Into<String>) -> Result<Self> {
        let cdb_name = cdb_name.into();
        harness_cluster::validate_identifier(&cdb_name)?;
        Ok(SqlTableStore {
            session,
            cdb_name,
            base_ts: Utc::now().timestamp_millis(),
            next_seq: 0,
        })
    }

    /// Database holding the registry tables
    pub fn cdb_name(&self) -> &str {
        &self.cdb_name
    }

    fn jobs_from(rs: &ResultSet) -> Result<Vec<ConsumerJob>> {
        (0..rs.row_count())
            .map(|row| {
                let text = |col: usize| rs.get(row, col).unwrap_or_default();
                Ok(ConsumerJob {
                    id: rs.get_i64(row, 1)?,
                    topics: parse_topic_list(text(2)),
                    options: parse_key_list(text(3))?,
                    expected_rows: rs.get_i64(row, 4)?.max(0) as u64,
                    verify_content: rs.get_i64(row, 5)? != 0,
                    manual_commit: rs.get_i64(row, 6)? != 0,
                })
            })
            .collect()
    }

    fn results_from(rs: &ResultSet) -> Result<Vec<ConsumeResult>> {
        (0..rs.row_count())
            .map(|row| {
                Ok(ConsumeResult {
                    consumer_id: rs.get_i64(row, 1)?,
                    msg_count: rs.get_i64(row, 2)?.max(0) as u64,
                    row_count: rs.get_i64(row, 3)?.max(0) as u64,
                })
            })
            .collect()
    }
}

impl ResultSource for SqlTableStore {
    fn results(&mut self) -> Result<Vec<ConsumeResult>> {
        let rs = self.session.query(&format!(
            "select ts, consumerid, consummsgcnt, consumrowcnt from {}.consumeresult order by ts",
            self.cdb_name
        ))?;
        let results = Self::results_from(&rs)?;
        let jobs = self.jobs()?;
        Ok(order_by_jobs(&jobs, results))
    }
}

impl RegistryStore for SqlTableStore {
    fn reset(&mut self) -> Result<()> {
        let cdb = self.cdb_name.clone();
        for sql in [
            format!("create database if not exists {} vgroups 1", cdb),
            format!("drop table if exists {}.consumeinfo", cdb),
            format!("drop table if exists {}.consumeresult", cdb),
            format!(
                "create table {}.consumeinfo (ts timestamp, consumerid int, topiclist binary(1024), \
                 keylist binary(1024), expectrows int, ifcheckdata int, ifmanualcommit int)",
                cdb
            ),
            format!(
                "create table {}.consumeresult (ts timestamp, consumerid int, consummsgcnt bigint, \
                 consumrowcnt bigint, checkresult int)",
                cdb
            ),
        ] {
            self.session.execute(&sql)?;
        }
        self.base_ts = Utc::now().timestamp_millis();
        self.next_seq = 0;
        debug!(target: "harness::tmq", cdb = %cdb, "Reset consumer registry tables");
        Ok(())
    }

    fn insert_job(&mut self, job: &ConsumerJob) -> Result<()> {
        job.validate()?;
        let ts = self.base_ts + self.next_seq;
        let sql = format!(
            "insert into {}.consumeinfo values ({}, {}, '{}', '{}', {}, {}, {})",
            self.cdb_name,
            ts,
            job.id,
            job.topic_list(),
            job.key_list(),
            job.expected_rows,
            job.verify_content as i32,
            job.manual_commit as i32
        );
        self.session.execute(&sql).map_err(|e| match e {
            HarnessError::Sql { message, .. } => HarnessError::sql(sql.clone(), message),
            other => other,
        })?;
        self.next_seq += 1;
        Ok(())
    }

    fn jobs(&mut self) -> Result<Vec<ConsumerJob>> {
        let rs = self.session.query(&format!(
            "select ts, consumerid, topiclist, keylist, expectrows, ifcheckdata, ifmanualcommit \
             from {}.consumeinfo order by ts",
            self.cdb_name
        ))?;
        Self::jobs_from(&rs)
    }
}
