//! Consumption verification
//!
//! Reconciles what consumers reported with what a direct query returns:
//! row counts first, then row content for jobs that persisted their rows.
//! Every mismatch is fatal to the run and is logged with expected and actual
//! values before the error is returned.

use crate::client::ClientRunner;
use crate::store::{ConsumeResult, ResultSource};
use harness_core::{
    poll_bounded, HarnessError, HarnessPaths, PollOutcome, PollPolicy, Probe, Result,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info};

/// Produces the reference rendering of a query into a file.
pub trait ReferenceExporter {
    /// Write `query`'s rows to `dst`, header line first.
    fn export(&mut self, query: &str, dst: &Path) -> Result<()>;
}

impl ReferenceExporter for ClientRunner {
    fn export(&mut self, query: &str, dst: &Path) -> Result<()> {
        ClientRunner::export(self, query, dst)
    }
}

/// Per-consumer outcome of verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationRecord {
    /// Rows returned by the direct query
    pub expected_rows: u64,
    /// Rows the consumer reported
    pub actual_rows: u64,
    /// Content check outcome, `None` when not checked
    pub content_match: Option<bool>,
}

/// Finalised verification results, keyed by consumer id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    records: BTreeMap<i64, VerificationRecord>,
}

impl VerificationReport {
    /// Record for one consumer
    pub fn get(&self, consumer_id: i64) -> Option<&VerificationRecord> {
        self.records.get(&consumer_id)
    }

    /// All records in consumer id order
    pub fn iter(&self) -> impl Iterator<Item = (&i64, &VerificationRecord)> {
        self.records.iter()
    }

    /// Number of consumers verified
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No consumer verified
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reads consumer row counts from the per-consumer rows files.
///
/// A consumer's result is present once its file exists; the row count is the
/// number of lines after the header.
#[derive(Debug, Clone)]
pub struct RowFileResults {
    paths: HarnessPaths,
    consumer_ids: Vec<i64>,
}

impl RowFileResults {
    /// Watch the files of `consumer_ids`, in that order
    pub fn new(paths: HarnessPaths, consumer_ids: Vec<i64>) -> Self {
        RowFileResults {
            paths,
            consumer_ids,
        }
    }
}

impl ResultSource for RowFileResults {
    fn results(&mut self) -> Result<Vec<ConsumeResult>> {
        let mut results = Vec::new();
        for &consumer_id in &self.consumer_ids {
            let file = self.paths.consumer_rows_file(consumer_id);
            if !file.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&file)?;
            let rows = content.lines().skip(1).count() as u64;
            results.push(ConsumeResult {
                consumer_id,
                msg_count: 0,
                row_count: rows,
            });
        }
        Ok(results)
    }
}

/// Compare a consumer's rows with the reference rows.
///
/// The first line of each side is a schema header and is skipped. The scan is
/// driven by the reference: it stops when the reference runs out of lines, so
/// extra trailing consumer lines are not compared.
pub fn compare_rows(consumer_id: i64, reference: &str, consumed: &str) -> Result<()> {
    let mut consumed_lines = consumed.lines().skip(1);
    for (idx, expected) in reference.lines().skip(1).enumerate() {
        let actual = consumed_lines.next();
        if actual != Some(expected) {
            return Err(HarnessError::ContentMismatch {
                consumer_id,
                line: idx + 1,
                expected: expected.to_string(),
                actual: actual.map(str::to_string),
            });
        }
    }
    Ok(())
}

/// Collects and checks consumer results.
#[derive(Debug, Clone)]
pub struct Verifier {
    paths: HarnessPaths,
    policy: PollPolicy,
    records: BTreeMap<i64, VerificationRecord>,
}

impl Verifier {
    /// Verifier over the result files under `paths`
    pub fn new(paths: HarnessPaths, policy: PollPolicy) -> Self {
        Verifier {
            paths,
            policy,
            records: BTreeMap::new(),
        }
    }

    /// Poll `source` until `expected_job_count` results are present.
    ///
    /// Returns the observed row counts in job insertion order. Exceeding the
    /// polling bound is fatal.
    pub fn collect_results(
        &self,
        source: &mut dyn ResultSource,
        expected_job_count: usize,
    ) -> Result<Vec<u64>> {
        Ok(self
            .collect_detailed(source, expected_job_count)?
            .into_iter()
            .map(|r| r.row_count)
            .collect())
    }

    /// Like [`Verifier::collect_results`], keeping message counts and ids.
    pub fn collect_detailed(
        &self,
        source: &mut dyn ResultSource,
        expected_job_count: usize,
    ) -> Result<Vec<ConsumeResult>> {
        let outcome = poll_bounded(self.policy, |_| {
            let results = source.results()?;
            Ok::<_, HarnessError>(if results.len() >= expected_job_count {
                Probe::Done(results)
            } else {
                Probe::Pending(results.len())
            })
        })?;

        match outcome {
            PollOutcome::Ready { mut value, .. } => {
                value.truncate(expected_job_count);
                for r in &value {
                    info!(
                        target: "harness::verify",
                        consumer_id = r.consumer_id,
                        msgs = r.msg_count,
                        rows = r.row_count,
                        "Consumer result"
                    );
                }
                Ok(value)
            }
            PollOutcome::Exhausted { last, attempts } => {
                error!(
                    target: "harness::verify",
                    expected = expected_job_count,
                    found = last,
                    attempts,
                    "Consumer results did not arrive"
                );
                Err(HarnessError::ResultsTimeout {
                    expected: expected_job_count,
                    found: last,
                    attempts,
                })
            }
        }
    }

    /// Record and check a consumer's row count against the direct query.
    pub fn check_row_count(&mut self, consumer_id: i64, expected: u64, actual: u64) -> Result<()> {
        let record = self.records.entry(consumer_id).or_insert(VerificationRecord {
            expected_rows: expected,
            actual_rows: actual,
            content_match: None,
        });
        record.expected_rows = expected;
        record.actual_rows = actual;

        if expected != actual {
            error!(
                target: "harness::verify",
                consumer_id,
                expected,
                actual,
                "tmq consume rows error"
            );
            return Err(HarnessError::RowCountMismatch {
                consumer_id,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Check a consumer's persisted rows against a fresh direct query.
    ///
    /// `reference_query` is re-run through `exporter` into the consumer's
    /// `dstrows_<id>.txt`, replacing any earlier export, so repeated checks of
    /// unchanged data give the same outcome.
    pub fn check_content(
        &mut self,
        exporter: &mut dyn ReferenceExporter,
        consumer_id: i64,
        reference_query: &str,
    ) -> Result<()> {
        let dst = self.paths.dst_rows_file(consumer_id);
        let consumed_file = self.paths.consumer_rows_file(consumer_id);
        if let Some(dir) = dst.parent() {
            std::fs::create_dir_all(dir)?;
        }
        if dst.exists() {
            std::fs::remove_file(&dst)?;
        }
        exporter.export(reference_query, &dst)?;
        info!(
            target: "harness::verify",
            consumer_id,
            consumed = %consumed_file.display(),
            reference = %dst.display(),
            "Comparing consumed rows"
        );

        let reference = std::fs::read_to_string(&dst)?;
        let consumed = std::fs::read_to_string(&consumed_file)?;
        let outcome = compare_rows(consumer_id, &reference, &consumed);

        if let Some(record) = self.records.get_mut(&consumer_id) {
            record.content_match = Some(outcome.is_ok());
        }
        if let Err(e) = &outcome {
            error!(
                target: "harness::verify",
                consumer_id,
                error = %e,
                "consume rows do not match the rows by direct query"
            );
        }
        outcome
    }

    /// Records so far
    pub fn records(&self) -> &BTreeMap<i64, VerificationRecord> {
        &self.records
    }

    /// Freeze the records.
    pub fn finish(self) -> VerificationReport {
        VerificationReport {
            records: self.records,
        }
    }
}
