//! Error types for the harness
//!
//! Every fallible operation in the workspace returns [`Result`]. The variants
//! follow the failure classes of a system-test run: configuration errors,
//! statement failures, consumption mismatches and external-process failures.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Error types for the harness
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A topology parameter is out of range
    #[error("Invalid topology parameter {field}: {value}")]
    InvalidTopology {
        /// Name of the offending parameter
        field: &'static str,
        /// Value that was rejected
        value: i64,
    },

    /// Config file could not be read, parsed or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// A statement was rejected by the cluster
    #[error("SQL failed: {sql}: {message}")]
    Sql {
        /// Statement text
        sql: String,
        /// Error reported by the client
        message: String,
    },

    /// The cluster did not reach full readiness within the polling bound
    #[error("Cluster not ready: {ready}/{expected} dnodes ready after {attempts} attempts")]
    ClusterNotReady {
        /// Number of dnodes configured
        expected: usize,
        /// Number of dnodes reported ready on the last attempt
        ready: usize,
        /// Attempts made
        attempts: u32,
    },

    /// A consumer observed a different number of rows than the direct query
    #[error("Consumer {consumer_id} row count mismatch: expected {expected}, got {actual}")]
    RowCountMismatch {
        /// Consumer id
        consumer_id: i64,
        /// Rows returned by the direct query
        expected: u64,
        /// Rows reported by the consumer
        actual: u64,
    },

    /// A consumed row differs from the row returned by the direct query
    #[error("Consumer {consumer_id} content mismatch at line {line}: expected {expected:?}, got {actual:?}")]
    ContentMismatch {
        /// Consumer id
        consumer_id: i64,
        /// 1-based data line (header excluded)
        line: usize,
        /// Line from the reference query
        expected: String,
        /// Line from the consumer file, `None` when the file ended early
        actual: Option<String>,
    },

    /// Consumer results did not appear within the polling bound
    #[error("Timed out waiting for consumer results: expected {expected}, found {found} after {attempts} attempts")]
    ResultsTimeout {
        /// Results expected
        expected: usize,
        /// Results present on the last attempt
        found: usize,
        /// Attempts made
        attempts: u32,
    },

    /// An external binary could not be spawned or waited on
    #[error("Process {program} failed: {message}")]
    Process {
        /// Program path
        program: String,
        /// Failure detail
        message: String,
    },

    /// The UDF shared library was not found under the project tree
    #[error("UDF library not found under {0}")]
    UdfLibraryNotFound(PathBuf),

    /// `show functions` did not list the expected number of functions
    #[error("UDF registration failed: expected {expected} functions, found {actual}")]
    UdfRegistration {
        /// Expected function count
        expected: usize,
        /// Function count reported
        actual: usize,
    },

    /// A test-case assertion failed
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// Result file could not be parsed
    #[error("CSV error: {0}")]
    Csv(String),

    /// I/O error (file operations, process pipes, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl HarnessError {
    /// Create a `Sql` error
    pub fn sql(sql: impl Into<String>, message: impl Into<String>) -> Self {
        HarnessError::Sql {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Create a `Process` error
    pub fn process(program: impl Into<String>, message: impl Into<String>) -> Self {
        HarnessError::Process {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole run rather than the current case.
    ///
    /// True for consumption mismatches and missing consumer results.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::RowCountMismatch { .. }
                | HarnessError::ContentMismatch { .. }
                | HarnessError::ResultsTimeout { .. }
        )
    }
}
