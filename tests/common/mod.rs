//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
pub use tsdb_harness::{HarnessError, HarnessPaths, PollPolicy, ResultSet, SqlSession};

// ============================================================================
// ScriptedSession - SqlSession with scripted responses
// ============================================================================

type QueryHandler = Box<dyn FnMut(&str) -> tsdb_harness::Result<ResultSet>>;
type ExecuteHandler = Box<dyn FnMut(&str) -> tsdb_harness::Result<u64>>;

/// Session that records every statement and answers from closures.
pub struct ScriptedSession {
    log: Arc<Mutex<Vec<String>>>,
    on_query: QueryHandler,
    on_execute: ExecuteHandler,
}

impl ScriptedSession {
    /// Executes succeed with 0 rows, queries return an empty set.
    pub fn new() -> Self {
        ScriptedSession {
            log: Arc::new(Mutex::new(Vec::new())),
            on_query: Box::new(|_| Ok(ResultSet::default())),
            on_execute: Box::new(|_| Ok(0)),
        }
    }

    pub fn on_query(
        mut self,
        f: impl FnMut(&str) -> tsdb_harness::Result<ResultSet> + 'static,
    ) -> Self {
        self.on_query = Box::new(f);
        self
    }

    pub fn on_execute(mut self, f: impl FnMut(&str) -> tsdb_harness::Result<u64> + 'static) -> Self {
        self.on_execute = Box::new(f);
        self
    }

    /// Handle to the statement log, usable after the session is moved.
    pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl SqlSession for ScriptedSession {
    fn execute(&mut self, sql: &str) -> tsdb_harness::Result<u64> {
        self.log.lock().push(sql.to_string());
        (self.on_execute)(sql)
    }

    fn query(&mut self, sql: &str) -> tsdb_harness::Result<ResultSet> {
        self.log.lock().push(sql.to_string());
        (self.on_query)(sql)
    }
}

// ============================================================================
// Result sets
// ============================================================================

/// `show dnodes` result with one row per status.
pub fn dnodes_result(statuses: &[&str]) -> ResultSet {
    ResultSet::new(
        vec![
            "id".into(),
            "endpoint".into(),
            "vnodes".into(),
            "support_vnodes".into(),
            "status".into(),
        ],
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| {
                vec![
                    (i + 1).to_string(),
                    format!("h:{}", 6030 + i * 100),
                    "0".into(),
                    "16".into(),
                    s.to_string(),
                ]
            })
            .collect(),
    )
}

/// Result set with `n` single-column rows.
pub fn rows_result(n: usize) -> ResultSet {
    ResultSet::new(
        vec!["c1".into()],
        (0..n).map(|i| vec![(i * 7).to_string()]).collect(),
    )
}

/// CSV text with a header and `n` rows, as the client exports and the
/// simulator persists.
pub fn rows_csv(n: usize) -> String {
    let mut out = String::from("ts,c1,udf1(c1)\n");
    for i in 0..n {
        out.push_str(&format!("'2022-01-01 00:00:{:02}.{:03}',{},88\n", i / 1000, i % 1000, i * 7));
    }
    out
}

pub fn instant_policy(attempts: u32) -> PollPolicy {
    PollPolicy::new(attempts, std::time::Duration::ZERO)
}

// ============================================================================
// Filesystem fixtures
// ============================================================================

/// Temp tree with a client config dir and its sibling log dir.
pub struct HarnessDir {
    pub dir: TempDir,
    pub paths: HarnessPaths,
}

impl HarnessDir {
    pub fn new() -> Self {
        tsdb_harness::logging::init_for_tests("debug");
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let cfg = dir.path().join("psim").join("cfg");
        std::fs::create_dir_all(&cfg).expect("Failed to create cfg dir");
        std::fs::create_dir_all(dir.path().join("psim").join("log"))
            .expect("Failed to create log dir");
        let paths = HarnessPaths::new(dir.path().join("build_root"), &cfg);
        HarnessDir { dir, paths }
    }

    pub fn write_consumer_rows(&self, consumer_id: i64, content: &str) {
        std::fs::write(self.paths.consumer_rows_file(consumer_id), content)
            .expect("Failed to write consumer rows");
    }
}

// ============================================================================
// Fake external binaries (unix)
// ============================================================================

/// Serialises script creation and spawning within a test binary, so a script
/// is never exec'd while another thread still holds it open for writing.
pub static SPAWN_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Write an executable `#!/bin/sh` script.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("Failed to write script");
    let mut perms = std::fs::metadata(&path)
        .expect("Failed to stat script")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("Failed to chmod script");
    path
}
