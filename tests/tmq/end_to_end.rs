//! End-to-End UDF-over-TMQ Tests
//!
//! Runs `TmqUdfCase` under `CaseRunner` with a scripted session, a stand-in
//! simulator that replays fixture row files, and a fixed reference exporter.

#![cfg(unix)]

use crate::common::*;
use std::path::{Path, PathBuf};
use tsdb_harness::cases::{ResultsFrom, TmqUdfCase, TmqUdfParams};
use tsdb_harness::{
    CaseRunner, ConsumerRegistry, MemoryStore, ReferenceExporter, Supervisor, TestCase, UdfSpec,
};

const TOPIC1_ROWS: usize = 143;
const TOPIC2_ROWS: usize = 500;

/// Exports the row fixture matching the query's topic.
struct TopicExporter;

impl ReferenceExporter for TopicExporter {
    fn export(&mut self, query: &str, dst: &Path) -> tsdb_harness::Result<()> {
        let rows = if query.contains("c1 % 7 == 0") {
            TOPIC1_ROWS
        } else {
            TOPIC2_ROWS
        };
        std::fs::write(dst, rows_csv(rows))?;
        Ok(())
    }
}

/// Session answering the direct topic queries and `show functions`.
fn session() -> ScriptedSession {
    ScriptedSession::new().on_query(|sql| {
        Ok(if sql == "show functions" {
            rows_result(1)
        } else if sql.contains("c1 % 7 == 0") {
            rows_result(TOPIC1_ROWS)
        } else {
            rows_result(TOPIC2_ROWS)
        })
    })
}

/// Simulator stand-in: the n-th run copies `fixture_<n>.txt` to consumer n's
/// rows file.
fn fake_sim(dir: &HarnessDir) -> PathBuf {
    let root = dir.dir.path();
    let body = format!(
        "n=$(cat '{counter}' 2>/dev/null || echo 0)\n\
         cp '{root}/fixture_'$n'.txt' '{log}/consumerid_'$n'.txt'\n\
         echo $((n + 1)) > '{counter}'\n",
        counter = root.join("runs").display(),
        root = root.display(),
        log = dir.paths.log_dir().display(),
    );
    write_script(root, "tmq_sim", &body)
}

fn write_fixture(dir: &HarnessDir, n: usize, rows: usize) {
    std::fs::write(dir.dir.path().join(format!("fixture_{}.txt", n)), rows_csv(rows)).unwrap();
}

fn udf() -> UdfSpec {
    UdfSpec {
        name: "udf1".to_string(),
        library: PathBuf::from("/build/lib/libudf1.so"),
        output_type: "int".to_string(),
        buf_size: 8,
    }
}

fn case(dir: &HarnessDir, results_from: ResultsFrom) -> TmqUdfCase<MemoryStore> {
    let params = TmqUdfParams {
        rows_per_tbl: 20,
        results_from,
        ..TmqUdfParams::default()
    };
    let supervisor = Supervisor::new(dir.paths.clone())
        .with_binary(fake_sim(dir))
        .with_timeout(std::time::Duration::from_secs(30));
    TmqUdfCase::new(
        params,
        udf(),
        dir.paths.clone(),
        ConsumerRegistry::new(MemoryStore::new()),
        supervisor,
        Box::new(TopicExporter),
    )
    .with_results_policy(instant_policy(3))
}

/// Case that records whether it ran.
struct Marker(std::rc::Rc<std::cell::Cell<bool>>);

impl TestCase for Marker {
    fn name(&self) -> &str {
        "marker"
    }

    fn run(&mut self, _session: &mut dyn SqlSession) -> tsdb_harness::Result<()> {
        self.0.set(true);
        Ok(())
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn both_topics_consume_and_verify() {
    let _guard = SPAWN_LOCK.lock();
    let dir = HarnessDir::new();
    write_fixture(&dir, 0, TOPIC1_ROWS);
    write_fixture(&dir, 1, TOPIC2_ROWS);

    let mut session = session();
    let mut runner = CaseRunner::new();
    runner.add(case(&dir, ResultsFrom::RowFiles));
    let summary = runner.run_all(&mut session);

    assert!(summary.is_success(), "failed: {:?}", summary.failed);
    assert_eq!(summary.passed, vec!["tmq_udf".to_string()]);

    let statements = session.statements();
    assert_eq!(
        statements[0],
        "create function udf1 as '/build/lib/libudf1.so' outputtype int bufSize 8"
    );
    assert_eq!(statements[1], "show functions");
    assert!(statements.contains(&"insert into db1.ctb0 values (1640966400000, 0, 0, 'binary0') (1640966400001, 1, 1, 'binary1') (1640966400002, 2, 2, 'binary2') (1640966400003, 3, 3, 'binary3') (1640966400004, 4, 4, 'binary4') (1640966400005, 5, 5, 'binary5') (1640966400006, 6, 6, 'binary6') (1640966400007, 7, 7, 'binary7') (1640966400008, 8, 8, 'binary8') (1640966400009, 9, 9, 'binary9')".to_string()));

    let topic_ddl: Vec<&String> = statements
        .iter()
        .filter(|s| s.contains(" topic "))
        .collect();
    assert!(topic_ddl[0].starts_with("create topic topic1 as select ts,c1,udf1(c1)"));
    assert!(topic_ddl[1].starts_with("create topic topic2 as "));
    assert_eq!(topic_ddl[2], "drop topic topic1");
    assert_eq!(topic_ddl[3], "drop topic topic2");

    assert!(dir.paths.dst_rows_file(0).exists());
    assert!(dir.paths.dst_rows_file(1).exists());
}

#[test]
fn short_consumer_aborts_the_run() {
    let _guard = SPAWN_LOCK.lock();
    let dir = HarnessDir::new();
    write_fixture(&dir, 0, TOPIC1_ROWS);
    write_fixture(&dir, 1, TOPIC2_ROWS - 1);

    let ran = std::rc::Rc::new(std::cell::Cell::new(false));
    let mut session = session();
    let mut runner = CaseRunner::new();
    runner
        .add(case(&dir, ResultsFrom::RowFiles))
        .add(Marker(std::rc::Rc::clone(&ran)));
    let summary = runner.run_all(&mut session);

    assert!(summary.aborted());
    assert_eq!(summary.skipped, vec!["marker".to_string()]);
    assert!(!ran.get());
    assert!(matches!(
        summary.failed[0].1,
        HarnessError::RowCountMismatch {
            consumer_id: 1,
            expected: 500,
            actual: 499
        }
    ));
    // Topics are dropped even after a fatal mismatch
    assert!(session.statements().contains(&"drop topic topic2".to_string()));
}

#[test]
fn results_that_never_arrive_abort_the_run() {
    let _guard = SPAWN_LOCK.lock();
    let dir = HarnessDir::new();
    write_fixture(&dir, 0, TOPIC1_ROWS);

    // The stand-in simulator never writes to the in-process registry
    let mut session = session();
    let mut runner = CaseRunner::new();
    runner.add(case(&dir, ResultsFrom::Registry));
    let summary = runner.run_all(&mut session);

    assert!(summary.aborted());
    assert!(matches!(
        summary.failed[0].1,
        HarnessError::ResultsTimeout {
            expected: 1,
            found: 0,
            attempts: 3
        }
    ));
    let statements = session.statements();
    assert!(statements.contains(&"drop topic topic1".to_string()));
    assert!(!statements.iter().any(|s| s.contains("topic2")));
}

#[test]
fn udf_registration_count_is_checked() {
    let _guard = SPAWN_LOCK.lock();
    let dir = HarnessDir::new();
    let mut session = ScriptedSession::new().on_query(|_| Ok(rows_result(2)));
    let mut runner = CaseRunner::new();
    runner.add(case(&dir, ResultsFrom::RowFiles));
    let summary = runner.run_all(&mut session);

    assert!(!summary.aborted());
    assert!(matches!(
        summary.failed[0].1,
        HarnessError::UdfRegistration {
            expected: 1,
            actual: 2
        }
    ));
}
