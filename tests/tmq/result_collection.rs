//! Result Collection Tests
//!
//! - Polling stops as soon as enough results are present
//! - Surplus results are truncated to the expected job count
//! - Exhausting the bound is a fatal `ResultsTimeout`

use crate::common::*;
use std::cell::Cell;
use std::rc::Rc;
use tsdb_harness::{
    ConsumeResult, ConsumerJob, ConsumerRegistry, MemoryStore, ResultSource, RowFileResults,
    Verifier,
};

/// Source that reveals one more result on each poll.
struct Trickle {
    results: Vec<ConsumeResult>,
    polls: Rc<Cell<usize>>,
}

impl ResultSource for Trickle {
    fn results(&mut self) -> tsdb_harness::Result<Vec<ConsumeResult>> {
        self.polls.set(self.polls.get() + 1);
        let visible = self.polls.get().min(self.results.len());
        Ok(self.results[..visible].to_vec())
    }
}

fn result(consumer_id: i64, rows: u64) -> ConsumeResult {
    ConsumeResult {
        consumer_id,
        msg_count: 1,
        row_count: rows,
    }
}

#[test]
fn collects_after_results_arrive() {
    let polls = Rc::new(Cell::new(0));
    let mut source = Trickle {
        results: vec![result(0, 100), result(1, 200)],
        polls: Rc::clone(&polls),
    };
    let dir = HarnessDir::new();
    let verifier = Verifier::new(dir.paths.clone(), instant_policy(10));

    assert_eq!(verifier.collect_results(&mut source, 2).unwrap(), vec![100, 200]);
    assert_eq!(polls.get(), 2);
}

#[test]
fn surplus_results_are_truncated() {
    let store = MemoryStore::new();
    let mut registry = ConsumerRegistry::new(store.clone());
    registry.insert_job(ConsumerJob::new(0, 10, ["topic1"])).unwrap();
    store.record_result(result(0, 10));
    store.record_result(result(7, 99));

    let dir = HarnessDir::new();
    let verifier = Verifier::new(dir.paths.clone(), instant_policy(3));
    let detailed = verifier.collect_detailed(&mut registry, 1).unwrap();
    assert_eq!(detailed, vec![result(0, 10)]);
}

#[test]
fn missing_results_time_out() {
    let polls = Rc::new(Cell::new(0));
    let mut source = Trickle {
        results: vec![result(0, 100)],
        polls: Rc::clone(&polls),
    };
    let dir = HarnessDir::new();
    let verifier = Verifier::new(dir.paths.clone(), instant_policy(4));

    let err = verifier.collect_results(&mut source, 2).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        HarnessError::ResultsTimeout {
            expected: 2,
            found: 1,
            attempts: 4
        }
    ));
    assert_eq!(polls.get(), 4);
}

#[test]
fn row_files_count_lines_after_header() {
    let dir = HarnessDir::new();
    dir.write_consumer_rows(0, &rows_csv(143));
    dir.write_consumer_rows(1, &rows_csv(0));

    let mut files = RowFileResults::new(dir.paths.clone(), vec![1, 0]);
    let results = files.results().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!((results[0].consumer_id, results[0].row_count), (1, 0));
    assert_eq!((results[1].consumer_id, results[1].row_count), (0, 143));
}

#[test]
fn row_file_appears_during_polling() {
    let dir = HarnessDir::new();
    let paths = dir.paths.clone();
    let polls = Rc::new(Cell::new(0u32));

    struct Delayed {
        inner: RowFileResults,
        polls: Rc<Cell<u32>>,
        on_second: Box<dyn FnMut()>,
    }
    impl ResultSource for Delayed {
        fn results(&mut self) -> tsdb_harness::Result<Vec<ConsumeResult>> {
            self.polls.set(self.polls.get() + 1);
            if self.polls.get() == 2 {
                (self.on_second)();
            }
            self.inner.results()
        }
    }

    let writer_paths = paths.clone();
    let mut source = Delayed {
        inner: RowFileResults::new(paths.clone(), vec![0]),
        polls: Rc::clone(&polls),
        on_second: Box::new(move || {
            std::fs::write(writer_paths.consumer_rows_file(0), rows_csv(5)).unwrap();
        }),
    };
    let verifier = Verifier::new(paths, instant_policy(5));
    assert_eq!(verifier.collect_results(&mut source, 1).unwrap(), vec![5]);
    assert_eq!(polls.get(), 2);
}
