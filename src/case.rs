//! Test-case runner
//!
//! Cases run in registration order against one seed session. A failing case
//! is recorded and its siblings still run; a fatal error (a consumption
//! mismatch) aborts the remaining cases.

use harness_core::{HarnessError, Result, SqlSession};
use tracing::{error, info, warn};

/// One system-test case.
pub trait TestCase {
    /// Name used in logs and the run summary
    fn name(&self) -> &str;

    /// Prepare the case before `run`.
    fn init(&mut self, _session: &mut dyn SqlSession) -> Result<()> {
        Ok(())
    }

    /// Execute the case.
    fn run(&mut self, session: &mut dyn SqlSession) -> Result<()>;

    /// Clean up after `run`, called even when `run` failed.
    fn stop(&mut self, _session: &mut dyn SqlSession) -> Result<()> {
        Ok(())
    }
}

/// Outcome of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Cases that passed
    pub passed: Vec<String>,
    /// Cases that failed, with their error
    pub failed: Vec<(String, HarnessError)>,
    /// Cases never started because an earlier case hit a fatal error
    pub skipped: Vec<String>,
}

impl RunSummary {
    /// Every case passed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Whether a fatal error stopped the run
    pub fn aborted(&self) -> bool {
        !self.skipped.is_empty() || self.failed.iter().any(|(_, e)| e.is_fatal())
    }
}

/// Registered cases, run in order.
#[derive(Default)]
pub struct CaseRunner {
    cases: Vec<Box<dyn TestCase>>,
}

impl CaseRunner {
    /// Empty runner
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a case
    pub fn add(&mut self, case: impl TestCase + 'static) -> &mut Self {
        self.cases.push(Box::new(case));
        self
    }

    /// Number of registered cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// No case registered
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    fn run_one(case: &mut dyn TestCase, session: &mut dyn SqlSession) -> Result<()> {
        case.init(session)?;
        let outcome = case.run(session);
        if let Err(e) = case.stop(session) {
            warn!(target: "harness::case", case = case.name(), error = %e, "Case cleanup failed");
        }
        outcome
    }

    /// Run every case against `session`.
    pub fn run_all(&mut self, session: &mut dyn SqlSession) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut cases = self.cases.iter_mut();

        for case in cases.by_ref() {
            let name = case.name().to_string();
            info!(target: "harness::case", case = %name, "start to execute");
            match Self::run_one(case.as_mut(), session) {
                Ok(()) => {
                    info!(target: "harness::case", case = %name, "successfully executed");
                    summary.passed.push(name);
                }
                Err(e) => {
                    error!(target: "harness::case", case = %name, error = %e, "Case failed");
                    let fatal = e.is_fatal();
                    summary.failed.push((name, e));
                    if fatal {
                        break;
                    }
                }
            }
        }

        summary.skipped = cases.map(|c| c.name().to_string()).collect();
        if !summary.skipped.is_empty() {
            error!(
                target: "harness::case",
                skipped = summary.skipped.len(),
                "Run aborted after fatal error"
            );
        }
        summary
    }
}
