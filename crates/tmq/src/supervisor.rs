//! Consumer process supervisor
//!
//! Launches the TMQ simulator, which reads every registered job from the
//! registry database and runs one consumer per job, then blocks until the
//! simulator exits. A crashed or stuck simulator is not an error here: the
//! outcome is reported and the caller inspects the persisted results.

use harness_core::{HarnessConfig, HarnessError, HarnessPaths, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use wait_timeout::ChildExt;

/// Per-run simulator parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimParams {
    /// Poll interval of each consumer, in milliseconds
    pub poll_delay_ms: u64,
    /// Database the topics were created in
    pub db_name: String,
    /// Print each message
    pub show_msg: bool,
    /// Print each row
    pub show_row: bool,
    /// Database holding the registry tables
    pub cdb_name: String,
}

impl SimParams {
    /// Parameters with the default registry database `cdb`
    pub fn new(poll_delay_ms: u64, db_name: impl Into<String>, show_msg: bool, show_row: bool) -> Self {
        SimParams {
            poll_delay_ms,
            db_name: db_name.into(),
            show_msg,
            show_row,
            cdb_name: "cdb".to_string(),
        }
    }

    /// Override the registry database
    pub fn with_cdb(mut self, cdb_name: impl Into<String>) -> Self {
        self.cdb_name = cdb_name.into();
        self
    }
}

/// How the simulator ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exited with a status code
    Exited(i32),
    /// Killed by a signal
    Signalled,
    /// Still running at the ceiling and killed by the supervisor
    TimedOut,
}

impl ProcessOutcome {
    /// Exited with status 0
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Exited(0))
    }
}

/// What [`Supervisor::start`] observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorReport {
    /// Terminal outcome
    pub outcome: ProcessOutcome,
    /// Wall time from spawn to exit
    pub elapsed: Duration,
}

const VALGRIND_ARGS: &[&str] = &[
    "--tool=memcheck",
    "--leak-check=full",
    "--show-reachable=no",
    "--track-origins=yes",
    "--show-leak-kinds=all",
    "--num-callers=20",
    "-v",
    "--workaround-gcc296-bugs=yes",
];

/// Runs the TMQ simulator.
#[derive(Debug, Clone)]
pub struct Supervisor {
    binary: PathBuf,
    paths: HarnessPaths,
    valgrind: bool,
    timeout: Duration,
}

impl Supervisor {
    /// Supervisor for the simulator built under `paths`
    pub fn new(paths: HarnessPaths) -> Self {
        Supervisor {
            binary: paths.tmq_sim_binary(),
            paths,
            valgrind: false,
            timeout: Duration::from_secs(600),
        }
    }

    /// Supervisor configured from `harness.toml`.
    ///
    /// Fault injection runs the simulator under valgrind.
    pub fn from_config(config: &HarnessConfig) -> Self {
        Supervisor::new(config.harness_paths())
            .with_valgrind(config.cluster.fault_injection)
            .with_timeout(Duration::from_secs(config.tmq.sim_timeout_secs))
    }

    /// Use an explicit simulator binary
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Run the simulator under valgrind memcheck
    pub fn with_valgrind(mut self, valgrind: bool) -> Self {
        self.valgrind = valgrind;
        self
    }

    /// Ceiling after which a running simulator is killed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self, params: &SimParams) -> Vec<OsString> {
        let mut argv: Vec<OsString> = Vec::new();
        if self.valgrind {
            argv.push("valgrind".into());
            let mut log_file = OsString::from("--log-file=");
            log_file.push(self.paths.valgrind_tmq_log());
            argv.push(log_file);
            argv.extend(VALGRIND_ARGS.iter().map(OsString::from));
        }
        argv.push(self.binary.clone().into_os_string());
        argv.push("-c".into());
        argv.push(self.paths.cfg_path().as_os_str().to_os_string());
        argv.push("-y".into());
        argv.push(params.poll_delay_ms.to_string().into());
        argv.push("-d".into());
        argv.push(params.db_name.clone().into());
        argv.push("-g".into());
        argv.push((params.show_msg as i32).to_string().into());
        argv.push("-r".into());
        argv.push((params.show_row as i32).to_string().into());
        argv.push("-w".into());
        argv.push(params.cdb_name.clone().into());
        argv
    }

    /// Launch the simulator and block until it terminates.
    ///
    /// Only a failure to spawn or wait is returned as an error.
    pub fn start(&self, params: &SimParams) -> Result<SupervisorReport> {
        let argv = self.argv(params);
        let program = argv[0].to_string_lossy().to_string();
        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HarnessError::process(program.clone(), e.to_string()))?;

        info!(
            target: "harness::tmq",
            pid = child.id(),
            db = %params.db_name,
            poll_delay_ms = params.poll_delay_ms,
            "Started consumer simulator"
        );

        let started = Instant::now();
        let outcome = match child
            .wait_timeout(self.timeout)
            .map_err(|e| HarnessError::process(program.clone(), e.to_string()))?
        {
            Some(status) => match status.code() {
                Some(code) => ProcessOutcome::Exited(code),
                None => ProcessOutcome::Signalled,
            },
            None => {
                let pid = child.id();
                if let Err(e) = child.kill() {
                    warn!(target: "harness::tmq", pid, error = %e, "Failed to kill timed-out consumer simulator");
                }
                if let Err(e) = child.wait() {
                    warn!(target: "harness::tmq", pid, error = %e, "Failed to reap timed-out consumer simulator");
                }
                ProcessOutcome::TimedOut
            }
        };
        let elapsed = started.elapsed();

        if outcome.is_success() {
            info!(target: "harness::tmq", elapsed_ms = elapsed.as_millis() as u64, "Consumer simulator finished");
        } else {
            warn!(
                target: "harness::tmq",
                outcome = ?outcome,
                elapsed_ms = elapsed.as_millis() as u64,
                "Consumer simulator did not exit cleanly"
            );
        }
        Ok(SupervisorReport { outcome, elapsed })
    }
}
