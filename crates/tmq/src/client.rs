//! Command-line client runner
//!
//! Drives the database's command-line client in one-shot mode:
//! `taos -c <cfg> -s "<sql>"`. Arguments go straight to the process, never
//! through a shell. Query results are exported with the client's own
//! `<query> >> <file>` redirection, which writes CSV with a header line.

use harness_core::{HarnessError, HarnessPaths, Result, ResultSet, SqlSession};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Marker the client prints when the server rejects a statement.
const DB_ERROR_MARKER: &str = "DB error";

/// Runs statements through the command-line client binary.
#[derive(Debug, Clone)]
pub struct ClientRunner {
    binary: PathBuf,
    cfg_path: PathBuf,
}

impl ClientRunner {
    /// Runner using the client binary and config directory from `paths`
    pub fn new(paths: &HarnessPaths) -> Self {
        ClientRunner {
            binary: paths.client_binary(),
            cfg_path: paths.cfg_path().to_path_buf(),
        }
    }

    /// Runner using an explicit binary
    pub fn with_binary(binary: impl Into<PathBuf>, cfg_path: impl Into<PathBuf>) -> Self {
        ClientRunner {
            binary: binary.into(),
            cfg_path: cfg_path.into(),
        }
    }

    /// Client binary path
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Command for one statement
    pub fn command(&self, sql: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-c").arg(&self.cfg_path).arg("-s").arg(sql);
        cmd
    }

    /// Run one statement and return the client's stdout.
    pub fn run(&self, sql: &str) -> Result<String> {
        debug!(target: "harness::client", sql, "Running client");
        let output = self
            .command(sql)
            .output()
            .map_err(|e| HarnessError::process(self.binary.display().to_string(), e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if let Some(line) = stdout
            .lines()
            .chain(stderr.lines())
            .find(|l| l.contains(DB_ERROR_MARKER))
        {
            return Err(HarnessError::sql(sql, line.trim()));
        }
        if !output.status.success() {
            return Err(HarnessError::sql(
                sql,
                format!("client exited with {}: {}", output.status, stderr.trim()),
            ));
        }
        Ok(stdout)
    }

    /// Export a query's rows to `dst` as CSV with a header line.
    ///
    /// The client appends, so callers that need a fresh file remove it first.
    pub fn export(&self, query: &str, dst: &Path) -> Result<()> {
        self.run(&format!("{} >> {}", query, dst.display()))?;
        Ok(())
    }
}

/// Affected row count from client output such as `Query OK, 3 row(s) affected`.
pub fn parse_affected_rows(output: &str) -> u64 {
    output
        .lines()
        .find_map(|line| {
            let idx = line.find("row(s)")?;
            line[..idx].split_whitespace().last()?.parse().ok()
        })
        .unwrap_or(0)
}

/// Parse a CSV export: first record is the header.
pub fn parse_export(path: &Path) -> Result<ResultSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| HarnessError::Csv(format!("{}: {}", path.display(), e)))?;

    let columns = reader
        .headers()
        .map_err(|e| HarnessError::Csv(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| HarnessError::Csv(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(ResultSet::new(columns, rows))
}

/// [`SqlSession`] backed by the command-line client.
///
/// Every call spawns one client process; nothing is held open between calls.
#[derive(Debug)]
pub struct CliSession {
    runner: ClientRunner,
    scratch: tempfile::TempDir,
    seq: u64,
}

impl CliSession {
    /// Session over `runner`
    pub fn new(runner: ClientRunner) -> Result<Self> {
        Ok(CliSession {
            runner,
            scratch: tempfile::tempdir()?,
            seq: 0,
        })
    }

    /// Underlying runner
    pub fn runner(&self) -> &ClientRunner {
        &self.runner
    }
}

impl SqlSession for CliSession {
    fn execute(&mut self, sql: &str) -> Result<u64> {
        let stdout = self.runner.run(sql)?;
        Ok(parse_affected_rows(&stdout))
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet> {
        self.seq += 1;
        let dst = self.scratch.path().join(format!("query_{}.csv", self.seq));
        self.runner.export(sql, &dst)?;
        if !dst.exists() {
            // Statements like `show` without rows may produce no file
            return Ok(ResultSet::default());
        }
        let rs = parse_export(&dst)?;
        std::fs::remove_file(&dst)?;
        Ok(rs)
    }
}
