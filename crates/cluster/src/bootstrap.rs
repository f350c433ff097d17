//! Cluster bootstrap
//!
//! Registers the non-seed dnodes through a session connected to the seed and
//! polls `show dnodes` until every configured dnode reports `ready`.
//!
//! `create dnode` is never retried: a duplicate or malformed registration is
//! not safe to repeat, so the first failure is returned as-is. Readiness is
//! polled a fixed number of times; exhausting the bound is reported through
//! [`Readiness::NotReady`], and the caller decides whether that is fatal.

use crate::topology::{ClusterDescriptor, NodeDescriptor};
use harness_core::{
    poll_bounded, HarnessError, PollOutcome, PollPolicy, Probe, ResultSet, Result, SqlSession,
};
use tracing::{debug, error, info, warn};

/// Status value `show dnodes` reports for a serving dnode.
pub const READY_STATUS: &str = "ready";

/// Position of the status column when the client reports no headers.
const STATUS_COLUMN_FALLBACK: usize = 4;

/// Readiness of a single dnode as seen by `show dnodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeReadiness {
    /// Status missing from the row
    Unknown,
    /// Status is `ready`
    Ready,
    /// Any other status
    NotReady,
}

impl NodeReadiness {
    fn from_status(status: Option<&str>) -> Self {
        match status.map(str::trim) {
            None | Some("") => NodeReadiness::Unknown,
            Some(s) if s == READY_STATUS => NodeReadiness::Ready,
            Some(_) => NodeReadiness::NotReady,
        }
    }
}

/// Cluster-level readiness after polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Every expected dnode reported ready
    Ready {
        /// Polls used
        attempts: u32,
    },
    /// The bound was exhausted
    NotReady {
        /// Dnodes ready on the final poll
        ready: usize,
        /// Dnodes expected
        expected: usize,
        /// Polls used
        attempts: u32,
    },
}

impl Readiness {
    /// Whether the cluster reached full readiness
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }

    /// Number of polls issued
    pub fn attempts(&self) -> u32 {
        match self {
            Readiness::Ready { attempts } | Readiness::NotReady { attempts, .. } => *attempts,
        }
    }

    /// Escalate a not-ready cluster into an error.
    pub fn into_result(self) -> Result<u32> {
        match self {
            Readiness::Ready { attempts } => Ok(attempts),
            Readiness::NotReady {
                ready,
                expected,
                attempts,
            } => Err(HarnessError::ClusterNotReady {
                expected,
                ready,
                attempts,
            }),
        }
    }
}

/// Per-row readiness from a `show dnodes` result.
pub fn node_states(dnodes: &ResultSet) -> Vec<NodeReadiness> {
    let status_col = dnodes
        .column_index("status")
        .unwrap_or(STATUS_COLUMN_FALLBACK);
    (0..dnodes.row_count())
        .map(|row| NodeReadiness::from_status(dnodes.get(row, status_col)))
        .collect()
}

/// Ready dnodes among the first `expected` rows; rows past the configured
/// count are ignored.
fn count_ready(dnodes: &ResultSet, expected: usize) -> usize {
    node_states(dnodes)
        .into_iter()
        .take(expected)
        .filter(|s| *s == NodeReadiness::Ready)
        .count()
}

/// Issue `create dnode '<host:port>'` for each joiner, in order.
///
/// The session must already be connected to the seed dnode.
pub fn register_nodes(session: &mut dyn SqlSession, joiners: &[NodeDescriptor]) -> Result<()> {
    for node in joiners {
        let sql = format!("create dnode '{}'", node.endpoint());
        if let Err(e) = session.execute(&sql) {
            error!(target: "harness::bootstrap", node = %node, error = %e, "Dnode registration failed");
            return Err(e);
        }
        debug!(target: "harness::bootstrap", node = %node, "Registered dnode");
    }
    Ok(())
}

/// Poll `show dnodes` until `expected` dnodes are ready or the policy runs out.
///
/// Query failures propagate immediately; only "not enough dnodes ready" is
/// retried.
pub fn await_ready(
    session: &mut dyn SqlSession,
    expected: usize,
    policy: PollPolicy,
) -> Result<Readiness> {
    let outcome = poll_bounded(policy, |attempt| {
        let dnodes = session.query("show dnodes")?;
        let ready = count_ready(&dnodes, expected);
        debug!(target: "harness::bootstrap", attempt, ready, expected, "Polled dnode status");
        Ok::<_, HarnessError>(if ready == expected {
            Probe::Done(())
        } else {
            Probe::Pending(ready)
        })
    })?;

    match outcome {
        PollOutcome::Ready { attempts, .. } => {
            info!(
                target: "harness::bootstrap",
                dnodes = expected,
                attempts,
                "Cluster ready"
            );
            Ok(Readiness::Ready { attempts })
        }
        PollOutcome::Exhausted { last, attempts } => {
            warn!(
                target: "harness::bootstrap",
                expected,
                ready = last,
                attempts,
                "Cluster dnodes not ready within polling bound"
            );
            Ok(Readiness::NotReady {
                ready: last,
                expected,
                attempts,
            })
        }
    }
}

/// Registers a cluster's joiners and waits for it to become ready.
#[derive(Debug, Clone)]
pub struct Bootstrapper<'a> {
    cluster: &'a ClusterDescriptor,
    policy: PollPolicy,
}

impl<'a> Bootstrapper<'a> {
    /// Bootstrap `cluster` with the default readiness bound.
    pub fn new(cluster: &'a ClusterDescriptor) -> Self {
        Bootstrapper {
            cluster,
            policy: PollPolicy::READINESS,
        }
    }

    /// Override the readiness bound.
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register every joiner, then await readiness of all dnodes.
    pub fn bootstrap(&self, seed: &mut dyn SqlSession) -> Result<Readiness> {
        info!(
            target: "harness::bootstrap",
            seed = %self.cluster.seed(),
            dnodes = self.cluster.len(),
            "Bootstrapping cluster"
        );
        register_nodes(seed, self.cluster.joiners())?;
        await_ready(seed, self.cluster.len(), self.policy)
    }
}
