//! Topic definitions
//!
//! A topic is a named, query-defined subscription source. Test cases create
//! one per query under test and drop them all once consumption is verified.

use harness_core::{HarnessError, Result, SqlSession};
use tracing::{info, warn};

/// Check that `name` is a plain identifier before it is spliced into SQL.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(HarnessError::sql(name, "invalid identifier"))
    }
}

/// `create topic <name> as <query>`
pub fn create_topic(session: &mut dyn SqlSession, name: &str, query: &str) -> Result<()> {
    validate_identifier(name)?;
    let sql = format!("create topic {} as {}", name, query);
    info!(target: "harness::tmq", topic = name, sql = %sql, "Creating topic");
    session.execute(&sql)?;
    Ok(())
}

/// `drop topic <name>`
pub fn drop_topic(session: &mut dyn SqlSession, name: &str) -> Result<()> {
    validate_identifier(name)?;
    session.execute(&format!("drop topic {}", name))?;
    Ok(())
}

/// Drop every topic in `names`, continuing past failures.
///
/// Returns the first error once all drops have been attempted.
pub fn drop_topics<S: AsRef<str>>(session: &mut dyn SqlSession, names: &[S]) -> Result<()> {
    let mut first_err = None;
    for name in names {
        if let Err(e) = drop_topic(session, name.as_ref()) {
            warn!(target: "harness::tmq", topic = name.as_ref(), error = %e, "Drop topic failed");
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
