//! Reference system-test cases

pub mod tmq_udf;

pub use tmq_udf::{ResultsFrom, TmqUdfCase, TmqUdfParams};
