//! Consumer jobs
//!
//! A job tells the simulator which topics one consumer subscribes to, with
//! which options, and how many rows it should expect. Topic and option lists
//! travel as the comma-separated text the simulator parses:
//! `topic1,topic2` and `group.id:cgrp1, enable.auto.commit:false`.

use harness_cluster::validate_identifier;
use harness_core::{HarnessError, Result};

/// One consumer to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerJob {
    /// Consumer id, unique within a test case
    pub id: i64,
    /// Rows the consumer should reach before stopping
    pub expected_rows: u64,
    /// Topics to subscribe to
    pub topics: Vec<String>,
    /// Consumer options in insertion order
    pub options: Vec<(String, String)>,
    /// Whether consumed rows are persisted for content verification
    pub verify_content: bool,
    /// Commit offsets manually instead of automatically
    pub manual_commit: bool,
}

impl ConsumerJob {
    /// Job with no options, content verification off and auto-commit
    pub fn new<S: Into<String>>(
        id: i64,
        expected_rows: u64,
        topics: impl IntoIterator<Item = S>,
    ) -> Self {
        ConsumerJob {
            id,
            expected_rows,
            topics: topics.into_iter().map(Into::into).collect(),
            options: Vec::new(),
            verify_content: false,
            manual_commit: false,
        }
    }

    /// Add a consumer option
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    /// Set whether consumed rows are verified against a direct query
    pub fn verify_content(mut self, verify: bool) -> Self {
        self.verify_content = verify;
        self
    }

    /// Set manual commit mode
    pub fn manual_commit(mut self, manual: bool) -> Self {
        self.manual_commit = manual;
        self
    }

    /// Options as a typed view
    pub fn consumer_options(&self) -> ConsumerOptions<'_> {
        ConsumerOptions(&self.options)
    }

    /// Topics joined with `,`
    pub fn topic_list(&self) -> String {
        self.topics.join(",")
    }

    /// Options rendered as `k:v, k:v`
    pub fn key_list(&self) -> String {
        self.options
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Reject jobs whose text would not survive the simulator's parser.
    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(HarnessError::Config(format!(
                "consumer {} has no topics",
                self.id
            )));
        }
        for topic in &self.topics {
            validate_identifier(topic)?;
        }
        for (key, value) in &self.options {
            let bad = |s: &str| s.is_empty() || s.contains([',', ':', '\'']);
            if bad(key) || value.contains([',', ':', '\'']) {
                return Err(HarnessError::Config(format!(
                    "consumer {} has invalid option {:?}={:?}",
                    self.id, key, value
                )));
            }
        }
        Ok(())
    }
}

/// Parse a topic list written by [`ConsumerJob::topic_list`].
pub fn parse_topic_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a key list written by [`ConsumerJob::key_list`].
pub fn parse_key_list(s: &str) -> Result<Vec<(String, String)>> {
    s.split(',')
        .map(str::trim)
        .filter(|kv| !kv.is_empty())
        .map(|kv| {
            kv.split_once(':')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| HarnessError::Config(format!("malformed consumer option {:?}", kv)))
        })
        .collect()
}

/// Well-known consumer options.
#[derive(Debug, Clone, Copy)]
pub struct ConsumerOptions<'a>(&'a [(String, String)]);

impl<'a> ConsumerOptions<'a> {
    fn get(&self, key: &str) -> Option<&'a str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `group.id`
    pub fn group_id(&self) -> Option<&'a str> {
        self.get("group.id")
    }

    /// `enable.auto.commit`, true unless set to `false`
    pub fn auto_commit(&self) -> bool {
        self.get("enable.auto.commit") != Some("false")
    }

    /// `auto.offset.reset`
    pub fn offset_reset(&self) -> Option<&'a str> {
        self.get("auto.offset.reset")
    }
}
