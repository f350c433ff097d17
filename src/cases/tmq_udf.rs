//! UDF results consumed through topics
//!
//! Registers a scalar UDF, fills one super table, then for each topic query:
//! creates the topic, counts the rows a direct query returns, runs one
//! consumer over the topic and checks both the consumed row count and the
//! consumed rows against the direct query.

use crate::case::TestCase;
use harness_cluster::{create_topic, create_udf_function, drop_topics, UdfSpec};
use harness_core::{HarnessConfig, HarnessPaths, PollPolicy, Result, SqlSession};
use harness_tmq::{
    ConsumerJob, ConsumerRegistry, ReferenceExporter, RegistryStore, ResultSource, RowFileResults,
    SimParams, Supervisor, Verifier,
};
use tracing::info;

/// Where consumer row counts are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsFrom {
    /// The registry's result records
    Registry,
    /// The per-consumer rows files
    RowFiles,
}

/// Data shape and consumer settings.
#[derive(Debug, Clone)]
pub struct TmqUdfParams {
    /// Database for the test data
    pub db_name: String,
    /// Vgroups of the test database
    pub vgroups: u32,
    /// Replica of the test database
    pub replica: u32,
    /// Super table name
    pub stb_name: String,
    /// Child table name prefix
    pub ctb_prefix: String,
    /// Number of child tables
    pub ctb_num: u32,
    /// Rows inserted per child table
    pub rows_per_tbl: u64,
    /// Rows per insert statement
    pub batch_num: u64,
    /// Timestamp of the first row, epoch milliseconds
    pub start_ts: i64,
    /// Consumer poll interval in milliseconds
    pub poll_delay_ms: u64,
    /// Simulator prints messages
    pub show_msg: bool,
    /// Simulator prints rows
    pub show_row: bool,
    /// Registry database
    pub cdb_name: String,
    /// Where row counts are collected from
    pub results_from: ResultsFrom,
}

impl Default for TmqUdfParams {
    fn default() -> Self {
        TmqUdfParams {
            db_name: "db1".to_string(),
            vgroups: 4,
            replica: 1,
            stb_name: "stb".to_string(),
            ctb_prefix: "ctb".to_string(),
            ctb_num: 1,
            rows_per_tbl: 1000,
            batch_num: 10,
            start_ts: 1_640_966_400_000,
            poll_delay_ms: 10,
            show_msg: true,
            show_row: true,
            cdb_name: "cdb".to_string(),
            results_from: ResultsFrom::Registry,
        }
    }
}

impl TmqUdfParams {
    /// Defaults with the replica and registry database taken from config.
    pub fn from_config(config: &HarnessConfig) -> Self {
        TmqUdfParams {
            replica: config.cluster.replica,
            cdb_name: config.tmq.cdb_name.clone(),
            ..TmqUdfParams::default()
        }
    }

    /// Statements that create and fill the test data.
    pub fn data_statements(&self) -> Vec<String> {
        let db = &self.db_name;
        let mut sqls = vec![
            format!("drop database if exists {}", db),
            format!(
                "create database if not exists {} vgroups {} replica {}",
                db, self.vgroups, self.replica
            ),
            format!(
                "create table if not exists {}.{} (ts timestamp, c1 int, c2 int, c3 binary(20)) \
                 tags (t1 int, t2 binary(20))",
                db, self.stb_name
            ),
        ];
        for i in 0..self.ctb_num {
            sqls.push(format!(
                "create table if not exists {}.{}{} using {}.{} tags ({}, 'tag{}')",
                db, self.ctb_prefix, i, db, self.stb_name, i, i
            ));
        }
        let batch = self.batch_num.max(1);
        for i in 0..self.ctb_num {
            let mut row = 0;
            while row < self.rows_per_tbl {
                let end = (row + batch).min(self.rows_per_tbl);
                let values: Vec<String> = (row..end)
                    .map(|r| {
                        format!(
                            "({}, {}, {}, 'binary{}')",
                            self.start_ts + r as i64,
                            r,
                            r,
                            r
                        )
                    })
                    .collect();
                sqls.push(format!(
                    "insert into {}.{}{} values {}",
                    db,
                    self.ctb_prefix,
                    i,
                    values.join(" ")
                ));
                row = end;
            }
        }
        sqls
    }

    /// Topic name and query pairs exercised by the case.
    pub fn topic_queries(&self) -> Vec<(String, String)> {
        let src = format!("{}.{}", self.db_name, self.stb_name);
        vec![
            (
                "topic1".to_string(),
                format!("select ts,c1,udf1(c1),c2,udf1(c2) from {} where c1 % 7 == 0", src),
            ),
            (
                "topic2".to_string(),
                format!(
                    "select ts, c1,udf1(c1),sin(udf1(c2)), log(udf1(c2)) from {} \
                     where udf1(c1) == 88 or sin(udf1(c1)) > 0",
                    src
                ),
            ),
        ]
    }
}

/// UDF-over-TMQ system test.
pub struct TmqUdfCase<S: RegistryStore> {
    params: TmqUdfParams,
    udf: UdfSpec,
    paths: HarnessPaths,
    registry: ConsumerRegistry<S>,
    supervisor: Supervisor,
    exporter: Box<dyn ReferenceExporter>,
    results_policy: PollPolicy,
    created_topics: Vec<String>,
}

impl<S: RegistryStore> TmqUdfCase<S> {
    /// Assemble the case from its collaborators.
    pub fn new(
        params: TmqUdfParams,
        udf: UdfSpec,
        paths: HarnessPaths,
        registry: ConsumerRegistry<S>,
        supervisor: Supervisor,
        exporter: Box<dyn ReferenceExporter>,
    ) -> Self {
        TmqUdfCase {
            params,
            udf,
            paths,
            registry,
            supervisor,
            exporter,
            results_policy: PollPolicy::RESULTS,
            created_topics: Vec::new(),
        }
    }

    /// Override the result collection bound
    pub fn with_results_policy(mut self, policy: PollPolicy) -> Self {
        self.results_policy = policy;
        self
    }

    /// Registry used by the case
    pub fn registry_mut(&mut self) -> &mut ConsumerRegistry<S> {
        &mut self.registry
    }

    fn consume_and_verify(
        &mut self,
        session: &mut dyn SqlSession,
        consumer_id: i64,
        topic: &str,
        query: &str,
    ) -> Result<()> {
        self.registry.reset()?;
        create_topic(session, topic, query)?;
        self.created_topics.push(topic.to_string());
        let expected = session.query(query)?.row_count() as u64;

        let expect_row_cnt = self.params.rows_per_tbl * u64::from(self.params.ctb_num);
        self.registry.insert_job(
            ConsumerJob::new(consumer_id, expect_row_cnt, [topic])
                .option("group.id", "cgrp1")
                .option("enable.auto.commit", "false")
                .option("auto.commit.interval.ms", "6000")
                .option("auto.offset.reset", "earliest")
                .verify_content(true)
                .manual_commit(true),
        )?;

        let sim = SimParams::new(
            self.params.poll_delay_ms,
            self.params.db_name.clone(),
            self.params.show_msg,
            self.params.show_row,
        )
        .with_cdb(self.params.cdb_name.clone());
        self.supervisor.start(&sim)?;

        let mut verifier = Verifier::new(self.paths.clone(), self.results_policy);
        let actual = match self.params.results_from {
            ResultsFrom::Registry => verifier.collect_results(&mut self.registry, 1)?,
            ResultsFrom::RowFiles => {
                let mut files = RowFileResults::new(self.paths.clone(), vec![consumer_id]);
                verifier.collect_results(&mut files as &mut dyn ResultSource, 1)?
            }
        };
        verifier.check_row_count(consumer_id, expected, actual[0])?;
        verifier.check_content(self.exporter.as_mut(), consumer_id, query)?;
        info!(target: "harness::case", consumer_id, "check data ok");
        Ok(())
    }
}

impl<S: RegistryStore> TestCase for TmqUdfCase<S> {
    fn name(&self) -> &str {
        "tmq_udf"
    }

    fn init(&mut self, session: &mut dyn SqlSession) -> Result<()> {
        create_udf_function(session, &self.udf, 1)?;
        for sql in self.params.data_statements() {
            session.execute(&sql)?;
        }
        Ok(())
    }

    fn run(&mut self, session: &mut dyn SqlSession) -> Result<()> {
        for (consumer_id, (topic, query)) in self.params.topic_queries().into_iter().enumerate() {
            self.consume_and_verify(session, consumer_id as i64, &topic, &query)?;
        }
        Ok(())
    }

    fn stop(&mut self, session: &mut dyn SqlSession) -> Result<()> {
        let topics = std::mem::take(&mut self.created_topics);
        drop_topics(session, &topics)
    }
}
