//! Storage seam for the management API.
//!
//! The relational store holding process logs, jobs and service heartbeats
//! lives outside this crate; [`ManagementStore`] is the interface the API
//! consumes. The freshness accessors double as fingerprint sources for the
//! cache and the change broadcaster.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// One process log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Monotonically increasing record id; the log fingerprint.
    pub logid: i64,
    /// RFC 3339 timestamp of record creation.
    pub timestamp: String,
    pub process_id: Option<String>,
    pub source: Option<String>,
    pub catalogue: Option<String>,
    pub entity: Option<String>,
    pub level: String,
    pub msg: String,
}

/// Read interface over the management store.
pub trait ManagementStore: Send + Sync {
    /// Logid of the most recent log record, if any.
    fn last_logid(&self) -> Option<i64>;

    /// RFC 3339 timestamp of the most recent service heartbeat, if any.
    fn last_service_timestamp(&self) -> Option<String>;

    /// The most recent log records, newest first.
    fn recent_logs(&self, limit: usize) -> Vec<LogRecord>;

    /// Catalog name to collection names.
    fn catalogs(&self) -> BTreeMap<String, Vec<String>>;

    /// Remove a job by id. Returns whether a job was removed.
    fn remove_job(&self, job_id: i64) -> bool;
}

/// In-memory store used by the default bootstrap and by tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    logs: RwLock<Vec<LogRecord>>,
    service_timestamp: RwLock<Option<String>>,
    catalogs: RwLock<BTreeMap<String, Vec<String>>>,
    jobs: RwLock<Vec<i64>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a log record with the next logid. Returns the assigned id.
    pub fn append_log(
        &self,
        level: &str,
        msg: &str,
        process_id: Option<&str>,
        source: Option<&str>,
        catalogue: Option<&str>,
        entity: Option<&str>,
    ) -> i64 {
        let mut logs = self.logs.write().expect("log store poisoned");
        let logid = logs.last().map_or(1, |last| last.logid + 1);
        logs.push(LogRecord {
            logid,
            timestamp: now_rfc3339(),
            process_id: process_id.map(str::to_string),
            source: source.map(str::to_string),
            catalogue: catalogue.map(str::to_string),
            entity: entity.map(str::to_string),
            level: level.to_string(),
            msg: msg.to_string(),
        });
        logid
    }

    /// Record a service heartbeat at the current time.
    pub fn touch_services(&self) {
        *self
            .service_timestamp
            .write()
            .expect("service store poisoned") = Some(now_rfc3339());
    }

    pub fn register_catalog(&self, name: &str, collections: &[&str]) {
        self.catalogs.write().expect("catalog store poisoned").insert(
            name.to_string(),
            collections.iter().map(|c| c.to_string()).collect(),
        );
    }

    pub fn register_job(&self, job_id: i64) {
        self.jobs.write().expect("job store poisoned").push(job_id);
    }
}

impl ManagementStore for InMemoryStore {
    fn last_logid(&self) -> Option<i64> {
        self.logs
            .read()
            .expect("log store poisoned")
            .last()
            .map(|record| record.logid)
    }

    fn last_service_timestamp(&self) -> Option<String> {
        self.service_timestamp
            .read()
            .expect("service store poisoned")
            .clone()
    }

    fn recent_logs(&self, limit: usize) -> Vec<LogRecord> {
        let logs = self.logs.read().expect("log store poisoned");
        logs.iter().rev().take(limit).cloned().collect()
    }

    fn catalogs(&self) -> BTreeMap<String, Vec<String>> {
        self.catalogs.read().expect("catalog store poisoned").clone()
    }

    fn remove_job(&self, job_id: i64) -> bool {
        let mut jobs = self.jobs.write().expect("job store poisoned");
        let before = jobs.len();
        jobs.retain(|id| *id != job_id);
        jobs.len() < before
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
