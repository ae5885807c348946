// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session store contract and the in-process implementation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// One stored session as the store returns it.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub last_time: DateTime<Utc>,
    pub data: HashMap<String, Value>,
}

/// Key-value store for dialog state, keyed by session id.
///
/// `create` overwrites any prior record with the same id (hijack: the HLR
/// allows at most one session per subscriber, so a new start replaces the
/// old session). `get` distinguishes not-found from failure. `sync` applies
/// deletes then writes as one update and refreshes `last_time`, creating
/// the record if it does not exist. All operations may fail with a
/// transport error, which the driver treats as fatal for the session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(
        &self,
        id: &str,
        init: HashMap<String, Value>,
    ) -> anyhow::Result<SessionRecord>;

    async fn get(&self, id: &str) -> anyhow::Result<Option<SessionRecord>>;

    async fn delete(&self, id: &str) -> anyhow::Result<()>;

    async fn sync(
        &self,
        id: &str,
        set: HashMap<String, Value>,
        del: HashSet<String>,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
struct Stored {
    start_time: DateTime<Utc>,
    last_time: DateTime<Utc>,
    data: HashMap<String, Value>,
}

/// In-process session store. The default for single-instance deployments
/// and tests; multi-instance deployments use [`super::http::HttpStore`].
#[derive(Default)]
pub struct MemoryStore {
    sessions: parking_lot::Mutex<HashMap<String, Stored>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions, for tests and health reporting.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(
        &self,
        id: &str,
        init: HashMap<String, Value>,
    ) -> anyhow::Result<SessionRecord> {
        let now = Utc::now();
        let stored = Stored { start_time: now, last_time: now, data: init.clone() };
        self.sessions.lock().insert(id.to_owned(), stored);
        Ok(SessionRecord { id: id.to_owned(), start_time: now, last_time: now, data: init })
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<SessionRecord>> {
        let sessions = self.sessions.lock();
        Ok(sessions.get(id).map(|s| SessionRecord {
            id: id.to_owned(),
            start_time: s.start_time,
            last_time: s.last_time,
            data: s.data.clone(),
        }))
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        self.sessions.lock().remove(id);
        Ok(())
    }

    async fn sync(
        &self,
        id: &str,
        set: HashMap<String, Value>,
        del: HashSet<String>,
    ) -> anyhow::Result<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock();
        let stored = sessions.entry(id.to_owned()).or_insert_with(|| Stored {
            start_time: now,
            last_time: now,
            data: HashMap::new(),
        });
        for name in &del {
            stored.data.remove(name);
        }
        for (name, value) in set {
            stored.data.insert(name, value);
        }
        stored.last_time = now;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
