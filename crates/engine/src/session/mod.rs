// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-subscriber dialog state.
//!
//! A [`Session`] is a write-through buffer over a [`SessionStore`]: reads
//! come from the local copy, writes accumulate as set/del deltas, and
//! `sync` flushes the deltas in one store update. The engine does not lock
//! across instances; at-most-one-session-per-subscriber comes from the id
//! scheme (`"<source>:<subscriber>"`), and starting a new session for an
//! existing id hijacks it.

pub mod http;
pub mod store;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

pub use http::HttpStore;
pub use store::{MemoryStore, SessionRecord, SessionStore};

/// Session keys reserved by the engine.
pub mod key {
    /// The originally dialed code.
    pub const INIT_REQUEST: &str = "init_request";
    /// Item to resume on; set whenever the driver parks the session.
    pub const CURRENT_ITEM_ID: &str = "current_item_id";
    /// Ordered ids still queued when the driver parked mid-sequence.
    pub const NEXT_ITEM_IDS: &str = "next_item_ids";
    /// Responder that should deliver the next response.
    pub const RESPONDER_ID: &str = "responder_id";
    /// Transport delivery handle for that responder.
    pub const RESPONDER_KEY: &str = "responder_key";
    /// Most recent user input for the current step.
    pub const INPUT: &str = "input";
}

/// Local handle on one stored session.
pub struct Session {
    id: String,
    store: Arc<dyn SessionStore>,
    start_time: DateTime<Utc>,
    last_time: DateTime<Utc>,
    data: HashMap<String, Value>,
    pending_set: HashMap<String, Value>,
    pending_del: HashSet<String>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>, record: SessionRecord) -> Self {
        Self {
            id: record.id,
            store,
            start_time: record.start_time,
            last_time: record.last_time,
            data: record.data,
            pending_set: HashMap::new(),
            pending_del: HashSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn last_time(&self) -> DateTime<Utc> {
        self.last_time
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// String view of a value; `None` when absent or not a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(Value::as_str)
    }

    /// Write a value. Setting `Value::Null` is equivalent to [`Self::del`].
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if value.is_null() {
            self.del(&name);
            return;
        }
        self.pending_del.remove(&name);
        self.pending_set.insert(name.clone(), value.clone());
        self.data.insert(name, value);
    }

    pub fn del(&mut self, name: &str) {
        self.pending_set.remove(name);
        self.pending_del.insert(name.to_owned());
        self.data.remove(name);
    }

    /// True when there are unflushed deltas.
    pub fn dirty(&self) -> bool {
        !self.pending_set.is_empty() || !self.pending_del.is_empty()
    }

    /// Flush pending writes and deletes to the store.
    ///
    /// After a successful sync the local view equals what a fresh fetch
    /// would return, absent concurrent writers.
    pub async fn sync(&mut self) -> anyhow::Result<()> {
        let set = std::mem::take(&mut self.pending_set);
        let del = std::mem::take(&mut self.pending_del);
        if set.is_empty() && del.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.store.sync(&self.id, set.clone(), del.clone()).await {
            // Restore the deltas so a retry flushes the same update.
            self.pending_set = set;
            self.pending_del = del;
            return Err(e);
        }
        self.last_time = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
