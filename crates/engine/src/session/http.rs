// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP session store client.
//!
//! Talks to the `/session/{id}` API (see the `sessiond` reference service):
//! POST creates, GET fetches (404 means not-found), PUT applies a partial
//! update where `null` values delete keys, DELETE is idempotent. A PUT
//! against a missing id falls back to POST because the store contract says
//! sync creates the record if absent.

use std::collections::{HashMap, HashSet};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::store::{SessionRecord, SessionStore};

/// Wire shape of one session document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDoc {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_time: Option<DateTime<Utc>>,
}

pub struct HttpStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, client: reqwest::Client::new() }
    }

    fn session_url(&self, id: &str) -> String {
        format!("{}/session/{id}", self.base_url)
    }

    fn record_from(&self, id: &str, doc: SessionDoc) -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            id: id.to_owned(),
            start_time: doc.start_time.unwrap_or(now),
            last_time: doc.last_time.unwrap_or(now),
            data: doc.data.unwrap_or_default(),
        }
    }

    async fn post_create(
        &self,
        id: &str,
        data: HashMap<String, Value>,
    ) -> anyhow::Result<SessionRecord> {
        let body = SessionDoc {
            id: id.to_owned(),
            data: if data.is_empty() { None } else { Some(data) },
            start_time: None,
            last_time: None,
        };
        let res = self
            .client
            .post(self.session_url(id))
            .json(&body)
            .send()
            .await
            .context("session store unreachable")?;
        if !res.status().is_success() {
            anyhow::bail!("session create failed: {}", res.status());
        }
        let doc: SessionDoc = res.json().await.context("failed to decode session")?;
        Ok(self.record_from(id, doc))
    }
}

#[async_trait]
impl SessionStore for HttpStore {
    async fn create(
        &self,
        id: &str,
        init: HashMap<String, Value>,
    ) -> anyhow::Result<SessionRecord> {
        self.post_create(id, init).await
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<SessionRecord>> {
        let res = self
            .client
            .get(self.session_url(id))
            .send()
            .await
            .context("session store unreachable")?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            anyhow::bail!("session fetch failed: {}", res.status());
        }
        let doc: SessionDoc = res.json().await.context("failed to decode session")?;
        Ok(Some(self.record_from(id, doc)))
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        let res = self
            .client
            .delete(self.session_url(id))
            .send()
            .await
            .context("session store unreachable")?;
        if !res.status().is_success() {
            anyhow::bail!("session delete failed: {}", res.status());
        }
        Ok(())
    }

    async fn sync(
        &self,
        id: &str,
        set: HashMap<String, Value>,
        del: HashSet<String>,
    ) -> anyhow::Result<()> {
        // Deletes ride along as null values.
        let mut data = set.clone();
        for name in &del {
            data.insert(name.clone(), Value::Null);
        }
        let body = SessionDoc {
            id: id.to_owned(),
            data: Some(data),
            start_time: None,
            last_time: None,
        };
        let res = self
            .client
            .put(self.session_url(id))
            .json(&body)
            .send()
            .await
            .context("session store unreachable")?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            // Sync creates the record if it does not exist.
            self.post_create(id, set).await?;
            return Ok(());
        }
        if !res.status().is_success() {
            anyhow::bail!("session sync failed: {}", res.status());
        }
        Ok(())
    }
}
