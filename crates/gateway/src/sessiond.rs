// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session store HTTP service — the reference implementation of the
//! `/session/{id}` API the engine's `HttpStore` talks to.
//!
//! `POST` creates (rejecting caller-supplied timestamps), `GET` fetches
//! with optional `names` projection, `PUT` applies a partial update where
//! `null` values delete keys, `DELETE` is idempotent.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionDoc {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Stored {
    data: HashMap<String, Value>,
    start_time: DateTime<Utc>,
    last_time: DateTime<Utc>,
}

impl Stored {
    fn doc(&self, id: &str) -> SessionDoc {
        SessionDoc {
            id: id.to_owned(),
            data: Some(self.data.clone()),
            start_time: Some(self.start_time),
            last_time: Some(self.last_time),
        }
    }
}

/// Shared store state.
#[derive(Default)]
pub struct StoreState {
    sessions: parking_lot::Mutex<HashMap<String, Stored>>,
}

impl StoreState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

pub fn build_router(state: Arc<StoreState>) -> Router {
    Router::new()
        .route(
            "/session/{id}",
            post(create_session).get(get_session).put(update_session).delete(delete_session),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the task is dropped.
pub async fn run(host: &str, port: u16) -> anyhow::Result<()> {
    let state = StoreState::new();
    let router = build_router(state);
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!("sessiond listening on {host}:{port}");
    axum::serve(listener, router).await?;
    Ok(())
}

fn bad_request(message: &str) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, message.to_owned()).into_response()
}

/// `POST /session/{id}`
async fn create_session(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<String>,
    Json(doc): Json<SessionDoc>,
) -> axum::response::Response {
    if !doc.id.is_empty() && doc.id != id {
        return bad_request("id in URL and body does not match");
    }
    if doc.start_time.is_some() || doc.last_time.is_some() {
        return bad_request("start_time and last_time may not be specified for new session");
    }

    // Null values never enter a fresh session.
    let mut data = doc.data.unwrap_or_default();
    data.retain(|_, v| !v.is_null());

    let now = Utc::now();
    let stored = Stored { data, start_time: now, last_time: now };
    let response = stored.doc(&id);
    state.sessions.lock().insert(id, stored);
    Json(response).into_response()
}

/// `GET /session/{id}?names=k1&names=k2`
async fn get_session(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> axum::response::Response {
    let names: Vec<String> = query
        .as_deref()
        .map(parse_names)
        .unwrap_or_default();

    let sessions = state.sessions.lock();
    let Some(stored) = sessions.get(&id) else {
        return (StatusCode::NOT_FOUND, "session not found").into_response();
    };
    let mut doc = stored.doc(&id);
    if !names.is_empty() {
        let data = doc.data.take().unwrap_or_default();
        doc.data =
            Some(data.into_iter().filter(|(k, _)| names.iter().any(|n| n == k)).collect());
    }
    Json(doc).into_response()
}

/// Parse repeated `names=` parameters from a raw query string.
fn parse_names(query: &str) -> Vec<String> {
    query
        .split('&')
        .filter_map(|part| part.split_once('='))
        .filter(|(k, _)| *k == "names")
        .map(|(_, v)| v.to_owned())
        .collect()
}

/// `PUT /session/{id}`
async fn update_session(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<String>,
    Json(doc): Json<SessionDoc>,
) -> axum::response::Response {
    if !doc.id.is_empty() && doc.id != id {
        return bad_request("id in URL and body does not match");
    }
    if doc.start_time.is_some() || doc.last_time.is_some() {
        return bad_request("start_time and last_time may not be specified in request");
    }

    let mut sessions = state.sessions.lock();
    let Some(stored) = sessions.get_mut(&id) else {
        return (StatusCode::NOT_FOUND, "session not found").into_response();
    };
    for (name, value) in doc.data.unwrap_or_default() {
        if value.is_null() {
            stored.data.remove(&name);
        } else {
            stored.data.insert(name, value);
        }
    }
    stored.last_time = Utc::now();
    Json(stored.doc(&id)).into_response()
}

/// `DELETE /session/{id}` — idempotent.
async fn delete_session(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    state.sessions.lock().remove(&id);
    StatusCode::OK.into_response()
}

#[cfg(test)]
#[path = "sessiond_tests.rs"]
mod tests;
