// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport: `POST|PUT|DELETE /ussd/{msisdn}`.
//!
//! Each request parks a oneshot waiter under a fresh key, hands the key to
//! the engine as the responder key, and blocks until the dialog answers.
//! If nothing answers within the deadline the handler synthesizes a final
//! "Timeout. Please try again later" so the subscriber is never left
//! hanging.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use ussd::{Engine, Responder, Response};

use crate::error::ErrorCode;
use crate::msg::{UssdResponse, UssdResponseKind};

/// Responder id stored in sessions started over HTTP.
pub const RESPONDER_ID: &str = "http";

/// How long a request waits for the dialog to answer.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(15);

/// Pending HTTP waiters, keyed by per-request responder key.
#[derive(Default)]
pub struct HttpResponder {
    pending: parking_lot::Mutex<HashMap<String, oneshot::Sender<Response>>>,
}

impl HttpResponder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn park(&self, key: String, sender: oneshot::Sender<Response>) {
        self.pending.lock().insert(key, sender);
    }

    fn forget(&self, key: &str) {
        self.pending.lock().remove(key);
    }
}

#[async_trait]
impl Responder for HttpResponder {
    fn id(&self) -> &str {
        RESPONDER_ID
    }

    async fn respond(&self, key: &str, response: Response) -> anyhow::Result<()> {
        let Some(sender) = self.pending.lock().remove(key) else {
            anyhow::bail!("no waiter for key {key} (request already timed out?)");
        };
        // The waiter may have given up between lookup and send.
        let _ = sender.send(response);
        Ok(())
    }
}

pub struct HttpGateway {
    engine: Arc<Engine>,
    responder: Arc<HttpResponder>,
    init_item: String,
    response_timeout: Duration,
}

impl HttpGateway {
    pub fn new(engine: Arc<Engine>, responder: Arc<HttpResponder>, init_item: &str) -> Self {
        Self {
            engine,
            responder,
            init_item: init_item.to_owned(),
            response_timeout: RESPONSE_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct UssdText {
    text: String,
}

enum Entry {
    Begin,
    Continue,
}

pub fn build_router(gateway: Arc<HttpGateway>) -> Router {
    Router::new()
        .route("/ussd/{msisdn}", post(begin).put(continue_).delete(abort))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// `POST /ussd/{msisdn}` — begin a session with the dialed code.
async fn begin(
    State(gw): State<Arc<HttpGateway>>,
    Path(msisdn): Path<String>,
    Json(body): Json<UssdText>,
) -> axum::response::Response {
    dispatch(gw, msisdn, body.text, Entry::Begin).await
}

/// `PUT /ussd/{msisdn}` — continue with user input.
async fn continue_(
    State(gw): State<Arc<HttpGateway>>,
    Path(msisdn): Path<String>,
    Json(body): Json<UssdText>,
) -> axum::response::Response {
    dispatch(gw, msisdn, body.text, Entry::Continue).await
}

/// `DELETE /ussd/{msisdn}` — abort.
async fn abort(
    State(gw): State<Arc<HttpGateway>>,
    Path(msisdn): Path<String>,
) -> axum::response::Response {
    let id = format!("http:{msisdn}");
    gw.engine.abort(&id).await;
    StatusCode::OK.into_response()
}

async fn dispatch(
    gw: Arc<HttpGateway>,
    msisdn: String,
    text: String,
    entry: Entry,
) -> axum::response::Response {
    let id = format!("http:{msisdn}");
    let key = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = oneshot::channel();
    gw.responder.park(key.clone(), tx);

    let data = HashMap::from([("msisdn".to_owned(), Value::String(msisdn))]);
    let outcome = match entry {
        Entry::Begin => {
            gw.engine.start(&id, data, &gw.init_item, &text, RESPONDER_ID, &key).await
        }
        Entry::Continue => {
            gw.engine.continue_session(&id, data, &text, RESPONDER_ID, &key).await
        }
    };
    if let Err(e) = outcome {
        gw.responder.forget(&key);
        let code = ErrorCode::from(&e);
        tracing::warn!(session_id = %id, err = %e, code = code.as_str(), "ussd request failed");
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = UssdResponse { kind: UssdResponseKind::Release, message: e.to_string() };
        return (status, Json(body)).into_response();
    }

    match tokio::time::timeout(gw.response_timeout, rx).await {
        Ok(Ok(response)) => Json(UssdResponse::from(response)).into_response(),
        _ => {
            gw.responder.forget(&key);
            let body = UssdResponse {
                kind: UssdResponseKind::Release,
                message: "Timeout. Please try again later".to_owned(),
            };
            Json(body).into_response()
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
