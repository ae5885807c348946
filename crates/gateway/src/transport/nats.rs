// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NATS request/reply transport.
//!
//! Requests arrive on `<domain>.*`; one instance of the queue group
//! `Q.<domain>.*` handles each (broadcast mode drops the group). Outbound
//! service calls publish on `<service>.<operation>` with a per-request
//! reply subject under this instance's inbox prefix; replies are matched
//! through a correlation map and fed back into the driver as a continue.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use ussd::{Engine, EngineError, Responder, Response};

use crate::error::ErrorCode;
use crate::msg::{
    timestamp_now, Message, MessageHeader, RequestKind, ServiceAddress, UssdRequest,
    UssdResponse,
};
use crate::services::ServiceCaller;

/// Responder id stored in sessions started over NATS.
pub const RESPONDER_ID: &str = "nats";

#[derive(Debug, Clone)]
pub struct NatsConfig {
    pub url: String,
    pub domain: String,
    /// Subscribe without a queue group; every instance sees every request.
    pub broadcast: bool,
    pub token: Option<String>,
    /// TTL for outbound service calls.
    pub request_ttl: Duration,
}

struct Shared {
    client: async_nats::Client,
    domain: String,
    broadcast: bool,
    init_item: String,
    reply_prefix: String,
    request_ttl: Duration,
    pending: parking_lot::Mutex<HashMap<String, oneshot::Sender<Message>>>,
    engine: OnceLock<Arc<Engine>>,
}

/// NATS side of the gateway. Cheap to clone; all clones share one
/// connection and correlation map.
#[derive(Clone)]
pub struct NatsGateway {
    shared: Arc<Shared>,
}

impl NatsGateway {
    pub async fn connect(config: &NatsConfig, init_item: &str) -> anyhow::Result<Self> {
        let opts = match &config.token {
            Some(token) => async_nats::ConnectOptions::with_token(token.clone()),
            None => async_nats::ConnectOptions::new(),
        };
        let client = opts.connect(&config.url).await?;
        let reply_prefix = format!("{}.", client.new_inbox());
        tracing::info!(url = %config.url, domain = %config.domain, "nats transport connected");
        Ok(Self {
            shared: Arc::new(Shared {
                client,
                domain: config.domain.clone(),
                broadcast: config.broadcast,
                init_item: init_item.to_owned(),
                reply_prefix,
                request_ttl: config.request_ttl,
                pending: parking_lot::Mutex::new(HashMap::new()),
                engine: OnceLock::new(),
            }),
        })
    }

    /// Wire the engine in after registration is complete. Must happen
    /// before `run`.
    pub fn bind_engine(&self, engine: Arc<Engine>) {
        let _ = self.shared.engine.set(engine);
    }

    /// Responder delivering responses to reply subjects.
    pub fn responder(&self) -> Arc<NatsResponder> {
        Arc::new(NatsResponder { client: self.shared.client.clone() })
    }

    /// Subscribe and pump messages until shutdown.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let shared = &self.shared;
        let subject = format!("{}.*", shared.domain);
        let mut requests = if shared.broadcast {
            shared.client.subscribe(subject.clone()).await?
        } else {
            shared.client.queue_subscribe(subject.clone(), format!("Q.{subject}")).await?
        };
        let mut replies =
            shared.client.subscribe(format!("{}*", shared.reply_prefix)).await?;
        tracing::info!(subject = %subject, broadcast = shared.broadcast, "nats transport running");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = requests.next() => {
                    let Some(msg) = msg else { break };
                    let gateway = self.clone();
                    tokio::spawn(async move {
                        gateway.handle_request(msg).await;
                    });
                }
                msg = replies.next() => {
                    let Some(msg) = msg else { break };
                    self.handle_reply(&msg);
                }
            }
        }

        Ok(())
    }

    async fn handle_request(&self, msg: async_nats::Message) {
        let reply_to = msg.reply.as_ref().map(|s| s.to_string());

        let envelope: Message = match serde_json::from_slice(&msg.payload) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(err = %e, "discarding unparseable request");
                self.send_failure(reply_to.as_deref(), -2, format!("bad envelope: {e}")).await;
                return;
            }
        };
        // Replies and failure results do not belong on a request subject.
        if envelope.is_reply() {
            tracing::debug!(subject = %msg.subject, "discarding reply on request subject");
            return;
        }
        let request: UssdRequest = match envelope
            .request
            .ok_or_else(|| "missing request".to_owned())
            .and_then(|v| serde_json::from_value(v).map_err(|e| e.to_string()))
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(err = %e, "discarding invalid request payload");
                self.send_failure(reply_to.as_deref(), -2, e).await;
                return;
            }
        };
        if let Err(e) = request.validate() {
            tracing::debug!(err = %e, "discarding invalid request");
            self.send_failure(reply_to.as_deref(), -2, e).await;
            return;
        }

        // The responder key is the caller's reply address; fall back to the
        // core reply subject.
        let responder_key = envelope
            .header
            .reply_address
            .clone()
            .or_else(|| reply_to.clone())
            .unwrap_or_default();

        let Some(engine) = self.shared.engine.get() else {
            tracing::error!("nats request before engine was bound");
            self.send_failure(reply_to.as_deref(), -1, "not ready").await;
            return;
        };

        let id = format!("nats:{}", request.msisdn);
        let data = HashMap::from([("msisdn".to_owned(), Value::String(request.msisdn.clone()))]);

        let outcome = match request.kind {
            RequestKind::Request => {
                engine
                    .start(&id, data, &self.shared.init_item, &request.text, RESPONDER_ID, &responder_key)
                    .await
            }
            RequestKind::Response => {
                engine
                    .continue_session(&id, data, &request.text, RESPONDER_ID, &responder_key)
                    .await
            }
            RequestKind::Release => {
                engine.abort(&id).await;
                Ok(())
            }
        };

        if let Err(e) = outcome {
            let code = ErrorCode::from(&e);
            tracing::warn!(session_id = %id, err = %e, code = code.as_str(), "ussd request failed");
            // The responder never fired for this turn; answer with a
            // release carrying the failure.
            let mut reply = Message::failure(code.result_code(), e.to_string());
            reply.response = serde_json::to_value(UssdResponse {
                kind: crate::msg::UssdResponseKind::Release,
                message: "Service unavailable. Please try again later".to_owned(),
            })
            .ok();
            self.send(&responder_key, &reply).await;
        }
    }

    fn handle_reply(&self, msg: &async_nats::Message) {
        let subject = msg.subject.as_str();
        let Some(sender) = self.shared.pending.lock().remove(subject) else {
            tracing::debug!(subject = %subject, "discarding reply with no waiter");
            return;
        };
        match serde_json::from_slice::<Message>(&msg.payload) {
            Ok(envelope) => {
                let _ = sender.send(envelope);
            }
            Err(e) => {
                tracing::warn!(subject = %subject, err = %e, "unparseable service reply");
                let _ = sender.send(Message::failure(-1, format!("bad reply: {e}")));
            }
        }
    }

    async fn send_failure(&self, reply_to: Option<&str>, code: i32, details: impl Into<String>) {
        let Some(subject) = reply_to else { return };
        self.send(subject, &Message::failure(code, details)).await;
    }

    async fn send(&self, subject: &str, message: &Message) {
        if subject.is_empty() {
            return;
        }
        let payload = match serde_json::to_vec(message) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(err = %e, "failed to serialize message");
                return;
            }
        };
        if let Err(e) = self.shared.client.publish(subject.to_owned(), payload.into()).await {
            tracing::error!(subject = %subject, err = %e, "nats publish failed");
        }
    }
}

/// Translate a completed service call into the reply value handed to the
/// parked item: a non-zero result header becomes `{"error": {...}}`.
fn reply_value(envelope: Message) -> Value {
    if let Some(result) = &envelope.header.result {
        if result.code != 0 {
            return serde_json::json!({ "error": result });
        }
    }
    envelope.response.unwrap_or(Value::Null)
}

#[async_trait]
impl ServiceCaller for NatsGateway {
    async fn call(
        &self,
        session_id: &str,
        service: &str,
        operation: &str,
        request: Value,
    ) -> Result<(), EngineError> {
        let shared = &self.shared;
        let reply_subject =
            format!("{}{}", shared.reply_prefix, uuid::Uuid::new_v4().simple());
        let (tx, rx) = oneshot::channel();
        shared.pending.lock().insert(reply_subject.clone(), tx);

        let envelope = Message {
            header: MessageHeader {
                timestamp: timestamp_now(),
                ttl: shared.request_ttl.as_millis() as u64,
                reply_address: Some(reply_subject.clone()),
                provider: Some(ServiceAddress::provider(service, operation)),
                ..MessageHeader::default()
            },
            request: Some(request),
            response: None,
        };
        let payload = serde_json::to_vec(&envelope)
            .map_err(|e| EngineError::Service(format!("failed to encode request: {e}")))?;

        let subject = format!("{service}.{operation}");
        if let Err(e) = shared.client.publish(subject.clone(), payload.into()).await {
            shared.pending.lock().remove(&reply_subject);
            return Err(EngineError::Service(format!("publish to {subject} failed: {e}")));
        }
        tracing::debug!(session_id, subject = %subject, reply = %reply_subject, "service call sent");

        // Await the reply off the driver's back; the continuation re-enters
        // the engine whenever it lands.
        let shared = Arc::clone(shared);
        let session_id = session_id.to_owned();
        tokio::spawn(async move {
            let reply = match tokio::time::timeout(shared.request_ttl, rx).await {
                Ok(Ok(envelope)) => reply_value(envelope),
                Ok(Err(_)) => serde_json::json!({
                    "error": { "code": -1, "description": "reply channel closed" }
                }),
                Err(_) => {
                    shared.pending.lock().remove(&reply_subject);
                    serde_json::json!({
                        "error": { "code": -99, "description": "timeout waiting for service reply" }
                    })
                }
            };
            let Some(engine) = shared.engine.get() else {
                tracing::error!(session_id = %session_id, "service reply with no engine bound");
                return;
            };
            if let Err(e) = engine.continue_with_reply(&session_id, reply).await {
                tracing::warn!(session_id = %session_id, err = %e, "service reply continuation failed");
            }
        });
        Ok(())
    }
}

/// Delivers engine responses to the stored reply subject.
pub struct NatsResponder {
    client: async_nats::Client,
}

#[async_trait]
impl Responder for NatsResponder {
    fn id(&self) -> &str {
        RESPONDER_ID
    }

    async fn respond(&self, key: &str, response: Response) -> anyhow::Result<()> {
        if key.is_empty() {
            anyhow::bail!("no reply subject for response");
        }
        let envelope = Message {
            header: MessageHeader { timestamp: timestamp_now(), ..MessageHeader::default() },
            request: None,
            response: serde_json::to_value(UssdResponse::from(response)).ok(),
        };
        let payload = serde_json::to_vec(&envelope)?;
        self.client.publish(key.to_owned(), payload.into()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "nats_tests.rs"]
mod tests;
