// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dialog driver.
//!
//! Three entry points — [`Engine::start`], [`Engine::continue_session`] /
//! [`Engine::continue_with_reply`], and [`Engine::abort`] — feed one
//! internal proceed loop that walks the item graph until it either delivers
//! a user-facing response or parks on an outbound service call. All dialog
//! state lives in the session store, so any instance holding the same item
//! registry can resume a parked session.
//!
//! Teardown happens in exactly one place: a fatal error or a delivered
//! final response deletes the session; otherwise the loop has already
//! synced at its park point. Responder send failures are logged and never
//! re-enter the driver.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde_json::Value;

use crate::error::EngineError;
use crate::item::Item;
use crate::respond::{Responder, Response};
use crate::session::{key, Session, SessionStore};

/// How a driver invocation ended.
enum Delivery {
    /// A prompt went out; the session waits for user input.
    Prompt,
    /// A final response went out; the session is over.
    Final,
    /// An outbound service call started; the session waits for its reply.
    Parked,
}

/// Item and responder registries plus the session store.
///
/// Register everything during startup, then share the engine behind an
/// `Arc`; registries are immutable once traffic flows. Item ids must be
/// identical on every instance that can receive a continue for the same
/// session.
pub struct Engine {
    store: Arc<dyn SessionStore>,
    items: HashMap<String, Arc<Item>>,
    responders: HashMap<String, Arc<dyn Responder>>,
}

impl Engine {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store, items: HashMap::new(), responders: HashMap::new() }
    }

    pub fn register_item(&mut self, item: impl Into<Item>) -> Result<(), EngineError> {
        let item = item.into();
        let id = item.id().to_owned();
        if self.items.contains_key(&id) {
            return Err(EngineError::item_config(id, "duplicate item id"));
        }
        tracing::debug!(item = %id, "registered item");
        self.items.insert(id, Arc::new(item));
        Ok(())
    }

    pub fn register_items(
        &mut self,
        items: impl IntoIterator<Item = Item>,
    ) -> Result<(), EngineError> {
        for item in items {
            self.register_item(item)?;
        }
        Ok(())
    }

    pub fn register_responder(&mut self, responder: Arc<dyn Responder>) -> Result<(), EngineError> {
        let id = responder.id().to_owned();
        if self.responders.contains_key(&id) {
            return Err(EngineError::item_config(id, "duplicate responder id"));
        }
        self.responders.insert(id, responder);
        Ok(())
    }

    /// Begin a new session. An existing session with the same id is
    /// overwritten (hijack): the HLR allows one session per subscriber, so
    /// the new dialog wins.
    ///
    /// `init_item` must be a server-side-execute item, typically a
    /// [`crate::item::Router`]; `init_request` is the dialed code.
    pub async fn start(
        &self,
        id: &str,
        data: HashMap<String, Value>,
        init_item: &str,
        init_request: &str,
        responder_id: &str,
        responder_key: &str,
    ) -> Result<(), EngineError> {
        let item = Arc::clone(self.item(init_item)?);
        if !item.executes() {
            return Err(EngineError::item_config(init_item, "init item must execute server-side"));
        }
        if !self.responders.contains_key(responder_id) {
            return Err(EngineError::ResponderNotFound { id: responder_id.to_owned() });
        }

        let record = self.store.create(id, data).await.map_err(EngineError::Store)?;
        let mut session = Session::new(Arc::clone(&self.store), record);
        session.set(key::INIT_REQUEST, init_request);
        session.set(key::INPUT, init_request);
        session.set(key::RESPONDER_ID, responder_id);
        session.set(key::RESPONDER_KEY, responder_key);
        tracing::debug!(session_id = %id, code = %init_request, "session started");

        let outcome = match item.execute(&mut session).await {
            Ok(next) => self.proceed(&mut session, next).await,
            Err(e) => Err(e),
        };
        self.seal(session, outcome).await
    }

    /// Resume a parked session with user input.
    ///
    /// The responder is updated before proceeding so the next response
    /// reaches the transport that carried this input in.
    pub async fn continue_session(
        &self,
        id: &str,
        data: HashMap<String, Value>,
        input: &str,
        responder_id: &str,
        responder_key: &str,
    ) -> Result<(), EngineError> {
        if !self.responders.contains_key(responder_id) {
            return Err(EngineError::ResponderNotFound { id: responder_id.to_owned() });
        }
        let mut session = self.fetch(id).await?;
        for (name, value) in data {
            session.set(name, value);
        }
        session.set(key::RESPONDER_ID, responder_id);
        session.set(key::RESPONDER_KEY, responder_key);
        session.set(key::INPUT, input);

        let current = match self.current_item(&session) {
            Ok(item) => item,
            Err(e) => return self.seal(session, Err(e)).await,
        };
        if !current.handles_input() {
            let err = EngineError::item_config(current.id(), "parked item does not process input");
            return self.seal(session, Err(err)).await;
        }

        let outcome = match current.process_input(&mut session, input) {
            Ok(next) => self.proceed(&mut session, next).await,
            Err(EngineError::InvalidInput(message)) => {
                self.redeliver(&mut session, &current, &message).await
            }
            Err(e) => Err(e),
        };
        self.seal(session, outcome).await
    }

    /// Resume a session parked on a service call with the call's reply.
    ///
    /// Unlike [`Self::continue_session`] this keeps the stored responder:
    /// the reply came from a backend, not from the subscriber's transport.
    pub async fn continue_with_reply(&self, id: &str, reply: Value) -> Result<(), EngineError> {
        let mut session = self.fetch(id).await?;
        let current = match self.current_item(&session) {
            Ok(item) => item,
            Err(e) => return self.seal(session, Err(e)).await,
        };

        let outcome = match current.as_wait() {
            None => Err(EngineError::item_config(
                current.id(),
                "parked item does not process a service reply",
            )),
            Some(svc) => match svc.process(&mut session, reply).await {
                Ok(next) => self.proceed(&mut session, next).await,
                Err(e) => Err(e),
            },
        };
        self.seal(session, outcome).await
    }

    /// Drop a session on the user's request. Never fails from the user's
    /// standpoint; residual store errors are logged.
    pub async fn abort(&self, id: &str) {
        tracing::info!(session_id = %id, "session aborted by user");
        if let Err(e) = self.store.delete(id).await {
            tracing::error!(session_id = %id, err = %e, "failed to delete session on abort");
        }
    }

    // -- Internals ------------------------------------------------------------

    fn item(&self, id: &str) -> Result<&Arc<Item>, EngineError> {
        self.items.get(id).ok_or_else(|| EngineError::item_config(id, "unknown item id"))
    }

    async fn fetch(&self, id: &str) -> Result<Session, EngineError> {
        let record = self
            .store
            .get(id)
            .await
            .map_err(EngineError::Store)?
            .ok_or_else(|| EngineError::SessionNotFound { id: id.to_owned() })?;
        Ok(Session::new(Arc::clone(&self.store), record))
    }

    fn current_item(&self, session: &Session) -> Result<Arc<Item>, EngineError> {
        let Some(id) = session.get_str(key::CURRENT_ITEM_ID) else {
            return Err(EngineError::item_config(session.id(), "session has no current item"));
        };
        Ok(Arc::clone(self.item(id)?))
    }

    /// The state machine. Pops the head of the queue until an item delivers
    /// to the user or starts a service call; server-side items prepend
    /// their yield so it runs before anything already queued.
    async fn proceed(
        &self,
        session: &mut Session,
        pending: Vec<String>,
    ) -> Result<Delivery, EngineError> {
        // Items parked mid-sequence on a previous turn run first.
        let mut queue = take_queued(session);
        queue.extend(pending);

        loop {
            let Some(id) = queue.pop_front() else {
                return Err(EngineError::NoTerminalItem);
            };
            let item = Arc::clone(self.item(&id)?);

            if item.renders() {
                let text = item.render(session).unwrap_or_default();
                if !item.handles_input() {
                    // Terminal message; teardown deletes the session.
                    self.respond(session, Response::final_(text)).await?;
                    tracing::debug!(session_id = %session.id(), item = %id, "delivered final");
                    return Ok(Delivery::Final);
                }
                session.set(key::CURRENT_ITEM_ID, item.id());
                park_queue(session, &queue);
                session.sync().await.map_err(EngineError::Store)?;
                self.respond(session, Response::prompt(text)).await?;
                tracing::debug!(session_id = %session.id(), item = %id, "parked on prompt");
                return Ok(Delivery::Prompt);
            }

            if let Some(svc) = item.as_wait() {
                svc.request(session).await?;
                session.set(key::CURRENT_ITEM_ID, item.id());
                park_queue(session, &queue);
                session.sync().await.map_err(EngineError::Store)?;
                tracing::debug!(session_id = %session.id(), item = %id, "parked on service reply");
                return Ok(Delivery::Parked);
            }

            let next = item.execute(session).await?;
            tracing::debug!(session_id = %session.id(), item = %id, yielded = next.len(), "executed");
            for n in next.into_iter().rev() {
                queue.push_front(n);
            }
        }
    }

    /// Re-render the current prompt with a validator message prefixed.
    /// The session stays parked on the same item.
    async fn redeliver(
        &self,
        session: &mut Session,
        item: &Item,
        message: &str,
    ) -> Result<Delivery, EngineError> {
        let prompt = item.render(session).unwrap_or_default();
        let text =
            if prompt.is_empty() { message.to_owned() } else { format!("{message}\n{prompt}") };
        session.sync().await.map_err(EngineError::Store)?;
        self.respond(session, Response::prompt(text)).await?;
        tracing::debug!(session_id = %session.id(), item = %item.id(), "re-prompted after invalid input");
        Ok(Delivery::Prompt)
    }

    /// Deliver a response through the session's stored responder. Send
    /// failures are logged only; a missing responder is fatal.
    async fn respond(&self, session: &Session, response: Response) -> Result<(), EngineError> {
        let responder_id = session.get_str(key::RESPONDER_ID).unwrap_or_default();
        let Some(responder) = self.responders.get(responder_id) else {
            return Err(EngineError::ResponderNotFound { id: responder_id.to_owned() });
        };
        let responder_key = session.get_str(key::RESPONDER_KEY).unwrap_or_default();
        if let Err(e) = responder.respond(responder_key, response).await {
            tracing::error!(
                session_id = %session.id(),
                responder = responder_id,
                err = %e,
                "responder send failed"
            );
        }
        Ok(())
    }

    /// Single teardown point: fatal error or delivered final deletes the
    /// session; parked outcomes were synced at their park point.
    async fn seal(
        &self,
        session: Session,
        outcome: Result<Delivery, EngineError>,
    ) -> Result<(), EngineError> {
        match outcome {
            Ok(Delivery::Prompt | Delivery::Parked) => Ok(()),
            Ok(Delivery::Final) => {
                tracing::debug!(session_id = %session.id(), "session ended");
                if let Err(e) = self.store.delete(session.id()).await {
                    tracing::error!(session_id = %session.id(), err = %e, "failed to delete session after final");
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(session_id = %session.id(), err = %e, "dialog failed");
                if let Err(de) = self.store.delete(session.id()).await {
                    tracing::error!(session_id = %session.id(), err = %de, "failed to delete session after error");
                }
                Err(e)
            }
        }
    }
}

/// Pull the continuation queue left by a previous park, clearing the key.
fn take_queued(session: &mut Session) -> VecDeque<String> {
    let Some(value) = session.get(key::NEXT_ITEM_IDS) else {
        return VecDeque::new();
    };
    let queued = match value {
        Value::Array(ids) => ids.iter().filter_map(Value::as_str).map(str::to_owned).collect(),
        _ => VecDeque::new(),
    };
    session.del(key::NEXT_ITEM_IDS);
    queued
}

/// Serialize the remaining queue so the next instance can rehydrate it.
fn park_queue(session: &mut Session, queue: &VecDeque<String>) {
    if !queue.is_empty() {
        let ids: Vec<Value> = queue.iter().cloned().map(Value::String).collect();
        session.set(key::NEXT_ITEM_IDS, Value::Array(ids));
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
