// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harness for end-to-end dialog scenarios: an engine over a shared
//! in-memory store, a recording responder, and a service-wait stub.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use ussd::{
    Engine, EngineError, Final, MemoryStore, Menu, Prompt, Responder, Response, Router,
    ServiceCall, Session, SessionStore, SetVar, SvcWait,
};

/// Records every delivery for assertions.
pub struct TestResponder {
    id: String,
    pub sent: parking_lot::Mutex<Vec<(String, Response)>>,
}

impl TestResponder {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self { id: id.to_owned(), sent: parking_lot::Mutex::new(Vec::new()) })
    }

    pub fn last(&self) -> Option<Response> {
        self.sent.lock().last().map(|(_, r)| r.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Responder for TestResponder {
    fn id(&self) -> &str {
        &self.id
    }

    async fn respond(&self, key: &str, response: Response) -> anyhow::Result<()> {
        self.sent.lock().push((key.to_owned(), response));
        Ok(())
    }
}

/// Service-wait stub: marks the request in the session, yields the
/// configured items when the reply arrives.
pub struct StubDeliver {
    pub on_reply: Vec<String>,
}

#[async_trait]
impl SvcWait for StubDeliver {
    async fn request(&self, session: &mut Session) -> Result<(), EngineError> {
        session.set("request_sent", true);
        Ok(())
    }

    async fn process(
        &self,
        session: &mut Session,
        reply: Value,
    ) -> Result<Vec<String>, EngineError> {
        if let Some(err) = reply.get("error") {
            return Err(EngineError::Service(err.to_string()));
        }
        session.set("service_reply", reply);
        Ok(self.on_reply.clone())
    }
}

/// The scenario graph:
///
/// - `*999#` → Final "bye"
/// - `*100#` → Prompt "Name?" → Final "Hi <name>"
/// - `*140#` → Menu; option "Send Call Me" → Set(type=PCM) +
///   Prompt "bnumber?" + ServiceCall(deliver) → Final "Delivered"
pub fn register_graph(engine: &mut Engine) -> Result<(), EngineError> {
    engine.register_items([
        Final::new("bye", "bye").into(),
        Prompt::new("ask_name", "Name?", "name").into(),
        Final::new("greet", "Hi <name>").into(),
        Menu::new("send_menu", "-Send-")
            .option("Send Call Me", ["set_type", "ask_bnumber", "deliver"])
            .option("Exit", ["bye"])
            .into(),
        SetVar::new("set_type", "type", json!("PCM")).into(),
        Prompt::new("ask_bnumber", "bnumber?", "bnumber").into(),
        ServiceCall::new("deliver", StubDeliver { on_reply: vec!["delivered".to_owned()] })
            .into(),
        Final::new("delivered", "Delivered").into(),
        Router::new("main")
            .code("*999#", ["bye"])
            .code("*100#", ["ask_name", "greet"])
            .code("*140#", ["send_menu"])
            .into(),
    ])
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub store: Arc<MemoryStore>,
    pub responder: Arc<TestResponder>,
}

impl Harness {
    /// Fresh engine + store + responder with the scenario graph.
    pub fn new() -> anyhow::Result<Self> {
        Self::on_store(Arc::new(MemoryStore::new()), "test")
    }

    /// Another engine instance over an existing store, as a second
    /// process resuming hand-offs would be.
    pub fn on_store(store: Arc<MemoryStore>, responder_id: &str) -> anyhow::Result<Self> {
        let responder = TestResponder::new(responder_id);
        let mut engine = Engine::new(Arc::clone(&store) as Arc<dyn SessionStore>);
        engine.register_responder(Arc::clone(&responder) as Arc<dyn Responder>)?;
        register_graph(&mut engine)?;
        Ok(Self { engine: Arc::new(engine), store, responder })
    }

    pub async fn start(&self, id: &str, code: &str) -> Result<(), EngineError> {
        self.engine
            .start(id, HashMap::new(), "main", code, self.responder.id(), "key-1")
            .await
    }

    pub async fn continue_input(&self, id: &str, input: &str) -> Result<(), EngineError> {
        self.engine
            .continue_session(id, HashMap::new(), input, self.responder.id(), "key-1")
            .await
    }

    pub async fn stored(&self, id: &str) -> anyhow::Result<Option<HashMap<String, Value>>> {
        Ok(self.store.get(id).await?.map(|record| record.data))
    }
}
