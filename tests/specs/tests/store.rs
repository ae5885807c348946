// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `HttpStore` against the real `sessiond` service over loopback TCP.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::json;

use ussd::{key, HttpStore, SessionStore};
use ussd_specs::{register_graph, TestResponder};
use ussdgw::sessiond::{build_router, StoreState};

/// Serve sessiond on an ephemeral port; returns its base URL.
async fn spawn_sessiond() -> anyhow::Result<String> {
    let router = build_router(StoreState::new());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            eprintln!("sessiond test server failed: {e}");
        }
    });
    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn http_store_crud_roundtrip() -> anyhow::Result<()> {
    let store = HttpStore::new(spawn_sessiond().await?);

    let record = store
        .create("nats:27821234567", HashMap::from([("msisdn".to_owned(), json!("27821234567"))]))
        .await?;
    assert_eq!(record.data["msisdn"], json!("27821234567"));

    let set = HashMap::from([("name".to_owned(), json!("Alice")), ("drop".to_owned(), json!(1))]);
    store.sync("nats:27821234567", set, HashSet::new()).await?;
    store
        .sync(
            "nats:27821234567",
            HashMap::new(),
            HashSet::from(["drop".to_owned()]),
        )
        .await?;

    let record = store
        .get("nats:27821234567")
        .await?
        .ok_or_else(|| anyhow::anyhow!("session missing"))?;
    assert_eq!(record.data["name"], json!("Alice"));
    assert!(!record.data.contains_key("drop"));

    store.delete("nats:27821234567").await?;
    assert!(store.get("nats:27821234567").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn sync_creates_a_missing_session() -> anyhow::Result<()> {
    let store = HttpStore::new(spawn_sessiond().await?);
    store
        .sync("nats:1", HashMap::from([("a".to_owned(), json!(1))]), HashSet::new())
        .await?;

    let record = store.get("nats:1").await?.ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(record.data["a"], json!(1));
    Ok(())
}

/// The full driver path with state externalized over HTTP: a session
/// started by one engine instance resumes on another.
#[tokio::test]
async fn dialog_resumes_across_instances_via_sessiond() -> anyhow::Result<()> {
    let base_url = spawn_sessiond().await?;

    let build = |responder_id: &str| -> anyhow::Result<(Arc<ussd::Engine>, Arc<TestResponder>)> {
        let responder = TestResponder::new(responder_id);
        let mut engine =
            ussd::Engine::new(Arc::new(HttpStore::new(&base_url)) as Arc<dyn SessionStore>);
        engine.register_responder(Arc::clone(&responder) as Arc<dyn ussd::Responder>)?;
        register_graph(&mut engine)?;
        Ok((Arc::new(engine), responder))
    };

    let (first, first_responder) = build("test")?;
    let (second, second_responder) = build("other")?;

    first.start("t:1", HashMap::new(), "main", "*100#", "test", "key-1").await?;
    let response =
        first_responder.last().ok_or_else(|| anyhow::anyhow!("no prompt delivered"))?;
    assert_eq!(response.message, "Name?");

    second.continue_session("t:1", HashMap::new(), "Alice", "other", "key-2").await?;
    let response =
        second_responder.last().ok_or_else(|| anyhow::anyhow!("no final delivered"))?;
    assert_eq!(response.message, "Hi <name>");

    // Terminal cleanup reached the remote store.
    let probe = HttpStore::new(&base_url);
    assert!(probe.get("t:1").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn parked_state_is_visible_in_the_remote_store() -> anyhow::Result<()> {
    let base_url = spawn_sessiond().await?;
    let responder = TestResponder::new("test");
    let mut engine =
        ussd::Engine::new(Arc::new(HttpStore::new(&base_url)) as Arc<dyn SessionStore>);
    engine.register_responder(Arc::clone(&responder) as Arc<dyn ussd::Responder>)?;
    register_graph(&mut engine)?;

    engine.start("t:1", HashMap::new(), "main", "*140#", "test", "key-1").await?;
    engine.continue_session("t:1", HashMap::new(), "1", "test", "key-1").await?;

    let probe = HttpStore::new(&base_url);
    let record = probe.get("t:1").await?.ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(record.data[key::CURRENT_ITEM_ID], json!("ask_bnumber"));
    assert_eq!(record.data[key::NEXT_ITEM_IDS], json!(["deliver"]));
    Ok(())
}

#[tokio::test]
async fn get_against_a_dead_store_is_an_error_not_none() {
    // Nothing listens here; the store must fail loudly, not report
    // not-found.
    let store = HttpStore::new("http://127.0.0.1:9");
    assert!(store.get("t:1").await.is_err());
}
