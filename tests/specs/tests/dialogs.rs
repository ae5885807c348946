// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end dialog scenarios against an in-process engine.

use serde_json::json;

use ussd::{key, EngineError, ResponseKind};
use ussd_specs::Harness;

// ── Single-step final ─────────────────────────────────────────────────────

#[tokio::test]
async fn single_step_final() -> anyhow::Result<()> {
    let h = Harness::new()?;
    h.start("t:1", "*999#").await?;

    let response = h.responder.last().ok_or_else(|| anyhow::anyhow!("no response"))?;
    assert_eq!(response.kind, ResponseKind::Final);
    assert_eq!(response.message, "bye");
    assert!(h.stored("t:1").await?.is_none());
    Ok(())
}

// ── Prompt + store ────────────────────────────────────────────────────────

#[tokio::test]
async fn prompt_then_store_then_final() -> anyhow::Result<()> {
    let h = Harness::new()?;
    h.start("t:1", "*100#").await?;

    let response = h.responder.last().ok_or_else(|| anyhow::anyhow!("no response"))?;
    assert_eq!(response.kind, ResponseKind::Prompt);
    assert_eq!(response.message, "Name?");

    // Resume correctness: the stored current item is the prompting item.
    let data = h.stored("t:1").await?.ok_or_else(|| anyhow::anyhow!("session gone"))?;
    assert_eq!(data[key::CURRENT_ITEM_ID], json!("ask_name"));

    h.continue_input("t:1", "Alice").await?;
    let response = h.responder.last().ok_or_else(|| anyhow::anyhow!("no response"))?;
    assert_eq!(response.kind, ResponseKind::Final);
    assert_eq!(response.message, "Hi <name>");
    assert!(h.stored("t:1").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn any_instance_can_continue_a_parked_session() -> anyhow::Result<()> {
    let h = Harness::new()?;
    h.start("t:1", "*100#").await?;

    // A second engine over the same store, as another process would be.
    let other = Harness::on_store(h.store.clone(), "other")?;
    other.continue_input("t:1", "Alice").await?;

    let response = other.responder.last().ok_or_else(|| anyhow::anyhow!("no response"))?;
    assert_eq!(response.message, "Hi <name>");
    // The first instance saw only the prompt.
    assert_eq!(h.responder.count(), 1);
    Ok(())
}

// ── Menu selection with leading set ───────────────────────────────────────

#[tokio::test]
async fn queued_items_survive_the_prompt() -> anyhow::Result<()> {
    let h = Harness::new()?;
    h.start("t:1", "*140#").await?;
    h.continue_input("t:1", "1").await?;

    // The set ran, the prompt parked, the service call is still queued.
    let data = h.stored("t:1").await?.ok_or_else(|| anyhow::anyhow!("session gone"))?;
    assert_eq!(data["type"], json!("PCM"));
    assert_eq!(data[key::CURRENT_ITEM_ID], json!("ask_bnumber"));
    assert_eq!(data[key::NEXT_ITEM_IDS], json!(["deliver"]));

    h.continue_input("t:1", "27821230000").await?;
    let data = h.stored("t:1").await?.ok_or_else(|| anyhow::anyhow!("session gone"))?;
    assert_eq!(data["bnumber"], json!("27821230000"));
    assert_eq!(data["request_sent"], json!(true));
    assert_eq!(data[key::CURRENT_ITEM_ID], json!("deliver"));
    Ok(())
}

// ── Invalid menu input ────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_menu_selection_redisplays() -> anyhow::Result<()> {
    let h = Harness::new()?;
    h.start("t:1", "*140#").await?;
    let first = h.responder.last().ok_or_else(|| anyhow::anyhow!("no response"))?;

    h.continue_input("t:1", "9").await?;
    let again = h.responder.last().ok_or_else(|| anyhow::anyhow!("no response"))?;
    assert_eq!(again.kind, ResponseKind::Prompt);
    assert_eq!(again.message, first.message);

    let data = h.stored("t:1").await?.ok_or_else(|| anyhow::anyhow!("session gone"))?;
    assert_eq!(data[key::CURRENT_ITEM_ID], json!("send_menu"));
    Ok(())
}

// ── Abort ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn abort_then_continue_fails() -> anyhow::Result<()> {
    let h = Harness::new()?;
    h.start("t:1", "*100#").await?;
    h.engine.abort("t:1").await;

    assert!(h.stored("t:1").await?.is_none());
    let err = h.continue_input("t:1", "Alice").await;
    assert!(matches!(err, Err(EngineError::SessionNotFound { .. })));
    Ok(())
}

// ── Service wait roundtrip ────────────────────────────────────────────────

#[tokio::test]
async fn service_wait_roundtrip() -> anyhow::Result<()> {
    let h = Harness::new()?;
    h.start("t:1", "*140#").await?;
    h.continue_input("t:1", "1").await?;
    h.continue_input("t:1", "27821230000").await?;

    // Parked without a user-facing response for the service turn.
    assert_eq!(h.responder.count(), 2);
    let data = h.stored("t:1").await?.ok_or_else(|| anyhow::anyhow!("session gone"))?;
    assert_eq!(data[key::CURRENT_ITEM_ID], json!("deliver"));

    h.engine.continue_with_reply("t:1", json!({"status": "sent"})).await?;
    let response = h.responder.last().ok_or_else(|| anyhow::anyhow!("no response"))?;
    assert_eq!(response.kind, ResponseKind::Final);
    assert_eq!(response.message, "Delivered");
    assert!(h.stored("t:1").await?.is_none());
    Ok(())
}

// ── Isolation and hijack ──────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_sessions_do_not_interfere() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let (a, b) = tokio::join!(h.start("t:a", "*100#"), h.start("t:b", "*140#"));
    a?;
    b?;

    let data_a = h.stored("t:a").await?.ok_or_else(|| anyhow::anyhow!("t:a gone"))?;
    let data_b = h.stored("t:b").await?.ok_or_else(|| anyhow::anyhow!("t:b gone"))?;
    assert_eq!(data_a[key::CURRENT_ITEM_ID], json!("ask_name"));
    assert_eq!(data_b[key::CURRENT_ITEM_ID], json!("send_menu"));

    h.continue_input("t:a", "Alice").await?;
    assert!(h.stored("t:a").await?.is_none());
    assert!(h.stored("t:b").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn restart_hijacks_the_subscriber_session() -> anyhow::Result<()> {
    let h = Harness::new()?;
    h.start("t:1", "*100#").await?;
    // Same subscriber dials again: the old dialog is gone.
    h.start("t:1", "*140#").await?;

    let data = h.stored("t:1").await?.ok_or_else(|| anyhow::anyhow!("session gone"))?;
    assert_eq!(data[key::CURRENT_ITEM_ID], json!("send_menu"));
    assert_eq!(data[key::INIT_REQUEST], json!("*140#"));

    // Input meant for the old prompt now answers the menu.
    h.continue_input("t:1", "2").await?;
    let response = h.responder.last().ok_or_else(|| anyhow::anyhow!("no response"))?;
    assert_eq!(response.message, "bye");
    Ok(())
}
