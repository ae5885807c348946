// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use crate::error::EngineError;
use crate::session::{MemoryStore, Session, SessionStore};

use super::Prompt;

async fn blank_session() -> anyhow::Result<Session> {
    let store = Arc::new(MemoryStore::new());
    let record = store.create("t:1", HashMap::new()).await?;
    Ok(Session::new(store as Arc<dyn SessionStore>, record))
}

fn bnumber_prompt() -> Prompt {
    Prompt::new("ask_bnumber", "Enter phone number", "bnumber")
        .validator(|input| {
            if input.chars().all(|c| c.is_ascii_digit()) {
                Ok(())
            } else {
                Err("Digits only".to_owned())
            }
        })
        .validator(|input| {
            if (10..=15).contains(&input.len()) {
                Ok(())
            } else {
                Err("Enter 10 to 15 digits".to_owned())
            }
        })
}

#[tokio::test]
async fn valid_input_is_stored_and_yields_nothing() -> anyhow::Result<()> {
    let mut session = blank_session().await?;
    let next = bnumber_prompt().process(&mut session, "27821230000")?;
    assert!(next.is_empty());
    assert_eq!(session.get("bnumber"), Some(&json!("27821230000")));
    Ok(())
}

#[tokio::test]
async fn first_failing_validator_wins() -> anyhow::Result<()> {
    let mut session = blank_session().await?;
    // Fails both checks; the digits-only message must surface.
    match bnumber_prompt().process(&mut session, "abc") {
        Err(EngineError::InvalidInput(msg)) => assert_eq!(msg, "Digits only"),
        other => anyhow::bail!("expected InvalidInput, got {other:?}"),
    }
    assert!(session.get("bnumber").is_none());
    Ok(())
}

#[tokio::test]
async fn length_validator_rejects_short_input() -> anyhow::Result<()> {
    let mut session = blank_session().await?;
    match bnumber_prompt().process(&mut session, "082") {
        Err(EngineError::InvalidInput(msg)) => assert_eq!(msg, "Enter 10 to 15 digits"),
        other => anyhow::bail!("expected InvalidInput, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn prompt_without_validators_accepts_anything() -> anyhow::Result<()> {
    let mut session = blank_session().await?;
    let prompt = Prompt::new("ask_name", "Enter your name:", "name");
    prompt.process(&mut session, "Alice")?;
    assert_eq!(session.get("name"), Some(&json!("Alice")));
    Ok(())
}
