// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;

use crate::session::{MemoryStore, Session, SessionStore};

use super::Menu;

fn sample_menu() -> Menu {
    Menu::new("main", "-Call Me Menu-")
        .option("Send Call Me", ["set_pcm", "ask_bnumber", "deliver"])
        .option("Send Recharge Me", ["set_prm", "ask_bnumber", "deliver"])
        .option("Help", ["help"])
}

async fn blank_session() -> anyhow::Result<Session> {
    let store = Arc::new(MemoryStore::new());
    let record = store.create("t:1", HashMap::new()).await?;
    Ok(Session::new(store as Arc<dyn SessionStore>, record))
}

#[tokio::test]
async fn render_numbers_options_from_one() -> anyhow::Result<()> {
    let session = blank_session().await?;
    assert_eq!(
        sample_menu().render(&session),
        "-Call Me Menu-\n1. Send Call Me\n2. Send Recharge Me\n3. Help"
    );
    Ok(())
}

#[yare::parameterized(
    first = { "1", &["set_pcm", "ask_bnumber", "deliver"] },
    second = { "2", &["set_prm", "ask_bnumber", "deliver"] },
    last = { "3", &["help"] },
    padded = { " 2 ", &["set_prm", "ask_bnumber", "deliver"] },
)]
fn valid_selection_yields_the_option_items(input: &str, expected: &[&str]) {
    assert_eq!(sample_menu().select(input), expected);
}

#[yare::parameterized(
    zero = { "0" },
    out_of_range = { "9" },
    negative = { "-1" },
    text = { "first" },
    empty = { "" },
)]
fn invalid_selection_redisplays_the_menu(input: &str) {
    assert_eq!(sample_menu().select(input), vec!["main".to_owned()]);
}
