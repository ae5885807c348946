// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call-me / recharge-me service.
//!
//! `*140#` opens the menu; `*140*<bnumber>#` sends a call-me directly to
//! the captured number. Subscriber profile reads and writes and message
//! delivery go through the `profile` and `sms` backends.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use ussd::{
    Engine, EngineError, Final, Menu, Prompt, Router, ServiceCall, Session, SetVar, SvcWait,
};

use super::ServiceCaller;

pub const ROUTER_ID: &str = "callme";

fn valid_bnumber(input: &str) -> Result<(), String> {
    let digits = input.chars().all(|c| c.is_ascii_digit());
    if digits && (10..=15).contains(&input.len()) {
        Ok(())
    } else {
        Err("Enter a phone number of 10 to 15 digits".to_owned())
    }
}

fn reply_error(reply: &Value) -> Option<String> {
    reply.get("error").map(Value::to_string)
}

/// Sends the call-me / recharge-me SMS to the stored `bnumber`.
struct Deliver {
    caller: Arc<dyn ServiceCaller>,
}

#[async_trait]
impl SvcWait for Deliver {
    async fn request(&self, session: &mut Session) -> Result<(), EngineError> {
        let request = json!({
            "msisdn": session.get_str("msisdn").unwrap_or_default(),
            "bnumber": session.get_str("bnumber").unwrap_or_default(),
            "type": session.get_str("type").unwrap_or("PCM"),
        });
        self.caller.call(session.id(), "sms", "deliver", request).await
    }

    async fn process(
        &self,
        _session: &mut Session,
        reply: Value,
    ) -> Result<Vec<String>, EngineError> {
        if let Some(err) = reply_error(&reply) {
            return Err(EngineError::Service(format!("delivery failed: {err}")));
        }
        Ok(vec!["callme_delivered".to_owned()])
    }
}

/// Loads profile values into the session under their profile names.
struct ProfileGet {
    caller: Arc<dyn ServiceCaller>,
    names: Vec<&'static str>,
}

#[async_trait]
impl SvcWait for ProfileGet {
    async fn request(&self, session: &mut Session) -> Result<(), EngineError> {
        let request = json!({
            "msisdn": session.get_str("msisdn").unwrap_or_default(),
            "names": self.names,
        });
        self.caller.call(session.id(), "profile", "get", request).await
    }

    async fn process(
        &self,
        session: &mut Session,
        reply: Value,
    ) -> Result<Vec<String>, EngineError> {
        if let Some(err) = reply_error(&reply) {
            return Err(EngineError::Service(format!("profile read failed: {err}")));
        }
        if let Some(values) = reply.get("values").and_then(Value::as_object) {
            for (name, value) in values {
                session.set(name.clone(), value.clone());
            }
        }
        Ok(Vec::new())
    }
}

/// Writes one session value to the subscriber profile.
struct ProfileSet {
    caller: Arc<dyn ServiceCaller>,
    /// Profile attribute to write.
    name: &'static str,
    /// Session key holding the value.
    from: &'static str,
}

#[async_trait]
impl SvcWait for ProfileSet {
    async fn request(&self, session: &mut Session) -> Result<(), EngineError> {
        let value = session.get(self.from).cloned().unwrap_or(Value::Null);
        let request = json!({
            "msisdn": session.get_str("msisdn").unwrap_or_default(),
            "name": self.name,
            "value": value,
        });
        self.caller.call(session.id(), "profile", "set", request).await
    }

    async fn process(
        &self,
        _session: &mut Session,
        reply: Value,
    ) -> Result<Vec<String>, EngineError> {
        if let Some(err) = reply_error(&reply) {
            return Err(EngineError::Service(format!("profile write failed: {err}")));
        }
        Ok(Vec::new())
    }
}

/// Register the call-me dialog. Returns the service's router id.
pub fn register(
    engine: &mut Engine,
    caller: Arc<dyn ServiceCaller>,
) -> Result<String, EngineError> {
    engine.register_items([
        Menu::new("callme_menu", "-Call Me Menu-")
            .option("Block/Unblock Call Me Messages", ["callme_block_menu"])
            .option(
                "Send Recharge Me",
                ["callme_set_prm", "callme_ask_bnumber", "callme_deliver"],
            )
            .option("Send Call Me", ["callme_set_pcm", "callme_ask_bnumber", "callme_deliver"])
            .option("Change Name", ["callme_ask_name", "callme_save_name", "callme_name_saved"])
            .option("Display Name", ["callme_load_name", "callme_show_name"])
            .option("PCM/PRM Balance", ["callme_load_balance", "callme_balances"])
            .option("Disable/Enable Adverts", ["callme_advert_menu"])
            .into(),
        Menu::new("callme_block_menu", "-Call Me Messages-")
            .option(
                "Unblock Call Me Messages",
                ["callme_unblock", "callme_save_blocked", "callme_unblocked"],
            )
            .option(
                "Block Call Me Messages",
                ["callme_block", "callme_save_blocked", "callme_blocked"],
            )
            .into(),
        SetVar::new("callme_unblock", "pcm_blocked", false).into(),
        SetVar::new("callme_block", "pcm_blocked", true).into(),
        ServiceCall::new(
            "callme_save_blocked",
            ProfileSet { caller: Arc::clone(&caller), name: "pcm_blocked", from: "pcm_blocked" },
        )
        .into(),
        Final::new("callme_unblocked", "PCM/PRM Messages unblocked.").into(),
        Final::new("callme_blocked", "PCM/PRM Messages blocked.").into(),
        Menu::new("callme_advert_menu", "-Call Me Adverts-")
            .option(
                "Unblock Adverts",
                ["callme_adverts_on", "callme_save_adverts", "callme_adverts_unblocked"],
            )
            .option(
                "Block Adverts",
                ["callme_adverts_off", "callme_save_adverts", "callme_adverts_blocked"],
            )
            .into(),
        SetVar::new("callme_adverts_on", "pcm_adverts", true).into(),
        SetVar::new("callme_adverts_off", "pcm_adverts", false).into(),
        ServiceCall::new(
            "callme_save_adverts",
            ProfileSet { caller: Arc::clone(&caller), name: "pcm_adverts", from: "pcm_adverts" },
        )
        .into(),
        Final::new("callme_adverts_unblocked", "PCM Adverts unblocked.").into(),
        Final::new("callme_adverts_blocked", "PCM Adverts blocked.").into(),
        SetVar::new("callme_set_prm", "type", "PRM").into(),
        SetVar::new("callme_set_pcm", "type", "PCM").into(),
        Prompt::new("callme_ask_bnumber", "Enter phone number", "bnumber")
            .validator(valid_bnumber)
            .into(),
        ServiceCall::new("callme_deliver", Deliver { caller: Arc::clone(&caller) }).into(),
        Final::new("callme_delivered", "Call Me delivered to <bnumber>").into(),
        Prompt::new("callme_ask_name", "Enter your name:", "pcm_name").into(),
        ServiceCall::new(
            "callme_save_name",
            ProfileSet { caller: Arc::clone(&caller), name: "pcm_name", from: "pcm_name" },
        )
        .into(),
        Final::new(
            "callme_name_saved",
            "Your name was changed to <pcm_name>. You may change it again in 1 day.",
        )
        .into(),
        ServiceCall::new(
            "callme_load_name",
            ProfileGet { caller: Arc::clone(&caller), names: vec!["pcm_name"] },
        )
        .into(),
        Final::new("callme_show_name", "Your name is <pcm_name>").into(),
        ServiceCall::new(
            "callme_load_balance",
            ProfileGet { caller, names: vec!["pcm_balance", "prm_balance"] },
        )
        .into(),
        Final::new(
            "callme_balances",
            "Your Call Me balance: <pcm_balance>\nYour Recharge Me balance: <prm_balance>",
        )
        .into(),
        Router::new(ROUTER_ID)
            .code("*140#", ["callme_menu"])
            .regex(
                r"\*140\*([0-9]{10,15})#",
                ["bnumber"],
                ["callme_set_pcm", "callme_deliver"],
            )?
            .into(),
    ])?;
    Ok(ROUTER_ID.to_owned())
}

#[cfg(test)]
#[path = "callme_tests.rs"]
mod tests;
