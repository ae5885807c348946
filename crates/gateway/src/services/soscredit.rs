// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SOS-credit service (`*130*107#`).
//!
//! An init step derives the Telma msisdn formats, the account details come
//! from the `ucip` backend (which also decides the session language), then
//! the main menu offers transfers, borrowing and reimbursement.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use ussd::{
    Engine, EngineError, Final, Func, Menu, Prompt, Router, ServiceCall, Session, SvcExec,
    SvcWait,
};

use super::ServiceCaller;

pub const ROUTER_ID: &str = "soscredit";

/// Reduce a Telma msisdn to its 9-digit subscriber form.
///
/// Accepts `261…` (12 digits), `0…` (10 digits) or the bare 9 digits, with
/// an optional leading `+`.
fn clean_msisdn(raw: &str) -> Result<String, String> {
    let s = raw.strip_prefix('+').unwrap_or(raw);
    let len = s.len();
    if !(9..=12).contains(&len) || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err("not_9_to_12_digits".to_owned());
    }
    if (len == 12 && s.starts_with("261")) || (len == 10 && s.starts_with('0')) || len == 9 {
        Ok(s[len - 9..].to_owned())
    } else {
        Err("not_a_Telma_number".to_owned())
    }
}

/// Derives the msisdn formats used by the rest of the dialog.
struct Init;

#[async_trait]
impl SvcExec for Init {
    async fn exec(&self, session: &mut Session) -> Result<Vec<String>, EngineError> {
        let Some(msisdn_int) = session.get_str("msisdn").map(str::to_owned) else {
            return Err(EngineError::Service("session has no msisdn".to_owned()));
        };
        let msisdn_sub = clean_msisdn(&msisdn_int)
            .map_err(|e| EngineError::Service(format!("bad msisdn {msisdn_int:?}: {e}")))?;
        session.set("msisdn_nat", format!("0{msisdn_sub}"));
        session.set("msisdn_int", msisdn_int);
        session.set("msisdn_sub", msisdn_sub);
        Ok(Vec::new())
    }
}

/// Fetches account details and selects the session language from them.
struct GetAccountDetails {
    caller: Arc<dyn ServiceCaller>,
}

#[async_trait]
impl SvcWait for GetAccountDetails {
    async fn request(&self, session: &mut Session) -> Result<(), EngineError> {
        let msisdn_sub = session.get_str("msisdn_sub").unwrap_or_default().to_owned();
        let now = Utc::now();
        let request = json!({
            "origin_node_type": "EXT",
            "origin_host_name": "ussdgw",
            "origin_transaction_id": format!("{}{msisdn_sub}", now.timestamp_millis()),
            "origin_time_stamp": now.to_rfc3339(),
            "subscriber_number": msisdn_sub,
            "requested_owner": 1,
        });
        self.caller.call(session.id(), "ucip", "get_account_details", request).await
    }

    async fn process(
        &self,
        session: &mut Session,
        reply: Value,
    ) -> Result<Vec<String>, EngineError> {
        if let Some(err) = reply.get("error") {
            return Err(EngineError::Service(format!("account details failed: {err}")));
        }
        let language =
            if reply.get("language_id_current").and_then(Value::as_str) == Some("1") {
                "FR"
            } else {
                "MG"
            };
        session.set("language", language);
        session.set("account_details", reply);
        Ok(Vec::new())
    }
}

/// One UCIP operation against the subscriber's own account; the reply
/// yields the configured final message.
struct AccountOp {
    caller: Arc<dyn ServiceCaller>,
    operation: &'static str,
    done: &'static str,
}

#[async_trait]
impl SvcWait for AccountOp {
    async fn request(&self, session: &mut Session) -> Result<(), EngineError> {
        let request = json!({
            "subscriber_number": session.get_str("msisdn_sub").unwrap_or_default(),
        });
        self.caller.call(session.id(), "ucip", self.operation, request).await
    }

    async fn process(
        &self,
        _session: &mut Session,
        reply: Value,
    ) -> Result<Vec<String>, EngineError> {
        if let Some(err) = reply.get("error") {
            return Err(EngineError::Service(format!("{} failed: {err}", self.operation)));
        }
        Ok(vec![self.done.to_owned()])
    }
}

/// Credit transfer to the prompted friend's number.
struct Transfer {
    caller: Arc<dyn ServiceCaller>,
}

#[async_trait]
impl SvcWait for Transfer {
    async fn request(&self, session: &mut Session) -> Result<(), EngineError> {
        let friend = session.get_str("friend_msisdn").unwrap_or_default();
        let to = clean_msisdn(friend)
            .map_err(|e| EngineError::Service(format!("bad friend msisdn {friend:?}: {e}")))?;
        let request = json!({
            "subscriber_number": session.get_str("msisdn_sub").unwrap_or_default(),
            "to": to,
        });
        self.caller.call(session.id(), "ucip", "sos_transfer", request).await
    }

    async fn process(
        &self,
        _session: &mut Session,
        reply: Value,
    ) -> Result<Vec<String>, EngineError> {
        if let Some(err) = reply.get("error") {
            return Err(EngineError::Service(format!("sos_transfer failed: {err}")));
        }
        Ok(vec!["sos_friend_done".to_owned()])
    }
}

/// Register the SOS-credit dialog. Returns the service's router id.
pub fn register(
    engine: &mut Engine,
    caller: Arc<dyn ServiceCaller>,
) -> Result<String, EngineError> {
    engine.register_items([
        Func::new("sos_init", Init).into(),
        ServiceCall::new("sos_account", GetAccountDetails { caller: Arc::clone(&caller) })
            .into(),
        Menu::new("sos_menu", "SOS credit")
            .option("SOS credit for a friend", ["sos_ask_friend", "sos_transfer"])
            .option("SOS credit from TELMA", ["sos_borrow"])
            .option("SOS credit offer from TELMA", ["sos_offer_none"])
            .option("SOS credit reimburse", ["sos_reimburse"])
            .option("SOS credit help", ["sos_help"])
            .into(),
        Prompt::new("sos_ask_friend", "Enter the friend's phone number", "friend_msisdn")
            .validator(|input| clean_msisdn(input).map(|_| ()))
            .into(),
        ServiceCall::new("sos_transfer", Transfer { caller: Arc::clone(&caller) }).into(),
        Final::new("sos_friend_done", "SOS credit request sent to <friend_msisdn>.").into(),
        ServiceCall::new(
            "sos_borrow",
            AccountOp {
                caller: Arc::clone(&caller),
                operation: "sos_borrow",
                done: "sos_borrow_done",
            },
        )
        .into(),
        Final::new("sos_borrow_done", "Your SOS credit has been granted.").into(),
        Final::new("sos_offer_none", "No SOS credit offers are available right now.").into(),
        ServiceCall::new(
            "sos_reimburse",
            AccountOp { caller, operation: "sos_reimburse", done: "sos_reimburse_done" },
        )
        .into(),
        Final::new("sos_reimburse_done", "Your SOS credit has been reimbursed. Thank you.")
            .into(),
        Final::new(
            "sos_help",
            "SOS credit lets you borrow airtime or request it from a friend.",
        )
        .into(),
        Router::new(ROUTER_ID).code("*130*107#", ["sos_init", "sos_account", "sos_menu"]).into(),
    ])?;
    Ok(ROUTER_ID.to_owned())
}

#[cfg(test)]
#[path = "soscredit_tests.rs"]
mod tests;
