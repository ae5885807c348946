// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NATS message envelope and USSD wire payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ussd::ResponseKind;

/// Header timestamp format, millisecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn is_zero(ttl: &u64) -> bool {
    *ttl == 0
}

/// Envelope around every request and response on the bus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl Message {
    /// True for messages that must not be handled on a request subject:
    /// anything already carrying a response or a result header.
    pub fn is_reply(&self) -> bool {
        self.response.is_some() || self.header.result.is_some()
    }

    /// Error reply with the given result code and details.
    pub fn failure(code: i32, details: impl Into<String>) -> Self {
        Self {
            header: MessageHeader {
                timestamp: timestamp_now(),
                result: Some(ResultHeader {
                    code,
                    description: "failed".to_owned(),
                    details: details.into(),
                }),
                ..MessageHeader::default()
            },
            request: None,
            response: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageHeader {
    #[serde(default)]
    pub timestamp: String,
    /// Request time-to-live in milliseconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub ttl: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_address: Option<String>,
    #[serde(default)]
    pub echo_request: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ServiceAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer: Option<ServiceAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultHeader {
    pub code: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
}

/// Service endpoint address; `name` is `"/<domain>/<operation>"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceAddress {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sid: String,
}

impl ServiceAddress {
    pub fn provider(domain: &str, operation: &str) -> Self {
        Self { name: format!("/{domain}/{operation}"), tid: String::new(), sid: String::new() }
    }

    /// Operation part of a `"/<domain>/<operation>"` name.
    pub fn operation(&self) -> Option<&str> {
        let mut parts = self.name.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(""), Some(_domain), Some(oper)) if !oper.is_empty() => Some(oper),
            _ => None,
        }
    }
}

// -- USSD payloads ------------------------------------------------------------

/// Inbound request kind, mapped to the driver entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// Begin a new session.
    #[serde(rename = "REQUEST")]
    Request,
    /// User input continuing a session.
    #[serde(rename = "RESPONSE")]
    Response,
    /// User abort.
    #[serde(rename = "RELEASE")]
    Release,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UssdRequest {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    #[serde(default)]
    pub msisdn: String,
    #[serde(default)]
    pub text: String,
}

impl UssdRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.msisdn.is_empty() {
            return Err("missing msisdn".to_owned());
        }
        if self.text.is_empty() && self.kind != RequestKind::Release {
            return Err("missing text".to_owned());
        }
        Ok(())
    }
}

/// Outbound response kind on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UssdResponseKind {
    #[serde(rename = "REDIRECT")]
    Redirect,
    /// Prompt; the dialog continues.
    #[serde(rename = "RESPONSE")]
    Response,
    /// Final; the session is released.
    #[serde(rename = "RELEASE")]
    Release,
}

impl From<ResponseKind> for UssdResponseKind {
    fn from(kind: ResponseKind) -> Self {
        match kind {
            ResponseKind::Prompt => Self::Response,
            ResponseKind::Final => Self::Release,
            ResponseKind::Redirect => Self::Redirect,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UssdResponse {
    #[serde(rename = "type")]
    pub kind: UssdResponseKind,
    pub message: String,
}

impl From<ussd::Response> for UssdResponse {
    fn from(response: ussd::Response) -> Self {
        Self { kind: response.kind.into(), message: response.message }
    }
}

#[cfg(test)]
#[path = "msg_tests.rs"]
mod tests;
