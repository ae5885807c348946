// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outgoing responses and the responder contract.
//!
//! A responder delivers one message back to the subscriber over whatever
//! transport carried the request in. The engine never inspects the delivery
//! key; it stores the key in the session so that a different instance can
//! resume the dialog and still reach the right reply path.

use std::fmt;

use async_trait::async_trait;

/// How the transport should treat the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// The dialog continues; the subscriber is expected to answer.
    Prompt,
    /// Terminal message; the session is over.
    Final,
    /// The session was handed off to another service.
    Redirect,
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prompt => "prompt",
            Self::Final => "final",
            Self::Redirect => "redirect",
        })
    }
}

/// One outgoing message.
#[derive(Debug, Clone)]
pub struct Response {
    pub kind: ResponseKind,
    pub message: String,
}

impl Response {
    pub fn prompt(message: impl Into<String>) -> Self {
        Self { kind: ResponseKind::Prompt, message: message.into() }
    }

    pub fn final_(message: impl Into<String>) -> Self {
        Self { kind: ResponseKind::Final, message: message.into() }
    }
}

/// Delivers a [`Response`] to the subscriber through one transport.
///
/// The `key` is the transport-specific delivery handle (a NATS reply
/// subject, an HTTP waiter id, a console channel) that the transport
/// provided when the request came in.
#[async_trait]
pub trait Responder: Send + Sync {
    fn id(&self) -> &str;

    async fn respond(&self, key: &str, response: Response) -> anyhow::Result<()>;
}
