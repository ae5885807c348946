// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Errors surfaced by the dialog engine.
///
/// `InvalidInput` is control flow, not failure: the driver answers it by
/// re-rendering the current prompt. Every other variant ends the session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A prompt validator rejected the user's input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No router table matched the dialed code.
    #[error("unknown ussd code {code:?}")]
    UnknownCode { code: String },

    /// Continue or abort referenced a session id the store does not hold.
    #[error("session {id} not found")]
    SessionNotFound { id: String },

    /// An item id did not resolve, or the resolved item cannot play the
    /// role the driver needs at this point (registration errors included).
    #[error("item {id}: {reason}")]
    ItemConfig { id: String, reason: String },

    /// The session names a responder id that is not registered here.
    #[error("responder {id} not registered")]
    ResponderNotFound { id: String },

    /// Session store I/O failed.
    #[error("session store failed")]
    Store(#[source] anyhow::Error),

    /// An outbound service call could not be started.
    #[error("service call failed: {0}")]
    Service(String),

    /// The proceed loop drained its queue without producing a user response.
    #[error("dialog ended without a user response")]
    NoTerminalItem,
}

impl EngineError {
    pub(crate) fn item_config(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ItemConfig { id: id.into(), reason: reason.into() }
    }

    /// True when the session must be torn down (everything except the
    /// prompt-retry path).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidInput(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
