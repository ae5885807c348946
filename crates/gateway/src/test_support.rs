// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for gateway unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use ussd::{EngineError, Responder, Response};

use crate::services::ServiceCaller;

/// Responder that records every delivery for assertions.
pub struct RecordingResponder {
    id: String,
    pub sent: parking_lot::Mutex<Vec<(String, Response)>>,
}

impl RecordingResponder {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self { id: id.to_owned(), sent: parking_lot::Mutex::new(Vec::new()) })
    }

    pub fn last(&self) -> Option<Response> {
        self.sent.lock().last().map(|(_, r)| r.clone())
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    fn id(&self) -> &str {
        &self.id
    }

    async fn respond(&self, key: &str, response: Response) -> anyhow::Result<()> {
        self.sent.lock().push((key.to_owned(), response));
        Ok(())
    }
}

/// One recorded outbound service call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub session_id: String,
    pub service: String,
    pub operation: String,
    pub request: Value,
}

/// Caller that records requests without answering them; tests feed the
/// reply back through `continue_with_reply` themselves.
#[derive(Default)]
pub struct CapturingCaller {
    pub calls: parking_lot::Mutex<Vec<RecordedCall>>,
}

impl CapturingCaller {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn last(&self) -> Option<RecordedCall> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl ServiceCaller for CapturingCaller {
    async fn call(
        &self,
        session_id: &str,
        service: &str,
        operation: &str,
        request: Value,
    ) -> Result<(), EngineError> {
        self.calls.lock().push(RecordedCall {
            session_id: session_id.to_owned(),
            service: service.to_owned(),
            operation: operation.to_owned(),
            request,
        });
        Ok(())
    }
}
