// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Example USSD services built from the dialog graph primitives.

pub mod callme;
pub mod soscredit;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use ussd::{Engine, EngineError, Router};

/// Starts an outbound RPC for a parked session. The reply (or a
/// `{"error": {...}}` failure value) re-enters the driver via
/// `continue_with_reply` once the backend answers or the request times out.
#[async_trait]
pub trait ServiceCaller: Send + Sync {
    async fn call(
        &self,
        session_id: &str,
        service: &str,
        operation: &str,
        request: Value,
    ) -> Result<(), EngineError>;
}

/// Caller for deployments without a service transport; every call fails
/// so service-wait items surface a clean error instead of hanging.
pub struct NoServiceCaller;

#[async_trait]
impl ServiceCaller for NoServiceCaller {
    async fn call(
        &self,
        _session_id: &str,
        service: &str,
        operation: &str,
        _request: Value,
    ) -> Result<(), EngineError> {
        Err(EngineError::Service(format!(
            "no service transport configured for {service}/{operation}"
        )))
    }
}

/// Root item id for [`register_all`].
pub const ROOT_ITEM_ID: &str = "main";

/// Register every example service plus the dispatch router. Returns the
/// root item id to start sessions from.
pub fn register_all(
    engine: &mut Engine,
    caller: Arc<dyn ServiceCaller>,
) -> Result<String, EngineError> {
    let callme = callme::register(engine, Arc::clone(&caller))?;
    let soscredit = soscredit::register(engine, caller)?;
    engine.register_item(
        Router::new(ROOT_ITEM_ID).prefix("*140", [callme]).code("*130*107#", [soscredit]),
    )?;
    Ok(ROOT_ITEM_ID.to_owned())
}
