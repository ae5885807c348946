// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-channel gateway for the USSD dialog engine: NATS, HTTP and
//! console transports, the session store service, and the example
//! services.

pub mod config;
pub mod error;
pub mod msg;
pub mod run;
pub mod services;
pub mod sessiond;
pub mod transport;

#[cfg(test)]
pub mod test_support;
