// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-channel USSD dialog engine.
//!
//! A dialog is a graph of [`item::Item`]s (menus, prompts, server-side
//! steps, service calls) registered with an [`Engine`] alongside the
//! [`respond::Responder`]s that deliver messages back to subscribers. The
//! driver walks the graph per request, externalizing all state to a
//! [`session::SessionStore`] so a dialog can resume on any instance.

pub mod driver;
pub mod error;
pub mod item;
pub mod respond;
pub mod session;

pub use driver::Engine;
pub use error::EngineError;
pub use item::{Final, Func, Item, Menu, Prompt, Router, ServiceCall, SetVar, SvcExec, SvcWait};
pub use respond::{Responder, Response, ResponseKind};
pub use session::{key, HttpStore, MemoryStore, Session, SessionRecord, SessionStore};
