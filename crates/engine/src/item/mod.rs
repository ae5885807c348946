// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dialog graph items.
//!
//! An item is one node of a USSD dialog. Items never hold pointers to each
//! other; every edge is an item **id**. Ids are the only handles that cross
//! instances (they land in the session's continuation queue), so they must
//! be stable: every constructor takes an explicit id and nothing generates
//! ids at runtime. Id-edges also make cyclic graphs (a menu option leading
//! back to the menu) safe; every cycle passes through a user-facing item,
//! which parks the driver.
//!
//! Capability sets per variant:
//!
//! | Variant | Capabilities |
//! |---|---|
//! | [`Router`] | execute |
//! | [`Menu`] | render + process-input |
//! | [`Prompt`] | render + process-input |
//! | [`Final`] | render |
//! | [`SetVar`] | execute |
//! | [`Func`] | execute |
//! | [`ServiceCall`] | request + process-reply |

pub mod menu;
pub mod prompt;
pub mod router;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;
use crate::session::Session;

pub use menu::Menu;
pub use prompt::Prompt;
pub use router::Router;

/// A server-side step. Returns the ids of any items to run next.
#[async_trait]
pub trait SvcExec: Send + Sync {
    async fn exec(&self, session: &mut Session) -> Result<Vec<String>, EngineError>;
}

/// An outbound request/reply step. `request` starts the call and returns;
/// the driver parks the session until a transport feeds the reply back in.
/// `process` receives the raw reply value (failures arrive as
/// `{"error": {...}}`) and decides how the dialog continues.
#[async_trait]
pub trait SvcWait: Send + Sync {
    async fn request(&self, session: &mut Session) -> Result<(), EngineError>;

    async fn process(
        &self,
        session: &mut Session,
        reply: Value,
    ) -> Result<Vec<String>, EngineError>;
}

/// Terminal message. Rendering it ends the session.
#[derive(Debug, Clone)]
pub struct Final {
    id: String,
    text: String,
}

impl Final {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn render(&self, _session: &Session) -> String {
        self.text.clone()
    }
}

/// Assigns one session variable.
#[derive(Debug, Clone)]
pub struct SetVar {
    id: String,
    name: String,
    value: Value,
}

impl SetVar {
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { id: id.into(), name: name.into(), value: value.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Arbitrary server-side step backed by a [`SvcExec`] implementation.
pub struct Func {
    id: String,
    exec: Arc<dyn SvcExec>,
}

impl Func {
    pub fn new(id: impl Into<String>, exec: impl SvcExec + 'static) -> Self {
        Self { id: id.into(), exec: Arc::new(exec) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Outbound RPC step backed by a [`SvcWait`] implementation.
pub struct ServiceCall {
    id: String,
    wait: Arc<dyn SvcWait>,
}

impl ServiceCall {
    pub fn new(id: impl Into<String>, wait: impl SvcWait + 'static) -> Self {
        Self { id: id.into(), wait: Arc::new(wait) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn request(&self, session: &mut Session) -> Result<(), EngineError> {
        self.wait.request(session).await
    }

    pub async fn process(
        &self,
        session: &mut Session,
        reply: Value,
    ) -> Result<Vec<String>, EngineError> {
        self.wait.process(session, reply).await
    }
}

/// One node of the dialog graph.
pub enum Item {
    Router(Router),
    Menu(Menu),
    Prompt(Prompt),
    Final(Final),
    Set(SetVar),
    Func(Func),
    Service(ServiceCall),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Self::Router(r) => r.id(),
            Self::Menu(m) => m.id(),
            Self::Prompt(p) => p.id(),
            Self::Final(f) => f.id(),
            Self::Set(s) => s.id(),
            Self::Func(f) => f.id(),
            Self::Service(s) => s.id(),
        }
    }

    /// Render-to-user capability.
    pub fn renders(&self) -> bool {
        matches!(self, Self::Menu(_) | Self::Prompt(_) | Self::Final(_))
    }

    /// Process-input capability; the driver may park on this item.
    pub fn handles_input(&self) -> bool {
        matches!(self, Self::Menu(_) | Self::Prompt(_))
    }

    /// Execute-server-side capability.
    pub fn executes(&self) -> bool {
        matches!(self, Self::Router(_) | Self::Set(_) | Self::Func(_))
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final(_))
    }

    pub fn as_wait(&self) -> Option<&ServiceCall> {
        match self {
            Self::Service(s) => Some(s),
            _ => None,
        }
    }

    /// User-visible text, for render-capable items.
    pub fn render(&self, session: &Session) -> Option<String> {
        match self {
            Self::Menu(m) => Some(m.render(session)),
            Self::Prompt(p) => Some(p.render(session)),
            Self::Final(f) => Some(f.render(session)),
            _ => None,
        }
    }

    /// Handle user input on a parked item. Yields the ids to proceed with;
    /// an empty list hands control back to the continuation queue.
    pub fn process_input(
        &self,
        session: &mut Session,
        input: &str,
    ) -> Result<Vec<String>, EngineError> {
        match self {
            Self::Menu(m) => Ok(m.select(input)),
            Self::Prompt(p) => p.process(session, input),
            _ => Err(EngineError::item_config(self.id(), "item does not process input")),
        }
    }

    /// Run a server-side item. Yielded ids are prepended to the queue.
    pub async fn execute(&self, session: &mut Session) -> Result<Vec<String>, EngineError> {
        match self {
            Self::Router(r) => r.route(session),
            Self::Set(s) => {
                session.set(s.name.clone(), s.value.clone());
                Ok(Vec::new())
            }
            Self::Func(f) => f.exec.exec(session).await,
            _ => Err(EngineError::item_config(self.id(), "item does not execute server-side")),
        }
    }
}

impl From<Router> for Item {
    fn from(r: Router) -> Self {
        Self::Router(r)
    }
}

impl From<Menu> for Item {
    fn from(m: Menu) -> Self {
        Self::Menu(m)
    }
}

impl From<Prompt> for Item {
    fn from(p: Prompt) -> Self {
        Self::Prompt(p)
    }
}

impl From<Final> for Item {
    fn from(f: Final) -> Self {
        Self::Final(f)
    }
}

impl From<SetVar> for Item {
    fn from(s: SetVar) -> Self {
        Self::Set(s)
    }
}

impl From<Func> for Item {
    fn from(f: Func) -> Self {
        Self::Func(f)
    }
}

impl From<ServiceCall> for Item {
    fn from(s: ServiceCall) -> Self {
        Self::Service(s)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
