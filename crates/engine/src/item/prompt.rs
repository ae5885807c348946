// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Free-text questions.

use crate::error::EngineError;
use crate::session::Session;

/// Input check for a [`Prompt`]. Returns the message to show the
/// subscriber when the input is rejected.
pub type Validator = Box<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// Asks a question and stores the answer under a session key.
///
/// Validators run in registration order; the first rejection re-renders
/// the prompt prefixed with the validator's message. On success the input
/// is stored and the prompt yields nothing, handing control back to the
/// continuation queue.
pub struct Prompt {
    id: String,
    text: String,
    name: String,
    validators: Vec<Validator>,
}

impl Prompt {
    pub fn new(id: impl Into<String>, text: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), name: name.into(), validators: Vec::new() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn validator(
        mut self,
        validate: impl Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validators.push(Box::new(validate));
        self
    }

    pub fn render(&self, _session: &Session) -> String {
        self.text.clone()
    }

    pub(crate) fn process(
        &self,
        session: &mut Session,
        input: &str,
    ) -> Result<Vec<String>, EngineError> {
        for validate in &self.validators {
            if let Err(message) = validate(input) {
                return Err(EngineError::InvalidInput(message));
            }
        }
        session.set(self.name.clone(), input);
        Ok(Vec::new())
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
