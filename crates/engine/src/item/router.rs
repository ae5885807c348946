// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch entry for dialed codes.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::session::{key, Session};

struct RegexRoute {
    regex: regex::Regex,
    names: Vec<String>,
    next: Vec<String>,
}

/// Picks the next items from the dialed code (`init_request`).
///
/// Match order: exact code, then longest matching prefix, then regex routes
/// in registration order. Regex patterns are anchored (`^…$`) and their
/// capture groups are bound to the configured names in the session before
/// the route's items run.
pub struct Router {
    id: String,
    by_code: HashMap<String, Vec<String>>,
    by_prefix: Vec<(String, Vec<String>)>,
    by_regex: Vec<RegexRoute>,
}

fn ids(next: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    next.into_iter().map(Into::into).collect()
}

impl Router {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), by_code: HashMap::new(), by_prefix: Vec::new(), by_regex: Vec::new() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Route an exact dialed code.
    pub fn code(
        mut self,
        code: impl Into<String>,
        next: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.by_code.insert(code.into(), ids(next));
        self
    }

    /// Route any code starting with `prefix`. The longest registered
    /// prefix wins.
    pub fn prefix(
        mut self,
        prefix: impl Into<String>,
        next: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let prefix = prefix.into();
        let at = self
            .by_prefix
            .partition_point(|(existing, _)| existing.len() >= prefix.len());
        self.by_prefix.insert(at, (prefix, ids(next)));
        self
    }

    /// Route codes matching `pattern` (anchored). Each capture group is
    /// stored in the session under the matching entry of `names`.
    pub fn regex(
        mut self,
        pattern: &str,
        names: impl IntoIterator<Item = impl Into<String>>,
        next: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, EngineError> {
        let regex = regex::Regex::new(&format!("^{pattern}$")).map_err(|e| {
            EngineError::item_config(&self.id, format!("invalid regex pattern {pattern:?}: {e}"))
        })?;
        let names = ids(names);
        let groups = regex.captures_len() - 1;
        if groups != names.len() {
            return Err(EngineError::item_config(
                &self.id,
                format!(
                    "regex {pattern:?} has {groups} capture groups but {} names",
                    names.len()
                ),
            ));
        }
        self.by_regex.push(RegexRoute { regex, names, next: ids(next) });
        Ok(self)
    }

    pub(crate) fn route(&self, session: &mut Session) -> Result<Vec<String>, EngineError> {
        let Some(input) = session.get_str(key::INIT_REQUEST).map(str::to_owned) else {
            return Err(EngineError::item_config(&self.id, "session has no init_request"));
        };

        if let Some(next) = self.by_code.get(&input) {
            return Ok(next.clone());
        }
        // by_prefix is kept sorted longest-first.
        for (prefix, next) in &self.by_prefix {
            if input.starts_with(prefix.as_str()) {
                return Ok(next.clone());
            }
        }
        for route in &self.by_regex {
            if let Some(caps) = route.regex.captures(&input) {
                for (name, group) in route.names.iter().zip(caps.iter().skip(1)) {
                    if let Some(m) = group {
                        session.set(name.clone(), m.as_str());
                    }
                }
                return Ok(route.next.clone());
            }
        }
        Err(EngineError::UnknownCode { code: input })
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
