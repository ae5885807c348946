// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Numbered option menus.

use crate::session::Session;

#[derive(Debug, Clone)]
struct MenuOption {
    caption: String,
    next: Vec<String>,
}

/// A titled list of numbered options, each leading to a list of items.
#[derive(Debug, Clone)]
pub struct Menu {
    id: String,
    title: String,
    options: Vec<MenuOption>,
}

impl Menu {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), options: Vec::new() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append an option. Options are numbered from 1 in insertion order.
    pub fn option(
        mut self,
        caption: impl Into<String>,
        next: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.options.push(MenuOption {
            caption: caption.into(),
            next: next.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn render(&self, _session: &Session) -> String {
        let mut page = self.title.clone();
        for (n, option) in self.options.iter().enumerate() {
            page.push_str(&format!("\n{}. {}", n + 1, option.caption));
        }
        page
    }

    /// Resolve a selection. Anything that is not a number between 1 and the
    /// option count redisplays the menu (the menu yields itself).
    pub(crate) fn select(&self, input: &str) -> Vec<String> {
        match input.trim().parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.options.len() => self.options[n - 1].next.clone(),
            _ => vec![self.id.clone()],
        }
    }
}

#[cfg(test)]
#[path = "menu_tests.rs"]
mod tests;
