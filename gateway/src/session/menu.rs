//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Text menus

use crate::telnet::protocol::ansi::{Color, paint};
use mudhall_common::ColorMode;

/// Key that backs out of any menu
pub const EXIT_KEY: &str = "x";

#[derive(Debug, Clone)]
struct MenuEntry<T> {
    key: String,
    text: String,
    data: Option<T>,
}

/// What the user picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<T> {
    pub key: String,
    pub data: Option<T>,
}

/// A titled list of keyed entries. Lettered entries are actions, numbered
/// entries carry a value.
#[derive(Debug, Clone)]
pub struct Menu<T = ()> {
    title: String,
    entries: Vec<MenuEntry<T>>,
    numbered: usize,
}

impl<T: Clone> Menu<T> {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            entries: Vec::new(),
            numbered: 0,
        }
    }

    pub fn add_action(&mut self, key: &str, text: impl Into<String>) {
        self.entries.push(MenuEntry {
            key: key.to_lowercase(),
            text: text.into(),
            data: None,
        });
    }

    /// Add an entry keyed by the next number
    pub fn add_choice(&mut self, text: impl Into<String>, data: T) {
        self.numbered += 1;
        self.entries.push(MenuEntry {
            key: self.numbered.to_string(),
            text: text.into(),
            data: Some(data),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self, mode: ColorMode) -> String {
        let mut out = String::from("\r\n");
        out.push_str(&paint(mode, Color::Cyan, &format!("-=-=- {} -=-=-", self.title)));
        out.push_str("\r\n");
        for entry in &self.entries {
            out.push_str(&format!(
                "  [{}] {}\r\n",
                paint(mode, Color::Yellow, &entry.key),
                entry.text
            ));
        }
        out
    }

    /// Match input against the entry keys, case-insensitively
    pub fn select(&self, input: &str) -> Option<Selection<T>> {
        let input = input.trim().to_lowercase();
        if input == EXIT_KEY {
            return Some(Selection {
                key: input,
                data: None,
            });
        }
        self.entries
            .iter()
            .find(|entry| entry.key == input)
            .map(|entry| Selection {
                key: entry.key.clone(),
                data: entry.data.clone(),
            })
    }
}
