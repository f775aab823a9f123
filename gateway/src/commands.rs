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

//! In-game commands
//!
//! Lines starting with `/` are looked up in the [`CommandRegistry`]; all
//! other lines go to [`actions::perform`]. Handlers run synchronously against
//! the world store and collect their output in a [`CommandContext`].

pub mod actions;
mod building;
mod chat;
mod info;
mod npc;
mod room;

use crate::presence::PresenceRegistry;
use crate::telnet::protocol::ansi::{self, Color};
use mudhall_common::{Character, CharacterId, ColorMode, Direction, Room, User, UserId};
use mudhall_server::WorldStore;
use std::collections::HashMap;

/// Signature shared by every command
pub type CommandHandler = fn(&mut CommandContext<'_>, &[&str]);

/// Per-session state commands may change
#[derive(Debug, Clone, Default)]
pub struct PlayState {
    /// Who a bare `/reply` answers
    pub reply_to: Option<CharacterId>,
    /// Suppress ambient notices
    pub silent: bool,
}

/// Result of running one line
#[derive(Debug, Default)]
pub struct CommandOutput {
    pub lines: Vec<String>,
    pub quit: bool,
}

/// Everything a command may touch
pub struct CommandContext<'a> {
    pub store: &'a WorldStore,
    pub presence: &'a PresenceRegistry,
    pub user_id: UserId,
    pub character_id: CharacterId,
    pub play: &'a mut PlayState,
    output: CommandOutput,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        store: &'a WorldStore,
        presence: &'a PresenceRegistry,
        user_id: UserId,
        character_id: CharacterId,
        play: &'a mut PlayState,
    ) -> Self {
        Self {
            store,
            presence,
            user_id,
            character_id,
            play,
            output: CommandOutput::default(),
        }
    }

    pub fn user(&self) -> Option<User> {
        self.store.user(self.user_id)
    }

    pub fn character(&self) -> Option<Character> {
        self.store.character(self.character_id)
    }

    /// Room the character is standing in
    pub fn room(&self) -> Option<Room> {
        self.character().and_then(|c| self.store.room(c.room_id))
    }

    pub fn color_mode(&self) -> ColorMode {
        self.user().map(|u| u.color_mode).unwrap_or_default()
    }

    pub fn paint(&self, color: Color, text: &str) -> String {
        ansi::paint(self.color_mode(), color, text)
    }

    pub fn line(&mut self, text: impl Into<String>) {
        self.output.lines.push(text.into());
    }

    pub fn error(&mut self, text: impl AsRef<str>) {
        let painted = self.paint(Color::Red, text.as_ref());
        self.output.lines.push(painted);
    }

    /// Return to character selection after this line
    pub fn quit(&mut self) {
        self.output.quit = true;
    }

    pub fn into_output(self) -> CommandOutput {
        self.output
    }
}

/// Name to handler table
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in command
    pub fn standard() -> Self {
        let mut registry = Self::new();
        info::register(&mut registry);
        chat::register(&mut registry);
        building::register(&mut registry);
        npc::register(&mut registry);
        room::register(&mut registry);
        registry
    }

    /// Register `handler` under each of `names`
    pub fn register(&mut self, names: &[&'static str], handler: CommandHandler) {
        for &name in names {
            if self.handlers.insert(name, handler).is_some() {
                tracing::warn!(command = name, "Command registered twice");
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run a command line with the leading `/` already removed.
    ///
    /// Registered names win. Otherwise a direction (or a `/`-prefixed
    /// direction, for `//s` and friends) builds in that direction.
    pub fn dispatch(&self, ctx: &mut CommandContext<'_>, line: &str) {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            ctx.error("Unrecognized command: ");
            return;
        };
        let args: Vec<&str> = words.collect();
        let name = word.to_lowercase();

        if let Some(handler) = self.handlers.get(name.as_str()) {
            handler(ctx, &args);
            return;
        }
        let direction = Direction::parse(name.strip_prefix('/').unwrap_or(&name));
        match direction {
            Some(direction) => building::quick_room(ctx, direction),
            None => ctx.error(format!("Unrecognized command: {}", word)),
        }
    }
}

/// Join trailing words back into free text
fn rest(args: &[&str]) -> String {
    args.join(" ")
}
