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

//! Per-connection session handling
//!
//! One [`Session`] drives one connection from the main menu through login,
//! character selection and play until the peer goes away. Everything the
//! session binds in shared state is released by [`SessionGuard`] when the
//! session is dropped, whichever way it ends.

mod admin;
mod characters;
mod game;
mod login;
pub mod menu;

use crate::context::ServerContext;
use crate::presence::PresenceRegistry;
use crate::telnet::{ConnectionId, TelnetConnection};
use crate::telnet::protocol::ansi::{self, Color};
use crate::watch::FanOut;
use menu::{Menu, Selection};
use mudhall_common::{CharacterId, ColorMode, UserId};
use mudhall_server::{WorldError, WorldStore};
use std::io;
use std::sync::Arc;

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Main menu: login or registration
    Unauthenticated,
    /// Logged in, choosing a character
    Authenticated,
    /// Playing a character
    InGame,
    /// Finished; the connection is closed
    Closed,
}

/// Errors that end a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Connection error: {0}")]
    Io(#[from] io::Error),

    #[error("World error: {0}")]
    World(#[from] WorldError),

    #[error("Too many failed login attempts for {0}")]
    TooManyAttempts(String),
}

/// Releases everything a session holds in shared state exactly once
struct SessionGuard {
    store: Arc<WorldStore>,
    presence: Arc<PresenceRegistry>,
    connection_id: ConnectionId,
    output: Arc<FanOut>,
    user: Option<UserId>,
    character: Option<CharacterId>,
}

impl SessionGuard {
    fn release_character(&mut self) {
        if let Some(id) = self.character.take() {
            self.presence.leave(id);
            self.store.leave_world(id);
        }
    }

    fn release_user(&mut self) {
        self.release_character();
        if let Some(id) = self.user.take() {
            self.presence.unbind_user(id, self.connection_id);
            self.store.logout_user(id);
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.release_user();
        self.presence.remove_watcher_everywhere(self.connection_id);
        self.output.close();
        tracing::debug!(connection = %self.connection_id, "Session released");
    }
}

/// One connected client
pub struct Session {
    context: ServerContext,
    connection: Arc<TelnetConnection>,
    output: Arc<FanOut>,
    state: SessionState,
    guard: SessionGuard,
}

impl Session {
    pub fn new(context: ServerContext, connection: TelnetConnection) -> Self {
        let connection = Arc::new(connection);
        let output = Arc::new(FanOut::new(connection.id(), connection.writer()));
        let guard = SessionGuard {
            store: context.store.clone(),
            presence: context.presence.clone(),
            connection_id: connection.id(),
            output: output.clone(),
            user: None,
            character: None,
        };
        Self {
            context,
            connection,
            output,
            state: SessionState::Unauthenticated,
            guard,
        }
    }

    /// Drive the session until the client quits or disconnects
    pub async fn run(mut self) -> Result<(), SessionError> {
        let result = self.drive().await;
        if let Err(e) = &result {
            let (user, character) = self.describe();
            tracing::warn!(?user, ?character, peer = ?self.connection.peer(), "Session failed: {}", e);
        }
        self.state = SessionState::Closed;
        self.connection.close().await;
        result
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        loop {
            match self.state {
                SessionState::Unauthenticated => self.main_menu().await?,
                SessionState::Authenticated => self.character_menu().await?,
                SessionState::InGame => self.play().await?,
                SessionState::Closed => return Ok(()),
            }
        }
    }

    /// Names for log context: (user, character)
    pub fn describe(&self) -> (Option<String>, Option<String>) {
        let store = &self.context.store;
        (
            self.guard.user.and_then(|id| store.user(id)).map(|u| u.name),
            self.guard
                .character
                .and_then(|id| store.character(id))
                .map(|c| c.name),
        )
    }

    fn color_mode(&self) -> ColorMode {
        self.guard
            .user
            .and_then(|id| self.context.store.user(id))
            .map(|user| user.color_mode)
            .unwrap_or_default()
    }

    fn paint(&self, color: Color, text: &str) -> String {
        ansi::paint(self.color_mode(), color, text)
    }

    async fn send(&self, text: &str) -> io::Result<()> {
        self.output.write_str(text).await
    }

    async fn send_line(&self, text: &str) -> io::Result<()> {
        self.output.write_line(text).await
    }

    async fn send_error(&self, text: &str) -> io::Result<()> {
        self.send_line(&self.paint(Color::Red, text)).await
    }

    /// Show `text` and read one trimmed line
    async fn prompt(&self, text: &str) -> io::Result<String> {
        self.send(text).await?;
        Ok(self.connection.read_line().await?.trim().to_string())
    }

    /// Prompt while the client is not echoing; the line is returned untrimmed
    async fn prompt_secret(&self, text: &str) -> io::Result<String> {
        self.send(text).await?;
        let secret = self.connection.read_line().await?;
        // The client swallowed the newline along with the password
        self.send_line("").await?;
        Ok(secret)
    }

    /// Show a menu until the user picks something.
    ///
    /// Returns `None` on blank input; `x` always selects the key "x".
    async fn exec_menu<T: Clone>(&self, menu: &Menu<T>) -> io::Result<Option<Selection<T>>> {
        loop {
            self.send(&menu.render(self.color_mode())).await?;
            let input = self.prompt("> ").await?;
            if input.is_empty() {
                return Ok(None);
            }
            match menu.select(&input) {
                Some(selection) => return Ok(Some(selection)),
                None => {
                    self.send_error(&format!("Invalid selection: {}", input))
                        .await?
                }
            }
        }
    }
}

/// Blank input or `x` abandons a prompt
fn is_abort(input: &str) -> bool {
    input.is_empty() || input.eq_ignore_ascii_case("x")
}
