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

//! Main menu, login and registration

use super::{Menu, Session, SessionError, SessionState, is_abort};
use crate::presence::UserHandle;
use crate::telnet::options::OptionEvent;
use mudhall_common::{User, UserId, format_name, validate_name};
use mudhall_server::{WorldError, WorldStore};

/// Shortest acceptable password
const MIN_PASSWORD_LENGTH: usize = 7;

impl Session {
    pub(super) async fn main_menu(&mut self) -> Result<(), SessionError> {
        let mut menu: Menu = Menu::new("Mudhall");
        menu.add_action("l", "Login");
        menu.add_action("n", "New user");
        menu.add_action("q", "Quit");

        let Some(selection) = self.exec_menu(&menu).await? else {
            return Ok(());
        };
        match selection.key.as_str() {
            "l" => {
                if let Some(user) = self.login().await? {
                    self.authenticate(user).await?;
                }
            }
            "n" => {
                if let Some(user) = self.register().await? {
                    self.authenticate(user).await?;
                }
            }
            _ => {
                self.send_line("Take luck!").await?;
                self.state = SessionState::Closed;
            }
        }
        Ok(())
    }

    /// Ask for credentials. Returns the verified user, or `None` if the
    /// client backed out.
    async fn login(&mut self) -> Result<Option<User>, SessionError> {
        let store = self.context.store.clone();
        loop {
            let name = self.prompt("Username: ").await?;
            if is_abort(&name) {
                return Ok(None);
            }
            let Some(user) = store.user_by_name(&name) else {
                self.send_error("User not found").await?;
                continue;
            };
            if user.online {
                self.send_error("That user is already online").await?;
                continue;
            }

            self.connection.request_echo(true).await?;
            let mut attempts = 1;
            let verified = loop {
                let password = self.prompt_secret("Password: ").await?;
                match store.authenticate(user.id, &password).await {
                    Ok(true) => break true,
                    Ok(false) => {}
                    // Deleted by an administrator while we were typing
                    Err(WorldError::UserNotFound(_)) => break false,
                    Err(e) => return Err(e.into()),
                }
                if attempts >= self.context.login.max_attempts {
                    self.send_error("Too many failed login attempts").await?;
                    tracing::warn!(
                        user = %user.name,
                        peer = ?self.connection.peer(),
                        "Too many failed login attempts"
                    );
                    return Err(SessionError::TooManyAttempts(user.name));
                }
                attempts += 1;
                tokio::time::sleep(self.context.login.retry_delay).await;
                self.send_error("Invalid password").await?;
            };
            self.connection.request_echo(false).await?;
            if !verified {
                self.send_error("User not found").await?;
                continue;
            }
            return Ok(Some(user));
        }
    }

    /// Create a new user. Returns `None` if the client backed out.
    async fn register(&mut self) -> Result<Option<User>, SessionError> {
        let store = self.context.store.clone();
        let name = loop {
            let input = self.prompt("Desired username: ").await?;
            if is_abort(&input) {
                return Ok(None);
            }
            let name = format_name(&input);
            if let Err(message) = validate_name(&name) {
                self.send_error(&message).await?;
                continue;
            }
            if store.user_by_name(&name).is_some() {
                self.send_error("That name is unavailable").await?;
                continue;
            }
            break name;
        };

        self.connection.request_echo(true).await?;
        let password = loop {
            let password = self.prompt_secret("Desired password: ").await?;
            if password.chars().count() < MIN_PASSWORD_LENGTH {
                self.send_error(&format!(
                    "Passwords must be at least {} letters in length",
                    MIN_PASSWORD_LENGTH
                ))
                .await?;
                continue;
            }
            let confirm = self.prompt_secret("Confirm password: ").await?;
            if confirm != password {
                self.send_error("Passwords do not match").await?;
                continue;
            }
            break password;
        };
        self.connection.request_echo(false).await?;

        match store.register_user(&name, &password).await {
            Ok(user) => {
                tracing::info!(user = %user.name, peer = ?self.connection.peer(), "Registered new user");
                Ok(Some(user))
            }
            Err(e @ (WorldError::NameTaken(_) | WorldError::InvalidName(_))) => {
                self.send_error(&e.to_string()).await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Bind `user` to this connection and move on to character selection
    async fn authenticate(&mut self, user: User) -> Result<(), SessionError> {
        let store = self.context.store.clone();
        match store.login_user(user.id) {
            Ok(()) => {}
            Err(WorldError::AlreadyOnline) => {
                self.send_error("That user is already online").await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        self.guard.user = Some(user.id);
        self.context.presence.bind_user(
            user.id,
            UserHandle {
                connection_id: self.connection.id(),
                output: self.output.clone(),
                closed: self.connection.close_token(),
            },
        );

        let capabilities = self.connection.capabilities();
        if let Some((width, height)) = capabilities.window_size {
            record_option(&store, user.id, OptionEvent::WindowSize(width, height));
        }
        if let Some(terminal) = capabilities.terminal_type {
            record_option(&store, user.id, OptionEvent::TerminalType(terminal));
        }
        let handler_store = store.clone();
        let user_id = user.id;
        self.connection
            .set_option_handler(move |event| record_option(&handler_store, user_id, event));
        self.connection.request_window_size().await?;
        self.connection.request_terminal_type().await?;

        tracing::info!(user = %user.name, peer = ?self.connection.peer(), "User logged in");
        self.send_line(&format!("Welcome, {}!", user.name)).await?;
        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// Release the user and return to the main menu
    pub(super) async fn logout(&mut self) -> Result<(), SessionError> {
        if let (Some(name), _) = self.describe() {
            tracing::info!(user = %name, "User logged out");
        }
        self.connection.clear_option_handler();
        self.guard.release_user();
        self.state = SessionState::Unauthenticated;
        self.send_line("Goodbye.").await?;
        Ok(())
    }
}

/// Store window size and terminal type reports on the user
fn record_option(store: &WorldStore, user_id: UserId, event: OptionEvent) {
    let result = match event {
        OptionEvent::WindowSize(width, height) => store.set_window_size(user_id, width, height),
        OptionEvent::TerminalType(terminal) => store.set_terminal_type(user_id, terminal),
        _ => Ok(()),
    };
    if let Err(e) = result {
        tracing::debug!(user = %user_id, "Unable to record terminal option: {}", e);
    }
}
