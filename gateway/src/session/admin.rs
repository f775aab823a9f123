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

//! Administration menus and session watching

use super::{Menu, Session, SessionError};
use crate::watch::OutputSink;
use mudhall_common::UserId;
use mudhall_server::WorldError;
use std::sync::Arc;

impl Session {
    pub(super) async fn admin_menu(&mut self) -> Result<(), SessionError> {
        loop {
            let mut menu: Menu = Menu::new("Admin");
            menu.add_action("u", "Users");
            match self.exec_menu(&menu).await? {
                Some(selection) if selection.key == "u" => self.users_menu().await?,
                _ => return Ok(()),
            }
        }
    }

    async fn users_menu(&mut self) -> Result<(), SessionError> {
        loop {
            let mut menu = Menu::new("Users");
            for user in self.context.store.users() {
                let label = if user.online {
                    format!("{}*", user.name)
                } else {
                    user.name.clone()
                };
                menu.add_choice(label, user.id);
            }
            let Some(target) = self.exec_menu(&menu).await?.and_then(|s| s.data) else {
                return Ok(());
            };
            self.user_menu(target).await?;
        }
    }

    async fn user_menu(&mut self, target: UserId) -> Result<(), SessionError> {
        loop {
            let Some(user) = self.context.store.user(target) else {
                return Ok(());
            };
            let mut menu: Menu = Menu::new(format!("User: {}", user.name));
            menu.add_action("d", "Delete");
            if user.online {
                menu.add_action("w", "Watch");
            }

            let Some(selection) = self.exec_menu(&menu).await? else {
                return Ok(());
            };
            match selection.key.as_str() {
                "d" => {
                    if Some(target) == self.guard.user {
                        self.send_error("You can't delete yourself!").await?;
                        continue;
                    }
                    match self.context.store.delete_user(target) {
                        Ok(()) => {
                            tracing::info!(user = %user.name, "User deleted by admin");
                            self.send_line(&format!("Deleted {}", user.name)).await?;
                            return Ok(());
                        }
                        Err(e @ (WorldError::UserOnline | WorldError::UserNotFound(_))) => {
                            self.send_error(&e.to_string()).await?;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                "w" => self.watch(target).await?,
                _ => return Ok(()),
            }
        }
    }

    /// Mirror another user's output here until any line is entered or the
    /// watched connection closes
    async fn watch(&mut self, target: UserId) -> Result<(), SessionError> {
        if Some(target) == self.guard.user {
            self.send_error("You can't watch yourself!").await?;
            return Ok(());
        }
        let Some(handle) = self.context.presence.user(target) else {
            self.send_error("That user is not online").await?;
            return Ok(());
        };

        let watcher = self.connection.id();
        let sink: Arc<dyn OutputSink> = self.connection.writer();
        if handle.output.add_watcher(watcher, sink).is_err() {
            self.send_error("That user is not online").await?;
            return Ok(());
        }
        tracing::info!(watched = %handle.connection_id, watcher = %watcher, "Watch started");

        let result = match self.send_line("Type anything to stop watching").await {
            Ok(()) => tokio::select! {
                line = self.connection.read_line() => line.map(|_| ()),
                _ = handle.closed.cancelled() => Ok(()),
            },
            Err(e) => Err(e),
        };
        handle.output.remove_watcher(watcher);
        tracing::info!(watched = %handle.connection_id, watcher = %watcher, "Watch ended");
        result?;

        self.send_line("Stopped watching").await?;
        Ok(())
    }
}
