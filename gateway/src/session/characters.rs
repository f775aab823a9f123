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

//! Character selection, creation and deletion

use super::{Menu, Session, SessionError, SessionState, is_abort};
use mudhall_common::{Character, CharacterId, UserId, format_name, validate_name};
use mudhall_server::WorldError;

impl Session {
    pub(super) async fn character_menu(&mut self) -> Result<(), SessionError> {
        let Some(user) = self.guard.user.and_then(|id| self.context.store.user(id)) else {
            // Deleted out from under us
            self.guard.release_user();
            self.state = SessionState::Unauthenticated;
            return Ok(());
        };
        let characters = self.context.store.characters_of(user.id);

        let mut menu = Menu::new(user.name.as_str());
        menu.add_action("l", "Logout");
        if user.is_admin() {
            menu.add_action("a", "Admin");
        }
        menu.add_action("n", "New character");
        if !characters.is_empty() {
            menu.add_action("d", "Delete character");
        }
        for character in &characters {
            menu.add_choice(character.name.as_str(), character.id);
        }

        let Some(selection) = self.exec_menu(&menu).await? else {
            return self.logout().await;
        };
        if let Some(character_id) = selection.data {
            return self.enter_game(character_id).await;
        }
        match selection.key.as_str() {
            "a" if user.is_admin() => self.admin_menu().await,
            "n" => {
                if let Some(character) = self.new_character(user.id).await? {
                    self.enter_game(character.id).await?;
                }
                Ok(())
            }
            "d" => self.delete_character(user.id).await,
            _ => self.logout().await,
        }
    }

    async fn enter_game(&mut self, character_id: CharacterId) -> Result<(), SessionError> {
        match self.context.store.enter_world(character_id) {
            Ok(()) => {
                self.guard.character = Some(character_id);
                self.state = SessionState::InGame;
                Ok(())
            }
            Err(e @ (WorldError::CharacterOnline | WorldError::CharacterNotFound(_))) => {
                self.send_error(&e.to_string()).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn new_character(&mut self, owner: UserId) -> Result<Option<Character>, SessionError> {
        loop {
            let input = self.prompt("Desired character name: ").await?;
            if is_abort(&input) {
                return Ok(None);
            }
            let name = format_name(&input);
            if let Err(message) = validate_name(&name) {
                self.send_error(&message).await?;
                continue;
            }
            match self.context.store.create_character(owner, &name) {
                Ok(character) => {
                    tracing::info!(character = %character.name, "Created character");
                    return Ok(Some(character));
                }
                Err(e @ (WorldError::NameTaken(_) | WorldError::InvalidName(_))) => {
                    self.send_error(&e.to_string()).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn delete_character(&mut self, owner: UserId) -> Result<(), SessionError> {
        let characters = self.context.store.characters_of(owner);
        let mut menu = Menu::new("Delete character");
        menu.add_action("c", "Cancel");
        for character in &characters {
            menu.add_choice(character.name.as_str(), character.id);
        }

        let Some(character_id) = self.exec_menu(&menu).await?.and_then(|s| s.data) else {
            return Ok(());
        };
        match self.context.store.delete_character(character_id) {
            Ok(character) => {
                tracing::info!(character = %character.name, "Deleted character");
                self.send_line(&format!("Deleted {}", character.name)).await?;
            }
            Err(e @ (WorldError::CharacterOnline | WorldError::CharacterNotFound(_))) => {
                self.send_error(&e.to_string()).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
