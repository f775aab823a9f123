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

//! Presence registry
//!
//! Tracks which connection every online user is bound to and gives every
//! in-game character a message queue other sessions can post to.

use crate::telnet::ConnectionId;
use crate::watch::FanOut;
use mudhall_common::{CharacterId, RoomId, UserId};
use mudhall_server::WorldStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Message delivered to an in-game session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMessage {
    /// Ambient room or broadcast chatter; hidden in silent mode
    Notice(String),
    /// Private message; always shown and sets the reply target
    Tell { from: CharacterId, text: String },
}

/// Handle to the connection an online user is bound to
#[derive(Clone)]
pub struct UserHandle {
    pub connection_id: ConnectionId,
    pub output: Arc<FanOut>,
    pub closed: CancellationToken,
}

/// Online users and in-game characters
#[derive(Default)]
pub struct PresenceRegistry {
    users: RwLock<HashMap<UserId, UserHandle>>,
    characters: RwLock<HashMap<CharacterId, mpsc::UnboundedSender<GameMessage>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the connection `user_id` is logged in on
    pub fn bind_user(&self, user_id: UserId, handle: UserHandle) {
        self.users.write().insert(user_id, handle);
    }

    /// Forget the binding, but only if it still belongs to `connection_id`
    pub fn unbind_user(&self, user_id: UserId, connection_id: ConnectionId) {
        let mut users = self.users.write();
        if users
            .get(&user_id)
            .is_some_and(|handle| handle.connection_id == connection_id)
        {
            users.remove(&user_id);
        }
    }

    pub fn user(&self, user_id: UserId) -> Option<UserHandle> {
        self.users.read().get(&user_id).cloned()
    }

    pub fn online_user_count(&self) -> usize {
        self.users.read().len()
    }

    /// Detach `watcher` from every connection it might be watching
    pub fn remove_watcher_everywhere(&self, watcher: ConnectionId) {
        let outputs: Vec<Arc<FanOut>> = self
            .users
            .read()
            .values()
            .map(|handle| handle.output.clone())
            .collect();
        for output in outputs {
            output.remove_watcher(watcher);
        }
    }

    /// Open the message queue of a character entering the game
    pub fn enter(&self, character_id: CharacterId) -> mpsc::UnboundedReceiver<GameMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.characters.write().insert(character_id, sender);
        receiver
    }

    pub fn leave(&self, character_id: CharacterId) {
        self.characters.write().remove(&character_id);
    }

    pub fn is_in_game(&self, character_id: CharacterId) -> bool {
        self.characters.read().contains_key(&character_id)
    }

    /// Post a message to one character. Returns false if it is not in game.
    pub fn send(&self, character_id: CharacterId, message: GameMessage) -> bool {
        match self.characters.read().get(&character_id) {
            Some(sender) => sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Post a notice to every in-game character except `except`
    pub fn broadcast(&self, except: Option<CharacterId>, text: &str) {
        for (id, sender) in self.characters.read().iter() {
            if Some(*id) != except {
                let _ = sender.send(GameMessage::Notice(text.to_string()));
            }
        }
    }

    /// Post a notice to every in-game character standing in `room_id`
    pub fn notify_room(
        &self,
        store: &WorldStore,
        room_id: RoomId,
        except: Option<CharacterId>,
        text: &str,
    ) {
        for character in store.characters_in(room_id) {
            if Some(character.id) != except {
                self.send(character.id, GameMessage::Notice(text.to_string()));
            }
        }
    }
}
