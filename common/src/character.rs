//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
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

//! Shared character types

use crate::account::UserId;
use crate::world::RoomId;
use serde::{Deserialize, Serialize};

crate::entity_id! {
    /// Unique identifier of a player or non-player character
    CharacterId
}

/// What drives a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterKind {
    /// Played by the owning user
    Player { owner: UserId },
    /// Driven by a behavior task
    Npc {
        /// Wander through random exits each tick
        roaming: bool,
        /// Line spoken when a player talks to the NPC
        conversation: String,
    },
}

/// A character standing somewhere in the world.
///
/// The location is held as a room identifier only; the room is looked up
/// through the world store when needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub room_id: RoomId,
    pub kind: CharacterKind,
    pub online: bool,
    pub cash: i64,
}

impl Character {
    /// Create a player character owned by `owner`
    pub fn player(name: impl Into<String>, owner: UserId, room_id: RoomId) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            room_id,
            kind: CharacterKind::Player { owner },
            online: false,
            cash: 0,
        }
    }

    /// Create a non-player character; NPCs start out stationary
    pub fn npc(name: impl Into<String>, room_id: RoomId) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            room_id,
            kind: CharacterKind::Npc {
                roaming: false,
                conversation: String::new(),
            },
            online: false,
            cash: 0,
        }
    }

    pub fn is_npc(&self) -> bool {
        matches!(self.kind, CharacterKind::Npc { .. })
    }

    pub fn is_roaming(&self) -> bool {
        matches!(self.kind, CharacterKind::Npc { roaming: true, .. })
    }

    /// Owning user, for player characters
    pub fn owner(&self) -> Option<UserId> {
        match self.kind {
            CharacterKind::Player { owner } => Some(owner),
            CharacterKind::Npc { .. } => None,
        }
    }
}
