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

//! World store errors

use mudhall_common::{AreaId, CharacterId, Direction, RoomId, UserId, ZoneId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("Zone not found: {0}")]
    ZoneNotFound(ZoneId),

    #[error("Area not found: {0}")]
    AreaNotFound(AreaId),

    #[error("No zone named '{0}'")]
    ZoneNameNotFound(String),

    #[error("No area named '{0}'")]
    AreaNameNotFound(String),

    #[error("No item named '{0}'")]
    ItemNameNotFound(String),

    #[error("That name is unavailable")]
    NameTaken(String),

    #[error("{0}")]
    InvalidName(String),

    #[error("That user is already online")]
    AlreadyOnline,

    #[error("That character is already online")]
    CharacterOnline,

    #[error("That user is currently online")]
    UserOnline,

    #[error("You can't go that way")]
    NoExit(Direction),

    #[error("There is no room to the {0}")]
    NoRoom(Direction),

    #[error("The world has no rooms")]
    NoRooms,

    #[error("That room is occupied")]
    RoomOccupied,

    #[error("That is not a player character")]
    NotAPlayer,

    #[error("That is not an NPC")]
    NotAnNpc,

    #[error("Password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("Background task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

pub type WorldResult<T> = Result<T, WorldError>;
