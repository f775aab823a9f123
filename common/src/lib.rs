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

//! Mudhall Common Types
//!
//! This crate defines the data model shared by the world server and the gateway:
//! - Identifiers for every persistent entity
//! - User accounts and their terminal preferences
//! - Player and non-player characters
//! - Zones, areas, rooms, items and the direction/coordinate geometry

pub mod account;
pub mod character;
pub mod world;

pub use account::{ColorMode, User, UserId};
pub use character::{Character, CharacterId, CharacterKind};
pub use world::{Area, AreaId, Coordinate, Direction, Item, ItemId, Room, RoomId, Zone, ZoneId};

/// Declares a UUID backed identifier newtype.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wrap an existing UUID
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn uuid(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use entity_id;

/// Validate a user, character or NPC name.
///
/// Names are 3 to 12 ASCII letters.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.len() < 3 {
        return Err("Names must be at least 3 letters long".to_string());
    }
    if name.len() > 12 {
        return Err("Names may not be longer than 12 letters".to_string());
    }
    if !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err("Names may only contain letters".to_string());
    }
    Ok(())
}

/// Normalize a name for display: first letter upper case, the rest lower case.
pub fn format_name(name: &str) -> String {
    let simple = name.trim().to_lowercase();
    let mut chars = simple.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
