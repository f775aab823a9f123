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

//! Event type definitions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

/// Which kind of entity the event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Player,
    Npc,
    Room,
    Zone,
    Area,
    Item,
}

/// A world mutation notification.
///
/// Events are immutable once published and carry only the identifier of the
/// entity; subscribers look the entity up in the store when they need more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub entity: EntityKind,
    pub id: Uuid,
}

impl Event {
    pub fn new(kind: EventKind, entity: EntityKind, id: Uuid) -> Self {
        Self { kind, entity, id }
    }

    pub fn created(entity: EntityKind, id: Uuid) -> Self {
        Self::new(EventKind::Create, entity, id)
    }

    pub fn updated(entity: EntityKind, id: Uuid) -> Self {
        Self::new(EventKind::Update, entity, id)
    }

    pub fn deleted(entity: EntityKind, id: Uuid) -> Self {
        Self::new(EventKind::Delete, entity, id)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {:?} {}", self.kind, self.entity, self.id)
    }
}
