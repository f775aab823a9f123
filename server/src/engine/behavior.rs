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

//! Per-NPC behavior loop

use super::throttle::Throttle;
use crate::error::WorldError;
use crate::store::WorldStore;
use mudhall_common::{CharacterId, Direction};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a single behavior tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Keep running
    Continue,
    /// The NPC is gone; stop the task
    Finished,
}

/// Drives one NPC. Holds nothing but the NPC's identifier and its pacing;
/// everything else is read from the store on each tick.
pub struct Behavior {
    store: Arc<WorldStore>,
    npc: CharacterId,
    throttle: Throttle,
}

impl Behavior {
    pub fn new(store: Arc<WorldStore>, npc: CharacterId, period: Duration) -> Self {
        Self {
            store,
            npc,
            throttle: Throttle::new(period),
        }
    }

    /// Tick until the NPC disappears
    pub async fn run(mut self) {
        tracing::debug!(npc = %self.npc, "Behavior task started");
        while self.tick() == Tick::Continue {
            self.throttle.sync().await;
        }
        tracing::debug!(npc = %self.npc, "Behavior task finished");
    }

    /// Perform one step of behavior
    pub fn tick(&self) -> Tick {
        let Some(npc) = self.store.character(self.npc) else {
            return Tick::Finished;
        };
        if !npc.is_roaming() {
            return Tick::Continue;
        }

        let exits = match self.store.open_exits(npc.room_id) {
            Ok(exits) => exits,
            Err(e) => {
                tracing::debug!(npc = %npc.name, "Unable to list exits: {}", e);
                return Tick::Continue;
            }
        };
        if exits.is_empty() {
            return Tick::Continue;
        }

        let direction = exits[rand::rng().random_range(0..exits.len())];
        self.step(&npc.name, direction)
    }

    /// Walk one exit. The NPC may have been deleted since it was looked up.
    fn step(&self, name: &str, direction: Direction) -> Tick {
        match self.store.move_character(self.npc, direction) {
            Ok(room) => {
                tracing::trace!(npc = %name, %direction, %room, "NPC roamed");
                Tick::Continue
            }
            Err(WorldError::CharacterNotFound(_)) => Tick::Finished,
            Err(e) => {
                tracing::debug!(npc = %name, %direction, "NPC move failed: {}", e);
                Tick::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    fn world() -> (Arc<WorldStore>, mudhall_common::RoomId) {
        let store = Arc::new(WorldStore::new(Arc::new(EventBus::default())));
        let start = store.bootstrap("Default").unwrap();
        (store, start)
    }

    #[test]
    fn test_stationary_npc_stays_put() {
        let (store, start) = world();
        store.build_room(start, Direction::North).unwrap();
        let npc = store.create_npc("Guard", start).unwrap();

        let behavior = Behavior::new(store.clone(), npc.id, Duration::from_secs(1));
        for _ in 0..5 {
            assert_eq!(behavior.tick(), Tick::Continue);
        }
        assert_eq!(store.character(npc.id).unwrap().room_id, start);
    }

    #[test]
    fn test_roaming_npc_moves_through_open_exit() {
        let (store, start) = world();
        let east = store.build_room(start, Direction::East).unwrap();
        let npc = store.create_npc("Rover", start).unwrap();
        store.set_npc_roaming(npc.id, true).unwrap();

        let behavior = Behavior::new(store.clone(), npc.id, Duration::from_secs(1));
        assert_eq!(behavior.tick(), Tick::Continue);
        assert_eq!(store.character(npc.id).unwrap().room_id, east);

        // Only the way back is open now
        assert_eq!(behavior.tick(), Tick::Continue);
        assert_eq!(store.character(npc.id).unwrap().room_id, start);
    }

    #[test]
    fn test_roaming_npc_with_no_exits_waits() {
        let (store, start) = world();
        let npc = store.create_npc("Rover", start).unwrap();
        store.set_npc_roaming(npc.id, true).unwrap();

        let behavior = Behavior::new(store.clone(), npc.id, Duration::from_secs(1));
        assert_eq!(behavior.tick(), Tick::Continue);
        assert_eq!(store.character(npc.id).unwrap().room_id, start);
    }

    #[test]
    fn test_deleted_npc_finishes() {
        let (store, start) = world();
        let npc = store.create_npc("Ghost", start).unwrap();
        let behavior = Behavior::new(store.clone(), npc.id, Duration::from_secs(1));

        store.delete_character(npc.id).unwrap();
        assert_eq!(behavior.tick(), Tick::Finished);
    }

    #[test]
    fn test_step_after_deletion_finishes() {
        let (store, start) = world();
        store.build_room(start, Direction::North).unwrap();
        let npc = store.create_npc("Ghost", start).unwrap();
        let behavior = Behavior::new(store.clone(), npc.id, Duration::from_secs(1));

        // A failed move on a live NPC keeps the task going
        assert_eq!(behavior.step(&npc.name, Direction::East), Tick::Continue);

        store.delete_character(npc.id).unwrap();
        assert_eq!(behavior.step(&npc.name, Direction::North), Tick::Finished);
    }
}
