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

//! In-memory world store
//!
//! Holds every user, character, zone, area, room and item behind a single
//! reader/writer lock. Each public operation takes the lock exactly once, so
//! every operation is atomic with respect to every other. Mutations publish
//! an [`Event`] on the world [`EventBus`] while the write lock is still held,
//! which keeps event order identical to mutation order.
//!
//! The lock is a synchronous `parking_lot` lock and is never held across an
//! `.await`; this also lets session cleanup run from `Drop`. Password hashing
//! is slow on purpose, so async callers go through [`WorldStore::register_user`]
//! and [`WorldStore::authenticate`], which run it on the blocking pool.

use crate::error::{WorldError, WorldResult};
use crate::events::{EntityKind, Event, EventBus};
use mudhall_common::account::UserRole;
use mudhall_common::{
    Area, AreaId, Character, CharacterId, CharacterKind, ColorMode, Coordinate, Direction, Item,
    ItemId, Room, RoomId, User, UserId, Zone, ZoneId, format_name, validate_name,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Default bcrypt work factor for stored passwords
pub const DEFAULT_PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Default)]
struct WorldState {
    users: HashMap<UserId, User>,
    characters: HashMap<CharacterId, Character>,
    zones: HashMap<ZoneId, Zone>,
    areas: HashMap<AreaId, Area>,
    rooms: HashMap<RoomId, Room>,
    items: HashMap<ItemId, Item>,
    locations: HashMap<(ZoneId, Coordinate), RoomId>,
    start_room: Option<RoomId>,
}

impl WorldState {
    fn character_name_taken(&self, name: &str) -> bool {
        self.characters
            .values()
            .any(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn user_name_taken(&self, name: &str) -> bool {
        self.users.values().any(|u| u.name.eq_ignore_ascii_case(name))
    }

    fn neighbour(&self, room: &Room, direction: Direction) -> Option<RoomId> {
        self.locations
            .get(&(room.zone_id, room.location.next(direction)))
            .copied()
    }

    fn insert_room(&mut self, zone_id: ZoneId, location: Coordinate) -> RoomId {
        let room = Room::new(zone_id, location);
        let id = room.id;
        self.locations.insert((zone_id, location), id);
        self.rooms.insert(id, room);
        id
    }
}

fn character_entity(character: &Character) -> EntityKind {
    match character.kind {
        CharacterKind::Player { .. } => EntityKind::Player,
        CharacterKind::Npc { .. } => EntityKind::Npc,
    }
}

fn by_location(room: &Room) -> (i32, i32, i32) {
    (room.location.z, room.location.y, room.location.x)
}

fn clean_label(text: &str) -> WorldResult<String> {
    clean_text(text, "A name is required")
}

fn clean_text(text: &str, missing: &str) -> WorldResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(WorldError::InvalidName(missing.to_string()));
    }
    Ok(text.to_string())
}

/// Shared, concurrency safe world model
pub struct WorldStore {
    state: RwLock<WorldState>,
    bus: Arc<EventBus>,
    password_cost: u32,
}

impl WorldStore {
    /// Create an empty world publishing to `bus`
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            state: RwLock::new(WorldState::default()),
            bus,
            password_cost: DEFAULT_PASSWORD_COST,
        }
    }

    /// Override the bcrypt work factor used for new passwords
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Make sure the world has somewhere to stand.
    ///
    /// When there are no rooms at all, the first zone (or a new zone named
    /// `zone_name`) receives a room at the origin. Returns the start room.
    pub fn bootstrap(&self, zone_name: &str) -> WorldResult<RoomId> {
        let mut state = self.state.write();
        if state.rooms.is_empty() {
            let existing = state
                .zones
                .values()
                .min_by(|a, b| a.name.cmp(&b.name))
                .map(|zone| zone.id);
            let zone_id = match existing {
                Some(id) => id,
                None => {
                    let zone = Zone {
                        id: ZoneId::new(),
                        name: clean_label(zone_name)?,
                    };
                    let id = zone.id;
                    state.zones.insert(id, zone);
                    self.bus.publish(Event::created(EntityKind::Zone, id.uuid()));
                    id
                }
            };
            let room_id = state.insert_room(zone_id, Coordinate::default());
            self.bus
                .publish(Event::created(EntityKind::Room, room_id.uuid()));
            tracing::info!("Bootstrapped empty world with start room {}", room_id);
            state.start_room = Some(room_id);
        }
        Self::resolve_start_room(&mut state)
    }

    /// Room where new characters appear
    pub fn start_room(&self) -> WorldResult<RoomId> {
        Self::resolve_start_room(&mut self.state.write())
    }

    fn resolve_start_room(state: &mut WorldState) -> WorldResult<RoomId> {
        if let Some(id) = state.start_room.filter(|id| state.rooms.contains_key(id)) {
            return Ok(id);
        }
        let fallback = state
            .rooms
            .values()
            .min_by_key(|room| by_location(room))
            .map(|room| room.id)
            .ok_or(WorldError::NoRooms)?;
        state.start_room = Some(fallback);
        Ok(fallback)
    }

    // ---------------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------------

    /// Register a new user. The first user ever registered is an admin.
    pub fn create_user(&self, name: &str, password: &str) -> WorldResult<User> {
        let name = format_name(name);
        validate_name(&name).map_err(WorldError::InvalidName)?;
        if self.state.read().user_name_taken(&name) {
            return Err(WorldError::NameTaken(name));
        }

        // Hash outside the lock
        let hash = bcrypt::hash(password, self.password_cost)?;

        let mut state = self.state.write();
        if state.user_name_taken(&name) {
            return Err(WorldError::NameTaken(name));
        }
        let mut user = User::new(name, hash);
        if state.users.is_empty() {
            user.role = UserRole::Admin;
        }
        state.users.insert(user.id, user.clone());
        self.bus.publish(Event::created(EntityKind::User, user.id.uuid()));
        tracing::info!(user = %user.name, role = %user.role, "Created user");
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.state.read().users.get(&id).cloned()
    }

    pub fn user_by_name(&self, name: &str) -> Option<User> {
        let name = name.trim();
        self.state
            .read()
            .users
            .values()
            .find(|u| u.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Every user, sorted by name
    pub fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.state.read().users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        users
    }

    /// [`WorldStore::create_user`] on the blocking thread pool
    pub async fn register_user(self: &Arc<Self>, name: &str, password: &str) -> WorldResult<User> {
        let store = Arc::clone(self);
        let (name, password) = (name.to_string(), password.to_string());
        tokio::task::spawn_blocking(move || store.create_user(&name, &password)).await?
    }

    /// [`WorldStore::verify_password`] on the blocking thread pool
    pub async fn authenticate(self: &Arc<Self>, id: UserId, password: &str) -> WorldResult<bool> {
        let store = Arc::clone(self);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || store.verify_password(id, &password)).await?
    }

    pub fn verify_password(&self, id: UserId, password: &str) -> WorldResult<bool> {
        let hash = self
            .state
            .read()
            .users
            .get(&id)
            .map(|u| u.password_hash.clone())
            .ok_or(WorldError::UserNotFound(id))?;
        Ok(bcrypt::verify(password, &hash)?)
    }

    /// Mark a user online. Fails if the user is already online elsewhere.
    pub fn login_user(&self, id: UserId) -> WorldResult<()> {
        let mut state = self.state.write();
        let user = state.users.get_mut(&id).ok_or(WorldError::UserNotFound(id))?;
        if user.online {
            return Err(WorldError::AlreadyOnline);
        }
        user.online = true;
        self.bus.publish(Event::updated(EntityKind::User, id.uuid()));
        Ok(())
    }

    /// Mark a user offline. Unknown users are ignored.
    pub fn logout_user(&self, id: UserId) {
        let mut state = self.state.write();
        if let Some(user) = state.users.get_mut(&id) {
            if user.online {
                user.online = false;
                self.bus.publish(Event::updated(EntityKind::User, id.uuid()));
            }
        }
    }

    /// Delete an offline user together with all of their characters
    pub fn delete_user(&self, id: UserId) -> WorldResult<()> {
        let mut state = self.state.write();
        let user = state.users.get(&id).ok_or(WorldError::UserNotFound(id))?;
        if user.online {
            return Err(WorldError::UserOnline);
        }
        let owned: Vec<CharacterId> = state
            .characters
            .values()
            .filter(|c| c.owner() == Some(id))
            .map(|c| c.id)
            .collect();
        for character_id in owned {
            state.characters.remove(&character_id);
            self.bus
                .publish(Event::deleted(EntityKind::Player, character_id.uuid()));
        }
        if let Some(user) = state.users.remove(&id) {
            tracing::info!(user = %user.name, "Deleted user");
        }
        self.bus.publish(Event::deleted(EntityKind::User, id.uuid()));
        Ok(())
    }

    fn update_user<F>(&self, id: UserId, update: F) -> WorldResult<()>
    where
        F: FnOnce(&mut User),
    {
        let mut state = self.state.write();
        let user = state.users.get_mut(&id).ok_or(WorldError::UserNotFound(id))?;
        update(user);
        self.bus.publish(Event::updated(EntityKind::User, id.uuid()));
        Ok(())
    }

    pub fn set_color_mode(&self, id: UserId, mode: ColorMode) -> WorldResult<()> {
        self.update_user(id, |user| user.color_mode = mode)
    }

    pub fn set_window_size(&self, id: UserId, width: u16, height: u16) -> WorldResult<()> {
        self.update_user(id, |user| user.window_size = (width, height))
    }

    pub fn set_terminal_type(&self, id: UserId, terminal_type: String) -> WorldResult<()> {
        self.update_user(id, |user| user.terminal_type = Some(terminal_type))
    }

    // ---------------------------------------------------------------------
    // Characters
    // ---------------------------------------------------------------------

    /// Create a player character for `owner` in the start room
    pub fn create_character(&self, owner: UserId, name: &str) -> WorldResult<Character> {
        let name = format_name(name);
        validate_name(&name).map_err(WorldError::InvalidName)?;

        let mut state = self.state.write();
        if !state.users.contains_key(&owner) {
            return Err(WorldError::UserNotFound(owner));
        }
        if state.character_name_taken(&name) {
            return Err(WorldError::NameTaken(name));
        }
        let room_id = Self::resolve_start_room(&mut state)?;
        let character = Character::player(name, owner, room_id);
        state.characters.insert(character.id, character.clone());
        self.bus
            .publish(Event::created(EntityKind::Player, character.id.uuid()));
        Ok(character)
    }

    /// Create a stationary NPC in `room_id`
    pub fn create_npc(&self, name: &str, room_id: RoomId) -> WorldResult<Character> {
        let name = format_name(name);
        validate_name(&name).map_err(WorldError::InvalidName)?;

        let mut state = self.state.write();
        if !state.rooms.contains_key(&room_id) {
            return Err(WorldError::RoomNotFound(room_id));
        }
        if state.character_name_taken(&name) {
            return Err(WorldError::NameTaken(name));
        }
        let npc = Character::npc(name, room_id);
        state.characters.insert(npc.id, npc.clone());
        self.bus.publish(Event::created(EntityKind::Npc, npc.id.uuid()));
        tracing::debug!(npc = %npc.name, "Created NPC");
        Ok(npc)
    }

    pub fn character(&self, id: CharacterId) -> Option<Character> {
        self.state.read().characters.get(&id).cloned()
    }

    pub fn character_by_name(&self, name: &str) -> Option<Character> {
        let name = name.trim();
        self.state
            .read()
            .characters
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn sorted_characters<F>(&self, filter: F) -> Vec<Character>
    where
        F: Fn(&Character) -> bool,
    {
        let mut characters: Vec<Character> = self
            .state
            .read()
            .characters
            .values()
            .filter(|c| filter(*c))
            .cloned()
            .collect();
        characters.sort_by(|a, b| a.name.cmp(&b.name));
        characters
    }

    /// Characters owned by `owner`, sorted by name
    pub fn characters_of(&self, owner: UserId) -> Vec<Character> {
        self.sorted_characters(|c| c.owner() == Some(owner))
    }

    /// Every NPC, sorted by name
    pub fn npcs(&self) -> Vec<Character> {
        self.sorted_characters(Character::is_npc)
    }

    /// Player characters currently in the game, sorted by name
    pub fn online_players(&self) -> Vec<Character> {
        self.sorted_characters(|c| !c.is_npc() && c.online)
    }

    /// Online players and all NPCs standing in `room_id`, sorted by name
    pub fn characters_in(&self, room_id: RoomId) -> Vec<Character> {
        self.sorted_characters(|c| c.room_id == room_id && (c.online || c.is_npc()))
    }

    /// Put a character into the game. Fails if it is already in play.
    pub fn enter_world(&self, id: CharacterId) -> WorldResult<()> {
        let mut state = self.state.write();
        let state = &mut *state;
        let character = state
            .characters
            .get_mut(&id)
            .ok_or(WorldError::CharacterNotFound(id))?;
        if character.online {
            return Err(WorldError::CharacterOnline);
        }
        // Characters whose room was destroyed while they were away
        // reappear in the start room
        if !state.rooms.contains_key(&character.room_id) {
            if let Some(start) = state.start_room.filter(|r| state.rooms.contains_key(r)) {
                character.room_id = start;
            } else if let Some(any) = state.rooms.keys().next() {
                character.room_id = *any;
            }
        }
        character.online = true;
        self.bus
            .publish(Event::updated(character_entity(character), id.uuid()));
        Ok(())
    }

    /// Take a character out of the game. Unknown characters are ignored.
    pub fn leave_world(&self, id: CharacterId) {
        let mut state = self.state.write();
        if let Some(character) = state.characters.get_mut(&id) {
            if character.online {
                character.online = false;
                self.bus
                    .publish(Event::updated(character_entity(character), id.uuid()));
            }
        }
    }

    /// Delete a character that is not currently in play
    pub fn delete_character(&self, id: CharacterId) -> WorldResult<Character> {
        let mut state = self.state.write();
        let character = state
            .characters
            .get(&id)
            .ok_or(WorldError::CharacterNotFound(id))?;
        if character.online {
            return Err(WorldError::CharacterOnline);
        }
        let entity = character_entity(character);
        let removed = state
            .characters
            .remove(&id)
            .ok_or(WorldError::CharacterNotFound(id))?;
        self.bus.publish(Event::deleted(entity, id.uuid()));
        Ok(removed)
    }

    fn update_npc<F>(&self, id: CharacterId, update: F) -> WorldResult<()>
    where
        F: FnOnce(&mut bool, &mut String),
    {
        let mut state = self.state.write();
        let character = state
            .characters
            .get_mut(&id)
            .ok_or(WorldError::CharacterNotFound(id))?;
        match &mut character.kind {
            CharacterKind::Npc {
                roaming,
                conversation,
            } => update(roaming, conversation),
            CharacterKind::Player { .. } => return Err(WorldError::NotAnNpc),
        }
        self.bus.publish(Event::updated(EntityKind::Npc, id.uuid()));
        Ok(())
    }

    /// Give an NPC a new, unused name
    pub fn rename_npc(&self, id: CharacterId, name: &str) -> WorldResult<Character> {
        let name = format_name(name);
        validate_name(&name).map_err(WorldError::InvalidName)?;

        let mut state = self.state.write();
        if state
            .characters
            .values()
            .any(|c| c.id != id && c.name.eq_ignore_ascii_case(&name))
        {
            return Err(WorldError::NameTaken(name));
        }
        let npc = state
            .characters
            .get_mut(&id)
            .ok_or(WorldError::CharacterNotFound(id))?;
        if !npc.is_npc() {
            return Err(WorldError::NotAnNpc);
        }
        npc.name = name;
        self.bus.publish(Event::updated(EntityKind::Npc, id.uuid()));
        Ok(npc.clone())
    }

    pub fn set_npc_roaming(&self, id: CharacterId, enabled: bool) -> WorldResult<()> {
        self.update_npc(id, |roaming, _| *roaming = enabled)
    }

    pub fn set_npc_conversation(&self, id: CharacterId, text: &str) -> WorldResult<()> {
        let text = text.trim().to_string();
        self.update_npc(id, |_, conversation| *conversation = text)
    }

    /// Add `amount` to a character's purse, returning the new balance
    pub fn add_cash(&self, id: CharacterId, amount: i64) -> WorldResult<i64> {
        let mut state = self.state.write();
        let character = state
            .characters
            .get_mut(&id)
            .ok_or(WorldError::CharacterNotFound(id))?;
        character.cash = character.cash.saturating_add(amount);
        let balance = character.cash;
        self.bus
            .publish(Event::updated(character_entity(character), id.uuid()));
        Ok(balance)
    }

    /// Move a character one step through an enabled exit.
    ///
    /// The exit check, the destination lookup and the position update happen
    /// under a single write lock. Returns the destination room.
    pub fn move_character(&self, id: CharacterId, direction: Direction) -> WorldResult<RoomId> {
        let mut state = self.state.write();
        let state = &mut *state;
        let character = state
            .characters
            .get_mut(&id)
            .ok_or(WorldError::CharacterNotFound(id))?;
        let room = state
            .rooms
            .get(&character.room_id)
            .ok_or(WorldError::RoomNotFound(character.room_id))?;
        if !room.has_exit(direction) {
            return Err(WorldError::NoExit(direction));
        }
        let destination = state
            .locations
            .get(&(room.zone_id, room.location.next(direction)))
            .copied()
            .ok_or(WorldError::NoRoom(direction))?;
        character.room_id = destination;
        self.bus
            .publish(Event::updated(character_entity(character), id.uuid()));
        Ok(destination)
    }

    /// Place a character directly into an existing room
    pub fn teleport_character(&self, id: CharacterId, room_id: RoomId) -> WorldResult<()> {
        let mut state = self.state.write();
        let state = &mut *state;
        if !state.rooms.contains_key(&room_id) {
            return Err(WorldError::RoomNotFound(room_id));
        }
        let character = state
            .characters
            .get_mut(&id)
            .ok_or(WorldError::CharacterNotFound(id))?;
        character.room_id = room_id;
        self.bus
            .publish(Event::updated(character_entity(character), id.uuid()));
        Ok(())
    }

    /// Place a character at a coordinate of a zone, building the room there
    /// if none exists yet. Returns the room.
    pub fn move_to_location(
        &self,
        id: CharacterId,
        zone_id: ZoneId,
        location: Coordinate,
    ) -> WorldResult<RoomId> {
        let mut state = self.state.write();
        if !state.zones.contains_key(&zone_id) {
            return Err(WorldError::ZoneNotFound(zone_id));
        }
        if !state.characters.contains_key(&id) {
            return Err(WorldError::CharacterNotFound(id));
        }
        let room_id = match state.locations.get(&(zone_id, location)).copied() {
            Some(existing) => existing,
            None => {
                let created = state.insert_room(zone_id, location);
                self.bus
                    .publish(Event::created(EntityKind::Room, created.uuid()));
                created
            }
        };
        if let Some(character) = state.characters.get_mut(&id) {
            character.room_id = room_id;
            self.bus
                .publish(Event::updated(character_entity(character), id.uuid()));
        }
        Ok(room_id)
    }

    // ---------------------------------------------------------------------
    // Rooms
    // ---------------------------------------------------------------------

    pub fn room(&self, id: RoomId) -> Option<Room> {
        self.state.read().rooms.get(&id).cloned()
    }

    /// Rooms of a zone ordered by level, then row, then column
    pub fn rooms_in_zone(&self, zone_id: ZoneId) -> Vec<Room> {
        let mut rooms: Vec<Room> = self
            .state
            .read()
            .rooms
            .values()
            .filter(|r| r.zone_id == zone_id)
            .cloned()
            .collect();
        rooms.sort_by_key(by_location);
        rooms
    }

    pub fn room_count(&self) -> usize {
        self.state.read().rooms.len()
    }

    /// Enabled exits of a room that lead to an existing room
    pub fn open_exits(&self, room_id: RoomId) -> WorldResult<Vec<Direction>> {
        let state = self.state.read();
        let room = state
            .rooms
            .get(&room_id)
            .ok_or(WorldError::RoomNotFound(room_id))?;
        Ok(room
            .exits
            .iter()
            .copied()
            .filter(|d| state.neighbour(room, *d).is_some())
            .collect())
    }

    /// Open an exit from `room_id` and make sure a room with a matching
    /// return exit exists on the other side. Returns the neighbouring room.
    pub fn build_room(&self, room_id: RoomId, direction: Direction) -> WorldResult<RoomId> {
        let mut state = self.state.write();
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or(WorldError::RoomNotFound(room_id))?;
        room.exits.insert(direction);
        let zone_id = room.zone_id;
        let target = room.location.next(direction);
        self.bus.publish(Event::updated(EntityKind::Room, room_id.uuid()));

        let neighbour_id = match state.locations.get(&(zone_id, target)).copied() {
            Some(existing) => existing,
            None => {
                let created = state.insert_room(zone_id, target);
                self.bus
                    .publish(Event::created(EntityKind::Room, created.uuid()));
                created
            }
        };
        if let Some(neighbour) = state.rooms.get_mut(&neighbour_id) {
            neighbour.exits.insert(direction.opposite());
            self.bus
                .publish(Event::updated(EntityKind::Room, neighbour_id.uuid()));
        }
        Ok(neighbour_id)
    }

    /// Destroy the room next to `room_id` in `direction`.
    ///
    /// Refused while anyone stands in it. Items in the room are destroyed and
    /// exits leading into it are closed.
    pub fn destroy_room(&self, room_id: RoomId, direction: Direction) -> WorldResult<RoomId> {
        let mut state = self.state.write();
        let room = state
            .rooms
            .get(&room_id)
            .ok_or(WorldError::RoomNotFound(room_id))?;
        let victim_id = state
            .neighbour(room, direction)
            .ok_or(WorldError::NoRoom(direction))?;
        if state
            .characters
            .values()
            .any(|c| c.room_id == victim_id && (c.online || c.is_npc()))
        {
            return Err(WorldError::RoomOccupied);
        }
        let victim = state
            .rooms
            .remove(&victim_id)
            .ok_or(WorldError::RoomNotFound(victim_id))?;
        state.locations.remove(&(victim.zone_id, victim.location));
        for item_id in &victim.item_ids {
            state.items.remove(item_id);
            self.bus.publish(Event::deleted(EntityKind::Item, item_id.uuid()));
        }
        for dir in Direction::ALL {
            let key = (victim.zone_id, victim.location.next(dir));
            if let Some(adjacent_id) = state.locations.get(&key).copied() {
                if let Some(adjacent) = state.rooms.get_mut(&adjacent_id) {
                    if adjacent.exits.remove(&dir.opposite()) {
                        self.bus
                            .publish(Event::updated(EntityKind::Room, adjacent_id.uuid()));
                    }
                }
            }
        }
        self.bus.publish(Event::deleted(EntityKind::Room, victim_id.uuid()));
        Ok(victim_id)
    }

    fn update_room<F, T>(&self, id: RoomId, update: F) -> WorldResult<T>
    where
        F: FnOnce(&mut Room) -> T,
    {
        let mut state = self.state.write();
        let room = state.rooms.get_mut(&id).ok_or(WorldError::RoomNotFound(id))?;
        let result = update(room);
        self.bus.publish(Event::updated(EntityKind::Room, id.uuid()));
        Ok(result)
    }

    pub fn set_room_title(&self, id: RoomId, title: &str) -> WorldResult<()> {
        let title = clean_text(title, "A title is required")?;
        self.update_room(id, |room| room.title = title)
    }

    pub fn set_room_description(&self, id: RoomId, description: &str) -> WorldResult<()> {
        let description = clean_text(description, "A description is required")?;
        self.update_room(id, |room| room.description = description)
    }

    /// Flip an exit of `room_id`. The matching exit of the neighbouring room,
    /// if there is one, follows. Returns whether the exit is now open.
    pub fn toggle_exit(&self, room_id: RoomId, direction: Direction) -> WorldResult<bool> {
        let mut state = self.state.write();
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or(WorldError::RoomNotFound(room_id))?;
        let open = !room.exits.remove(&direction);
        if open {
            room.exits.insert(direction);
        }
        self.bus.publish(Event::updated(EntityKind::Room, room_id.uuid()));

        let neighbour_id = state
            .rooms
            .get(&room_id)
            .and_then(|room| state.neighbour(room, direction));
        if let Some(neighbour) = neighbour_id.and_then(|id| state.rooms.get_mut(&id)) {
            if open {
                neighbour.exits.insert(direction.opposite());
            } else {
                neighbour.exits.remove(&direction.opposite());
            }
            self.bus
                .publish(Event::updated(EntityKind::Room, neighbour.id.uuid()));
        }
        Ok(open)
    }

    pub fn set_room_property(&self, id: RoomId, key: &str, value: &str) -> WorldResult<()> {
        self.update_room(id, |room| {
            room.properties.insert(key.to_string(), value.to_string());
        })
    }

    /// Remove a property, returning whether it was present
    pub fn remove_room_property(&self, id: RoomId, key: &str) -> WorldResult<bool> {
        self.update_room(id, |room| room.properties.remove(key).is_some())
    }

    pub fn set_room_area(&self, id: RoomId, area_id: Option<AreaId>) -> WorldResult<()> {
        if let Some(area_id) = area_id {
            if !self.state.read().areas.contains_key(&area_id) {
                return Err(WorldError::AreaNotFound(area_id));
            }
        }
        self.update_room(id, |room| room.area_id = area_id)
    }

    // ---------------------------------------------------------------------
    // Zones and areas
    // ---------------------------------------------------------------------

    /// Every zone, sorted by name
    pub fn zones(&self) -> Vec<Zone> {
        let mut zones: Vec<Zone> = self.state.read().zones.values().cloned().collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        zones
    }

    pub fn zone(&self, id: ZoneId) -> Option<Zone> {
        self.state.read().zones.get(&id).cloned()
    }

    pub fn zone_by_name(&self, name: &str) -> Option<Zone> {
        let name = name.trim();
        self.state
            .read()
            .zones
            .values()
            .find(|z| z.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn create_zone(&self, name: &str) -> WorldResult<Zone> {
        let name = clean_label(name)?;
        let mut state = self.state.write();
        if state.zones.values().any(|z| z.name.eq_ignore_ascii_case(&name)) {
            return Err(WorldError::NameTaken(name));
        }
        let zone = Zone {
            id: ZoneId::new(),
            name,
        };
        state.zones.insert(zone.id, zone.clone());
        self.bus.publish(Event::created(EntityKind::Zone, zone.id.uuid()));
        Ok(zone)
    }

    pub fn rename_zone(&self, id: ZoneId, name: &str) -> WorldResult<()> {
        let name = clean_label(name)?;
        let mut state = self.state.write();
        if state
            .zones
            .values()
            .any(|z| z.id != id && z.name.eq_ignore_ascii_case(&name))
        {
            return Err(WorldError::NameTaken(name));
        }
        let zone = state.zones.get_mut(&id).ok_or(WorldError::ZoneNotFound(id))?;
        zone.name = name;
        self.bus.publish(Event::updated(EntityKind::Zone, id.uuid()));
        Ok(())
    }

    /// Areas of a zone, sorted by name
    pub fn areas_in(&self, zone_id: ZoneId) -> Vec<Area> {
        let mut areas: Vec<Area> = self
            .state
            .read()
            .areas
            .values()
            .filter(|a| a.zone_id == zone_id)
            .cloned()
            .collect();
        areas.sort_by(|a, b| a.name.cmp(&b.name));
        areas
    }

    pub fn area(&self, id: AreaId) -> Option<Area> {
        self.state.read().areas.get(&id).cloned()
    }

    pub fn area_by_name(&self, zone_id: ZoneId, name: &str) -> Option<Area> {
        let name = name.trim();
        self.state
            .read()
            .areas
            .values()
            .find(|a| a.zone_id == zone_id && a.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn create_area(&self, zone_id: ZoneId, name: &str) -> WorldResult<Area> {
        let name = clean_label(name)?;
        let mut state = self.state.write();
        if !state.zones.contains_key(&zone_id) {
            return Err(WorldError::ZoneNotFound(zone_id));
        }
        if state
            .areas
            .values()
            .any(|a| a.zone_id == zone_id && a.name.eq_ignore_ascii_case(&name))
        {
            return Err(WorldError::NameTaken(name));
        }
        let area = Area {
            id: AreaId::new(),
            zone_id,
            name,
        };
        state.areas.insert(area.id, area.clone());
        self.bus.publish(Event::created(EntityKind::Area, area.id.uuid()));
        Ok(area)
    }

    // ---------------------------------------------------------------------
    // Items
    // ---------------------------------------------------------------------

    pub fn create_item(&self, room_id: RoomId, name: &str) -> WorldResult<Item> {
        let name = clean_label(name)?;
        let mut state = self.state.write();
        let item = Item {
            id: ItemId::new(),
            name,
        };
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or(WorldError::RoomNotFound(room_id))?;
        room.item_ids.push(item.id);
        state.items.insert(item.id, item.clone());
        self.bus.publish(Event::created(EntityKind::Item, item.id.uuid()));
        self.bus.publish(Event::updated(EntityKind::Room, room_id.uuid()));
        Ok(item)
    }

    /// Items lying in a room, in the order they were dropped there
    pub fn items_in(&self, room_id: RoomId) -> Vec<Item> {
        let state = self.state.read();
        state
            .rooms
            .get(&room_id)
            .map(|room| {
                room.item_ids
                    .iter()
                    .filter_map(|id| state.items.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Destroy the first item in the room whose name matches
    pub fn destroy_item(&self, room_id: RoomId, name: &str) -> WorldResult<Item> {
        let name = name.trim();
        let mut state = self.state.write();
        let state = &mut *state;
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or(WorldError::RoomNotFound(room_id))?;
        let position = room
            .item_ids
            .iter()
            .position(|id| {
                state
                    .items
                    .get(id)
                    .is_some_and(|item| item.name.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| WorldError::ItemNameNotFound(name.to_string()))?;
        let item_id = room.item_ids.remove(position);
        let item = state
            .items
            .remove(&item_id)
            .ok_or_else(|| WorldError::ItemNameNotFound(name.to_string()))?;
        self.bus.publish(Event::deleted(EntityKind::Item, item_id.uuid()));
        self.bus.publish(Event::updated(EntityKind::Room, room_id.uuid()));
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use proptest::prelude::*;

    fn test_store() -> WorldStore {
        let store = WorldStore::new(Arc::new(EventBus::default())).with_password_cost(4);
        store.bootstrap("Default").unwrap();
        store
    }

    fn origin(store: &WorldStore) -> Room {
        store.room(store.start_room().unwrap()).unwrap()
    }

    #[test]
    fn test_bootstrap_creates_default_zone_and_room() {
        let store = WorldStore::new(Arc::new(EventBus::default()));
        assert_eq!(store.room_count(), 0);

        let start = store.bootstrap("Default").unwrap();
        let room = store.room(start).unwrap();
        assert_eq!(room.location, Coordinate::default());
        assert_eq!(store.zone(room.zone_id).unwrap().name, "Default");

        // Second bootstrap is a no-op
        assert_eq!(store.bootstrap("Other").unwrap(), start);
        assert_eq!(store.zones().len(), 1);
    }

    #[test]
    fn test_first_user_is_admin() {
        let store = test_store();
        let first = store.create_user("alice", "password1").unwrap();
        let second = store.create_user("Bob", "password2").unwrap();

        assert_eq!(first.name, "Alice");
        assert!(first.is_admin());
        assert!(!second.is_admin());
    }

    #[test]
    fn test_user_names_are_unique_and_validated() {
        let store = test_store();
        store.create_user("Alice", "password1").unwrap();

        assert!(matches!(
            store.create_user("ALICE", "password1"),
            Err(WorldError::NameTaken(_))
        ));
        assert!(matches!(
            store.create_user("Al", "password1"),
            Err(WorldError::InvalidName(_))
        ));
        assert!(store.user_by_name("alice").is_some());
    }

    #[test]
    fn test_verify_password() {
        let store = test_store();
        let user = store.create_user("Alice", "correct horse").unwrap();

        assert!(store.verify_password(user.id, "correct horse").unwrap());
        assert!(!store.verify_password(user.id, "battery staple").unwrap());
    }

    #[test]
    fn test_login_is_exclusive() {
        let store = test_store();
        let user = store.create_user("Alice", "password1").unwrap();

        store.login_user(user.id).unwrap();
        assert!(matches!(
            store.login_user(user.id),
            Err(WorldError::AlreadyOnline)
        ));
        store.logout_user(user.id);
        store.login_user(user.id).unwrap();
    }

    #[test]
    fn test_delete_user_refuses_online_and_removes_characters() {
        let store = test_store();
        let user = store.create_user("Alice", "password1").unwrap();
        let character = store.create_character(user.id, "Alicia").unwrap();

        store.login_user(user.id).unwrap();
        assert!(matches!(
            store.delete_user(user.id),
            Err(WorldError::UserOnline)
        ));

        store.logout_user(user.id);
        store.delete_user(user.id).unwrap();
        assert!(store.user(user.id).is_none());
        assert!(store.character(character.id).is_none());
    }

    #[test]
    fn test_characters_sorted_and_unique() {
        let store = test_store();
        let user = store.create_user("Alice", "password1").unwrap();
        store.create_character(user.id, "zed").unwrap();
        store.create_character(user.id, "amy").unwrap();

        let names: Vec<String> = store
            .characters_of(user.id)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Amy", "Zed"]);

        assert!(matches!(
            store.create_npc("Amy", origin(&store).id),
            Err(WorldError::NameTaken(_))
        ));
    }

    #[test]
    fn test_enter_world_is_exclusive() {
        let store = test_store();
        let user = store.create_user("Alice", "password1").unwrap();
        let character = store.create_character(user.id, "Alicia").unwrap();

        store.enter_world(character.id).unwrap();
        assert!(matches!(
            store.enter_world(character.id),
            Err(WorldError::CharacterOnline)
        ));
        assert!(matches!(
            store.delete_character(character.id),
            Err(WorldError::CharacterOnline)
        ));
        store.leave_world(character.id);
        store.delete_character(character.id).unwrap();
    }

    #[test]
    fn test_move_requires_exit_and_room() {
        let store = test_store();
        let start = origin(&store);
        let npc = store.create_npc("Guard", start.id).unwrap();

        assert!(matches!(
            store.move_character(npc.id, Direction::North),
            Err(WorldError::NoExit(Direction::North))
        ));

        let north = store.build_room(start.id, Direction::North).unwrap();
        assert_eq!(store.move_character(npc.id, Direction::North).unwrap(), north);
        assert_eq!(store.character(npc.id).unwrap().room_id, north);

        // Return exit was opened on the new room
        assert_eq!(
            store.move_character(npc.id, Direction::South).unwrap(),
            start.id
        );

        assert!(matches!(
            store.move_character(CharacterId::new(), Direction::North),
            Err(WorldError::CharacterNotFound(_))
        ));
    }

    #[test]
    fn test_open_exits_skip_missing_rooms() {
        let store = test_store();
        let start = origin(&store);
        store.build_room(start.id, Direction::East).unwrap();
        store.set_room_property(start.id, "lit", "yes").unwrap();

        assert_eq!(store.open_exits(start.id).unwrap(), vec![Direction::East]);

        store.destroy_room(start.id, Direction::East).unwrap();
        assert!(store.open_exits(start.id).unwrap().is_empty());
        assert!(!store.room(start.id).unwrap().has_exit(Direction::East));
    }

    #[test]
    fn test_destroy_room_refuses_occupied() {
        let store = test_store();
        let start = origin(&store);
        let west = store.build_room(start.id, Direction::West).unwrap();
        let npc = store.create_npc("Guard", west).unwrap();

        assert!(matches!(
            store.destroy_room(start.id, Direction::West),
            Err(WorldError::RoomOccupied)
        ));
        store.delete_character(npc.id).unwrap();
        assert_eq!(store.destroy_room(start.id, Direction::West).unwrap(), west);
        assert!(matches!(
            store.destroy_room(start.id, Direction::West),
            Err(WorldError::NoRoom(Direction::West))
        ));
    }

    #[test]
    fn test_move_to_location_builds_room() {
        let store = test_store();
        let start = origin(&store);
        let npc = store.create_npc("Guard", start.id).unwrap();
        let target = Coordinate::new(4, 5, 6);

        let room_id = store.move_to_location(npc.id, start.zone_id, target).unwrap();
        assert_eq!(store.room(room_id).unwrap().location, target);
        assert_eq!(
            store.move_to_location(npc.id, start.zone_id, target).unwrap(),
            room_id
        );
    }

    #[test]
    fn test_items_and_properties() {
        let store = test_store();
        let start = origin(&store);

        store.create_item(start.id, "Lamp").unwrap();
        store.create_item(start.id, "Rope").unwrap();
        assert_eq!(store.items_in(start.id).len(), 2);

        store.destroy_item(start.id, "lamp").unwrap();
        let items = store.items_in(start.id);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Rope");
        assert!(store.destroy_item(start.id, "lamp").is_err());

        store.set_room_property(start.id, "smell", "musty").unwrap();
        assert!(store.remove_room_property(start.id, "smell").unwrap());
        assert!(!store.remove_room_property(start.id, "smell").unwrap());
    }

    #[test]
    fn test_zones_and_areas() {
        let store = test_store();
        let start = origin(&store);

        let zone = store.create_zone("Forest").unwrap();
        assert!(store.create_zone("forest").is_err());
        assert!(store.rename_zone(zone.id, "Default").is_err());
        store.rename_zone(zone.id, "Woods").unwrap();
        assert_eq!(store.zone_by_name("woods").unwrap().id, zone.id);

        let area = store.create_area(start.zone_id, "Plaza").unwrap();
        assert!(store.create_area(start.zone_id, "plaza").is_err());
        store.set_room_area(start.id, Some(area.id)).unwrap();
        assert_eq!(store.room(start.id).unwrap().area_id, Some(area.id));
        assert_eq!(store.areas_in(start.zone_id).len(), 1);
    }

    #[test]
    fn test_mutations_publish_events() {
        let bus = Arc::new(EventBus::default());
        let store = WorldStore::new(bus.clone()).with_password_cost(4);
        let start = store.bootstrap("Default").unwrap();
        let mut subscriber = bus.register();

        let npc = store.create_npc("Guard", start).unwrap();
        store.delete_character(npc.id).unwrap();

        let created = subscriber.try_recv().unwrap();
        assert_eq!(created.kind, EventKind::Create);
        assert_eq!(created.entity, EntityKind::Npc);
        assert_eq!(created.id, npc.id.uuid());

        let deleted = subscriber.try_recv().unwrap();
        assert_eq!(deleted.kind, EventKind::Delete);
        assert_eq!(deleted.id, npc.id.uuid());
    }

    #[test]
    fn test_room_title_and_description() {
        let store = test_store();
        let start = origin(&store);

        store.set_room_title(start.id, "  Town Square ").unwrap();
        store
            .set_room_description(start.id, "Cobbles and pigeons.")
            .unwrap();
        let room = store.room(start.id).unwrap();
        assert_eq!(room.title, "Town Square");
        assert_eq!(room.description, "Cobbles and pigeons.");
        assert!(matches!(
            store.set_room_title(start.id, "   "),
            Err(WorldError::InvalidName(_))
        ));
    }

    #[test]
    fn test_toggle_exit_updates_both_sides() {
        let store = test_store();
        let start = origin(&store);
        let north = store.build_room(start.id, Direction::North).unwrap();

        assert!(!store.toggle_exit(start.id, Direction::North).unwrap());
        assert!(!store.room(start.id).unwrap().has_exit(Direction::North));
        assert!(!store.room(north).unwrap().has_exit(Direction::South));

        assert!(store.toggle_exit(start.id, Direction::North).unwrap());
        assert!(store.room(north).unwrap().has_exit(Direction::South));

        // No neighbour: only this side changes
        assert!(store.toggle_exit(start.id, Direction::Up).unwrap());
        assert!(store.room(start.id).unwrap().has_exit(Direction::Up));
        assert_eq!(store.room_count(), 2);
    }

    #[test]
    fn test_rename_npc() {
        let store = test_store();
        let start = origin(&store);
        let user = store.create_user("Alice", "password1").unwrap();
        let player = store.create_character(user.id, "Alicia").unwrap();
        let npc = store.create_npc("Guard", start.id).unwrap();

        assert_eq!(store.rename_npc(npc.id, "warden").unwrap().name, "Warden");
        assert!(store.character_by_name("guard").is_none());
        assert!(matches!(
            store.rename_npc(npc.id, "Alicia"),
            Err(WorldError::NameTaken(_))
        ));
        assert!(matches!(
            store.rename_npc(player.id, "Someone"),
            Err(WorldError::NotAnNpc)
        ));
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let store = Arc::new(test_store());
        let user = store.register_user("alice", "correct horse").await.unwrap();
        assert_eq!(user.name, "Alice");

        assert!(store.authenticate(user.id, "correct horse").await.unwrap());
        assert!(!store.authenticate(user.id, "wrong").await.unwrap());
        assert!(matches!(
            store.authenticate(UserId::new(), "wrong").await,
            Err(WorldError::UserNotFound(_))
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_authenticate_leaves_runtime_responsive() {
        let store = Arc::new(WorldStore::new(Arc::new(EventBus::default())));
        let user = store.create_user("Alice", "correct horse").unwrap();

        let check = tokio::spawn({
            let store = store.clone();
            async move { store.authenticate(user.id, "correct horse").await }
        });
        // A full cost bcrypt check takes far longer than a few short sleeps
        let mut ticks = 0;
        while !check.is_finished() {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            ticks += 1;
        }
        assert!(ticks >= 3, "runtime stalled during password check");
        assert!(check.await.unwrap().unwrap());
    }

    fn direction_strategy() -> impl Strategy<Value = Direction> {
        (0..Direction::ALL.len()).prop_map(|i| Direction::ALL[i])
    }

    proptest! {
        #[test]
        fn retracing_a_built_path_returns_home(
            path in proptest::collection::vec(direction_strategy(), 1..12)
        ) {
            let store = WorldStore::new(Arc::new(EventBus::default()));
            let start = store.bootstrap("Default").unwrap();
            let npc = store.create_npc("Walker", start).unwrap();

            for dir in &path {
                let here = store.character(npc.id).unwrap().room_id;
                store.build_room(here, *dir).unwrap();
                store.move_character(npc.id, *dir).unwrap();
            }
            for dir in path.iter().rev() {
                store.move_character(npc.id, dir.opposite()).unwrap();
            }
            prop_assert_eq!(store.character(npc.id).unwrap().room_id, start);
        }
    }
}
