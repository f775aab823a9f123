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

//! Spatial types: zones, areas, rooms, items and the direction grid

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

crate::entity_id! {
    /// Unique identifier of a zone
    ZoneId
}

crate::entity_id! {
    /// Unique identifier of an area within a zone
    AreaId
}

crate::entity_id! {
    /// Unique identifier of a room
    RoomId
}

crate::entity_id! {
    /// Unique identifier of an item
    ItemId
}

/// Integer grid position of a room inside its zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinate {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring coordinate one step in `direction`
    pub fn next(&self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Exit directions. North is negative y, up is positive z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 10] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::Up,
        Direction::Down,
    ];

    /// Parse a short (`ne`) or long (`northeast`, `north east`) direction name
    pub fn parse(text: &str) -> Option<Direction> {
        let normalized: String = text
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect();
        match normalized.as_str() {
            "n" | "north" => Some(Direction::North),
            "ne" | "northeast" => Some(Direction::NorthEast),
            "e" | "east" => Some(Direction::East),
            "se" | "southeast" => Some(Direction::SouthEast),
            "s" | "south" => Some(Direction::South),
            "sw" | "southwest" => Some(Direction::SouthWest),
            "w" | "west" => Some(Direction::West),
            "nw" | "northwest" => Some(Direction::NorthWest),
            "u" | "up" => Some(Direction::Up),
            "d" | "down" => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::NorthEast => Direction::SouthWest,
            Direction::East => Direction::West,
            Direction::SouthEast => Direction::NorthWest,
            Direction::South => Direction::North,
            Direction::SouthWest => Direction::NorthEast,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::North => (0, -1, 0),
            Direction::NorthEast => (1, -1, 0),
            Direction::East => (1, 0, 0),
            Direction::SouthEast => (1, 1, 0),
            Direction::South => (0, 1, 0),
            Direction::SouthWest => (-1, 1, 0),
            Direction::West => (-1, 0, 0),
            Direction::NorthWest => (-1, -1, 0),
            Direction::Up => (0, 0, 1),
            Direction::Down => (0, 0, -1),
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            Direction::North => "n",
            Direction::NorthEast => "ne",
            Direction::East => "e",
            Direction::SouthEast => "se",
            Direction::South => "s",
            Direction::SouthWest => "sw",
            Direction::West => "w",
            Direction::NorthWest => "nw",
            Direction::Up => "u",
            Direction::Down => "d",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::North => "North",
            Direction::NorthEast => "North East",
            Direction::East => "East",
            Direction::SouthEast => "South East",
            Direction::South => "South",
            Direction::SouthWest => "South West",
            Direction::West => "West",
            Direction::NorthWest => "North West",
            Direction::Up => "Up",
            Direction::Down => "Down",
        };
        write!(f, "{}", name)
    }
}

/// A named region of rooms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
}

/// A named grouping of rooms inside one zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub zone_id: ZoneId,
    pub name: String,
}

/// A single location in the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub zone_id: ZoneId,
    pub location: Coordinate,
    pub title: String,
    pub description: String,
    pub exits: BTreeSet<Direction>,
    pub area_id: Option<AreaId>,
    pub properties: BTreeMap<String, String>,
    pub item_ids: Vec<ItemId>,
}

impl Room {
    pub fn new(zone_id: ZoneId, location: Coordinate) -> Self {
        Self {
            id: RoomId::new(),
            zone_id,
            location,
            title: "The Void".to_string(),
            description: "You are floating in the blackness of space. Complete darkness surrounds \
                you in all directions. There is no escape, there is no hope, just the emptiness."
                .to_string(),
            exits: BTreeSet::new(),
            area_id: None,
            properties: BTreeMap::new(),
            item_ids: Vec::new(),
        }
    }

    pub fn has_exit(&self, direction: Direction) -> bool {
        self.exits.contains(&direction)
    }

    /// Compact exit list, e.g. `[n, e, u]`
    pub fn exit_list(&self) -> String {
        let names: Vec<&str> = self.exits.iter().map(|d| d.abbreviation()).collect();
        format!("[{}]", names.join(", "))
    }
}

/// Something lying in a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("n"), Some(Direction::North));
        assert_eq!(Direction::parse("North East"), Some(Direction::NorthEast));
        assert_eq!(Direction::parse("SOUTHWEST"), Some(Direction::SouthWest));
        assert_eq!(Direction::parse(" d "), Some(Direction::Down));
        assert_eq!(Direction::parse("sideways"), None);
    }

    #[test]
    fn test_direction_opposite_round_trip() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            let (dx, dy, dz) = dir.offset();
            let (ox, oy, oz) = dir.opposite().offset();
            assert_eq!((dx + ox, dy + oy, dz + oz), (0, 0, 0));
        }
    }

    #[test]
    fn test_coordinate_next() {
        let origin = Coordinate::default();
        assert_eq!(origin.next(Direction::North), Coordinate::new(0, -1, 0));
        assert_eq!(origin.next(Direction::SouthEast), Coordinate::new(1, 1, 0));
        assert_eq!(origin.next(Direction::Up), Coordinate::new(0, 0, 1));
    }

    #[test]
    fn test_room_exit_list() {
        let mut room = Room::new(ZoneId::new(), Coordinate::default());
        assert_eq!(room.exit_list(), "[]");

        room.exits.insert(Direction::East);
        room.exits.insert(Direction::North);
        assert!(room.has_exit(Direction::North));
        assert_eq!(room.exit_list(), "[n, e]");
    }
}
