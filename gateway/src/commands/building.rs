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

//! World building: rooms, zones, areas, items and room properties

use super::actions::{announce_move, look};
use super::{CommandContext, CommandRegistry, rest};
use mudhall_common::{Coordinate, Direction, Room, ZoneId};

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(&["teleport", "tel"], teleport);
    registry.register(&["zone"], zone);
    registry.register(&["destroyroom", "dr"], destroy_room);
    registry.register(&["create"], create_item);
    registry.register(&["destroyitem"], destroy_item);
    registry.register(&["prop"], properties);
    registry.register(&["setprop"], set_property);
    registry.register(&["delprop"], delete_property);
    registry.register(&["area"], area);
}

/// Open an exit, building the room behind it if needed, and step through
pub(super) fn quick_room(ctx: &mut CommandContext<'_>, direction: Direction) {
    let Some(character) = ctx.character() else {
        return;
    };
    let built = ctx
        .store
        .build_room(character.room_id, direction)
        .and_then(|_| ctx.store.move_character(ctx.character_id, direction));
    match built {
        Ok(destination) => {
            announce_move(ctx, &character.name, character.room_id, destination, Some(direction));
            look(ctx);
        }
        Err(e) => ctx.error(e.to_string()),
    }
}

fn teleport(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(character) = ctx.character() else {
        return;
    };
    let Some(room) = ctx.room() else {
        return;
    };
    if args.is_empty() {
        ctx.error("Usage: /teleport <zone> | <x> <y> <z>");
        return;
    }
    let coordinates = match args {
        [x, y, z] => match (x.parse(), y.parse(), z.parse()) {
            (Ok(x), Ok(y), Ok(z)) => Some(Coordinate::new(x, y, z)),
            _ => None,
        },
        _ => None,
    };
    let (zone_id, location) = match coordinates {
        Some(location) => (room.zone_id, location),
        None => {
            let name = rest(args);
            let Some(zone) = ctx.store.zone_by_name(&name) else {
                ctx.error(format!("No zone named '{}'", name));
                return;
            };
            (zone.id, zone_entry(ctx, zone.id))
        }
    };

    match ctx
        .store
        .move_to_location(ctx.character_id, zone_id, location)
    {
        Ok(destination) => {
            tracing::debug!(character = %character.name, room = %destination, "Teleported");
            announce_move(ctx, &character.name, room.id, destination, None);
            look(ctx);
        }
        Err(e) => ctx.error(e.to_string()),
    }
}

/// Where teleporting into a zone lands
fn zone_entry(ctx: &CommandContext<'_>, zone_id: ZoneId) -> Coordinate {
    ctx.store
        .rooms_in_zone(zone_id)
        .first()
        .map(|room| room.location)
        .unwrap_or_default()
}

fn zone(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(room) = ctx.room() else {
        return;
    };
    match args {
        [] | ["list"] => {
            for zone in ctx.store.zones() {
                let marker = if zone.id == room.zone_id { "*" } else { " " };
                ctx.line(format!("{} {}", marker, zone.name));
            }
        }
        ["new", name @ ..] if !name.is_empty() => match ctx.store.create_zone(&rest(name)) {
            Ok(zone) => {
                tracing::info!(zone = %zone.name, "Zone created");
                ctx.line(format!("Created zone {}", zone.name));
            }
            Err(e) => ctx.error(e.to_string()),
        },
        ["rename", name @ ..] if !name.is_empty() => {
            let name = rest(name);
            match ctx.store.rename_zone(room.zone_id, &name) {
                Ok(()) => ctx.line(format!("Zone renamed to {}", name)),
                Err(e) => ctx.error(e.to_string()),
            }
        }
        _ => ctx.error("Usage: /zone [list | new <name> | rename <name>]"),
    }
}

fn destroy_room(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(direction) = args.first().and_then(|a| Direction::parse(a)) else {
        ctx.error("Usage: /destroyroom <direction>");
        return;
    };
    let Some(room) = ctx.room() else {
        return;
    };
    match ctx.store.destroy_room(room.id, direction) {
        Ok(victim) => {
            tracing::info!(room = %victim, "Room destroyed");
            ctx.line(format!(
                "Destroyed the room to the {}",
                direction.to_string().to_lowercase()
            ));
        }
        Err(e) => ctx.error(e.to_string()),
    }
}

fn create_item(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(room) = ctx.room() else {
        return;
    };
    match ctx.store.create_item(room.id, &rest(args)) {
        Ok(item) => ctx.line(format!("Created {}", item.name)),
        Err(e) => ctx.error(e.to_string()),
    }
}

fn destroy_item(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(room) = ctx.room() else {
        return;
    };
    match ctx.store.destroy_item(room.id, &rest(args)) {
        Ok(item) => ctx.line(format!("Destroyed {}", item.name)),
        Err(e) => ctx.error(e.to_string()),
    }
}

fn properties(ctx: &mut CommandContext<'_>, _args: &[&str]) {
    let Some(room) = ctx.room() else {
        return;
    };
    if room.properties.is_empty() {
        ctx.line("No properties");
    }
    for (key, value) in &room.properties {
        ctx.line(format!("{} = {}", key, value));
    }
}

fn set_property(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let [key, value @ ..] = args else {
        ctx.error("Usage: /setprop <key> <value>");
        return;
    };
    let Some(room) = ctx.room() else {
        return;
    };
    let value = rest(value);
    match ctx.store.set_room_property(room.id, key, &value) {
        Ok(()) => ctx.line(format!("{} = {}", key, value)),
        Err(e) => ctx.error(e.to_string()),
    }
}

fn delete_property(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(key) = args.first() else {
        ctx.error("Usage: /delprop <key>");
        return;
    };
    let Some(room) = ctx.room() else {
        return;
    };
    match ctx.store.remove_room_property(room.id, key) {
        Ok(true) => ctx.line(format!("Removed {}", key)),
        Ok(false) => ctx.error(format!("No property named '{}'", key)),
        Err(e) => ctx.error(e.to_string()),
    }
}

fn area(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(room) = ctx.room() else {
        return;
    };
    match args {
        [] | ["list"] => {
            let areas = ctx.store.areas_in(room.zone_id);
            if areas.is_empty() {
                ctx.line("No areas");
            }
            for area in areas {
                let marker = if Some(area.id) == room.area_id { "*" } else { " " };
                ctx.line(format!("{} {}", marker, area.name));
            }
        }
        ["new", name @ ..] if !name.is_empty() => {
            match ctx.store.create_area(room.zone_id, &rest(name)) {
                Ok(area) => ctx.line(format!("Created area {}", area.name)),
                Err(e) => ctx.error(e.to_string()),
            }
        }
        ["set", name @ ..] if !name.is_empty() => {
            assign_area(ctx, &room, Some(rest(name).as_str()))
        }
        ["clear"] => assign_area(ctx, &room, None),
        _ => ctx.error("Usage: /area [list | new <name> | set <name> | clear]"),
    }
}

/// Put `room` into the named area of its zone, or into none
pub(super) fn assign_area(ctx: &mut CommandContext<'_>, room: &Room, name: Option<&str>) {
    let area = match name {
        Some(name) => match ctx.store.area_by_name(room.zone_id, name) {
            Some(area) => Some(area),
            None => {
                ctx.error(format!("No area named '{}'", name));
                return;
            }
        },
        None => None,
    };
    match ctx.store.set_room_area(room.id, area.as_ref().map(|a| a.id)) {
        Ok(()) => match area {
            Some(area) => ctx.line(format!("Room is now part of {}", area.name)),
            None => ctx.line("Room is no longer part of an area"),
        },
        Err(e) => ctx.error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::tests::Fixture;
    use mudhall_common::{Coordinate, Direction};

    #[test]
    fn test_teleport_to_coordinates_builds_room() {
        let mut fixture = Fixture::new();
        let zone_id = fixture.room().zone_id;
        fixture.run("/tel 3 4 -1");
        let room = fixture.room();
        assert_eq!(room.location, Coordinate::new(3, 4, -1));
        assert_eq!(room.zone_id, zone_id);
        assert_eq!(fixture.text("/tel 1 two 3"), "No zone named '1 two 3'");
        assert_eq!(fixture.text("/tel"), "Usage: /teleport <zone> | <x> <y> <z>");
    }

    #[test]
    fn test_teleport_to_zone() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.text("/zone new Elsewhere"), "Created zone Elsewhere");
        fixture.run("/tel elsewhere");
        let room = fixture.room();
        assert_eq!(fixture.store.zone(room.zone_id).unwrap().name, "Elsewhere");
        assert_eq!(room.location, Coordinate::default());
        assert_eq!(fixture.text("/tel Nowhere"), "No zone named 'Nowhere'");
    }

    #[test]
    fn test_zone_list_and_rename() {
        let mut fixture = Fixture::new();
        fixture.run("/zone new Beyond");
        assert_eq!(fixture.text("/zone list"), "  Beyond\n* Default");
        assert_eq!(fixture.text("/zone rename Home"), "Zone renamed to Home");
        assert_eq!(fixture.text("/zone rename Beyond"), "That name is unavailable");
    }

    #[test]
    fn test_destroy_room() {
        let mut fixture = Fixture::new();
        let start = fixture.room().id;
        fixture.store.build_room(start, Direction::West).unwrap();

        assert_eq!(fixture.text("/dr w"), "Destroyed the room to the west");
        assert!(!fixture.store.room(start).unwrap().has_exit(Direction::West));
        assert_eq!(fixture.text("/dr w"), "There is no room to the West");
        assert_eq!(fixture.text("/dr"), "Usage: /destroyroom <direction>");
    }

    #[test]
    fn test_items() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.text("/create rusty sword"), "Created rusty sword");
        assert!(fixture.text("look").contains("You see: rusty sword"));
        assert_eq!(fixture.text("/destroyitem Rusty Sword"), "Destroyed rusty sword");
        assert_eq!(fixture.text("/destroyitem sword"), "No item named 'sword'");
    }

    #[test]
    fn test_properties() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.text("/prop"), "No properties");
        assert_eq!(fixture.text("/setprop smell damp earth"), "smell = damp earth");
        assert_eq!(fixture.text("/prop"), "smell = damp earth");
        assert_eq!(fixture.text("/delprop smell"), "Removed smell");
        assert_eq!(fixture.text("/delprop smell"), "No property named 'smell'");
    }

    #[test]
    fn test_areas() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.text("/area"), "No areas");
        assert_eq!(fixture.text("/area new Old Town"), "Created area Old Town");
        assert_eq!(fixture.text("/area set old town"), "Room is now part of Old Town");
        assert_eq!(fixture.text("/area list"), "* Old Town");
        assert_eq!(fixture.text("/loc"), "(0, 0, 0) Default - The Void (Old Town)");
        fixture.run("/area clear");
        assert_eq!(fixture.room().area_id, None);
    }
}
