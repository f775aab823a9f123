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

//! Plain (non-slash) input: movement, looking around, talking

use super::CommandContext;
use crate::telnet::protocol::ansi::Color;
use mudhall_common::{CharacterKind, Direction, RoomId};

/// Handle a line that is not a slash command
pub fn perform(ctx: &mut CommandContext<'_>, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if let Some(direction) = Direction::parse(line) {
        walk(ctx, direction);
        return;
    }
    match line.to_lowercase().as_str() {
        "l" | "look" => look(ctx),
        "i" | "inventory" => inventory(ctx),
        _ => super::chat::say_text(ctx, line),
    }
}

fn walk(ctx: &mut CommandContext<'_>, direction: Direction) {
    let Some(character) = ctx.character() else {
        return;
    };
    match ctx.store.move_character(ctx.character_id, direction) {
        Ok(destination) => {
            announce_move(ctx, &character.name, character.room_id, destination, Some(direction));
            look(ctx);
        }
        Err(e) => ctx.error(e.to_string()),
    }
}

/// Tell the rooms on both sides of a move about it
pub(super) fn announce_move(
    ctx: &CommandContext<'_>,
    name: &str,
    from: RoomId,
    to: RoomId,
    direction: Option<Direction>,
) {
    let departure = match direction {
        Some(direction) => format!("{} leaves {}.", name, direction.to_string().to_lowercase()),
        None => format!("{} vanishes.", name),
    };
    let arrival = match direction {
        Some(direction) => format!(
            "{} arrives from the {}.",
            name,
            direction.opposite().to_string().to_lowercase()
        ),
        None => format!("{} appears.", name),
    };
    let me = Some(ctx.character_id);
    ctx.presence.notify_room(ctx.store, from, me, &departure);
    ctx.presence.notify_room(ctx.store, to, me, &arrival);
}

/// Describe the current room
pub fn look(ctx: &mut CommandContext<'_>) {
    let Some(room) = ctx.room() else {
        ctx.error("You are nowhere.");
        return;
    };

    let title = ctx.paint(Color::White, &room.title);
    ctx.line(title);
    ctx.line(room.description.clone());
    let exits = ctx.paint(Color::Green, &format!("Exits: {}", room.exit_list()));
    ctx.line(exits);

    let items: Vec<String> = ctx.store.items_in(room.id).into_iter().map(|i| i.name).collect();
    if !items.is_empty() {
        let line = ctx.paint(Color::Yellow, &format!("You see: {}", items.join(", ")));
        ctx.line(line);
    }

    for other in ctx.store.characters_in(room.id) {
        if other.id == ctx.character_id {
            continue;
        }
        let line = match &other.kind {
            CharacterKind::Npc { conversation, .. } if !conversation.is_empty() => {
                format!("{} is here, saying \"{}\"", other.name, conversation)
            }
            _ => format!("{} is here.", other.name),
        };
        let line = ctx.paint(Color::Cyan, &line);
        ctx.line(line);
    }
}

fn inventory(ctx: &mut CommandContext<'_>) {
    if let Some(character) = ctx.character() {
        ctx.line(format!("You have {} cash.", character.cash));
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::tests::Fixture;
    use crate::presence::GameMessage;
    use mudhall_common::Direction;

    #[test]
    fn test_look_describes_room() {
        let mut fixture = Fixture::new();
        let text = fixture.text("look");
        assert!(text.starts_with("The Void"));
        assert!(text.contains("Exits: []"));
    }

    #[test]
    fn test_walk_requires_exit() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.text("north"), "You can't go that way");

        let start = fixture.room().id;
        let north = fixture.store.build_room(start, Direction::North).unwrap();
        fixture.run("n");
        assert_eq!(fixture.room().id, north);
    }

    #[tokio::test]
    async fn test_walk_is_announced() {
        let mut fixture = Fixture::new();
        let start = fixture.room().id;
        fixture.store.build_room(start, Direction::East).unwrap();
        let watcher = fixture.other_player("Watcher");
        let mut inbox = fixture.presence.enter(watcher);

        fixture.run("e");
        assert_eq!(
            inbox.recv().await,
            Some(GameMessage::Notice("Hero leaves east.".to_string()))
        );
    }

    #[test]
    fn test_inventory_shows_cash() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.text("i"), "You have 0 cash.");
    }

    #[test]
    fn test_other_text_is_said() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.text("hello there"), "You say, \"hello there\"");
    }
}
