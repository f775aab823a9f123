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

//! Talking to other players

use super::{CommandContext, CommandRegistry, rest};
use crate::presence::GameMessage;
use mudhall_common::CharacterId;

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(&["who"], who);
    registry.register(&["say", "s"], say);
    registry.register(&["me"], emote);
    registry.register(&["broadcast", "b"], broadcast);
    registry.register(&["whisper", "w", "tell"], whisper);
    registry.register(&["reply", "r"], reply);
}

fn speaker(ctx: &CommandContext<'_>) -> String {
    ctx.character().map(|c| c.name).unwrap_or_default()
}

fn who(ctx: &mut CommandContext<'_>, _args: &[&str]) {
    let players = ctx.store.online_players();
    ctx.line(format!("Players online: {}", players.len()));
    for player in players {
        ctx.line(format!("  {}", player.name));
    }
}

fn say(ctx: &mut CommandContext<'_>, args: &[&str]) {
    say_text(ctx, &rest(args));
}

/// Say `text` to everyone in the room
pub(super) fn say_text(ctx: &mut CommandContext<'_>, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        ctx.error("Say what?");
        return;
    }
    let Some(room) = ctx.room() else {
        return;
    };
    let notice = format!("{} says, \"{}\"", speaker(ctx), text);
    ctx.presence
        .notify_room(ctx.store, room.id, Some(ctx.character_id), &notice);
    ctx.line(format!("You say, \"{}\"", text));
}

fn emote(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let text = rest(args);
    if text.is_empty() {
        ctx.error("Do what?");
        return;
    }
    let Some(room) = ctx.room() else {
        return;
    };
    let notice = format!("{} {}", speaker(ctx), text);
    ctx.presence
        .notify_room(ctx.store, room.id, Some(ctx.character_id), &notice);
    ctx.line(notice);
}

fn broadcast(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let text = rest(args);
    if text.is_empty() {
        ctx.error("Broadcast what?");
        return;
    }
    let notice = format!("{} broadcasts, \"{}\"", speaker(ctx), text);
    ctx.presence.broadcast(Some(ctx.character_id), &notice);
    ctx.line(format!("You broadcast, \"{}\"", text));
}

fn whisper(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let [name, text @ ..] = args else {
        ctx.error("Usage: /whisper <name> <message>");
        return;
    };
    let target = ctx
        .store
        .character_by_name(name)
        .filter(|c| !c.is_npc() && ctx.presence.is_in_game(c.id));
    let Some(target) = target else {
        ctx.error(format!("{} is not here", name));
        return;
    };
    if target.id == ctx.character_id {
        ctx.error("You mutter to yourself.");
        return;
    }
    tell(ctx, target.id, &target.name, &rest(text));
}

fn reply(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(target) = ctx.play.reply_to else {
        ctx.error("No one to reply to");
        return;
    };
    let name = ctx
        .store
        .character(target)
        .map(|c| c.name)
        .unwrap_or_else(|| "They".to_string());
    tell(ctx, target, &name, &rest(args));
}

fn tell(ctx: &mut CommandContext<'_>, target: CharacterId, name: &str, text: &str) {
    if text.is_empty() {
        ctx.error("Tell them what?");
        return;
    }
    let message = GameMessage::Tell {
        from: ctx.character_id,
        text: text.to_string(),
    };
    if ctx.presence.send(target, message) {
        ctx.line(format!("You tell {}, \"{}\"", name, text));
    } else {
        ctx.error(format!("{} is not here", name));
    }
}
