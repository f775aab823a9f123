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

//! NPC administration

use super::{CommandContext, CommandRegistry, rest};
use mudhall_common::Character;

const USAGE: &str =
    "Usage: /npc [list | new <name> | rename <name> <new name> | roam <name> | delete <name> | say <name> <text>]";

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(&["npc"], npc);
}

fn npc(ctx: &mut CommandContext<'_>, args: &[&str]) {
    match args {
        [] | ["list"] => list(ctx),
        ["new", name] => create(ctx, name),
        ["rename", name, new_name] => {
            let Some(npc) = find(ctx, name) else {
                return;
            };
            match ctx.store.rename_npc(npc.id, new_name) {
                Ok(renamed) => {
                    tracing::info!(npc = %renamed.name, previous = %npc.name, "NPC renamed");
                    ctx.line(format!("{} is now known as {}", npc.name, renamed.name));
                }
                Err(e) => ctx.error(e.to_string()),
            }
        }
        ["roam", name] => {
            let Some(npc) = find(ctx, name) else {
                return;
            };
            let roaming = !npc.is_roaming();
            match ctx.store.set_npc_roaming(npc.id, roaming) {
                Ok(()) if roaming => ctx.line(format!("{} starts to wander", npc.name)),
                Ok(()) => ctx.line(format!("{} stays put", npc.name)),
                Err(e) => ctx.error(e.to_string()),
            }
        }
        ["delete", name] => {
            let Some(npc) = find(ctx, name) else {
                return;
            };
            match ctx.store.delete_character(npc.id) {
                Ok(npc) => {
                    tracing::info!(npc = %npc.name, "NPC deleted");
                    ctx.line(format!("Deleted {}", npc.name));
                }
                Err(e) => ctx.error(e.to_string()),
            }
        }
        ["say", name, text @ ..] => {
            let Some(npc) = find(ctx, name) else {
                return;
            };
            let text = rest(text);
            match ctx.store.set_npc_conversation(npc.id, &text) {
                Ok(()) if text.is_empty() => ctx.line(format!("{} falls silent", npc.name)),
                Ok(()) => ctx.line(format!("{} will say \"{}\"", npc.name, text)),
                Err(e) => ctx.error(e.to_string()),
            }
        }
        _ => ctx.error(USAGE),
    }
}

fn list(ctx: &mut CommandContext<'_>) {
    let npcs = ctx.store.npcs();
    if npcs.is_empty() {
        ctx.line("No NPCs");
    }
    for npc in npcs {
        let location = ctx
            .store
            .room(npc.room_id)
            .map(|room| room.location.to_string())
            .unwrap_or_else(|| "nowhere".to_string());
        let roaming = if npc.is_roaming() { " (roaming)" } else { "" };
        ctx.line(format!("{} at {}{}", npc.name, location, roaming));
    }
}

fn create(ctx: &mut CommandContext<'_>, name: &str) {
    let Some(room) = ctx.room() else {
        return;
    };
    match ctx.store.create_npc(name, room.id) {
        Ok(npc) => {
            tracing::info!(npc = %npc.name, room = %room.id, "NPC created");
            let arrival = format!("{} appears.", npc.name);
            ctx.presence
                .notify_room(ctx.store, room.id, Some(ctx.character_id), &arrival);
            ctx.line(format!("Created {}", npc.name));
        }
        Err(e) => ctx.error(e.to_string()),
    }
}

fn find(ctx: &mut CommandContext<'_>, name: &str) -> Option<Character> {
    let npc = ctx.store.character_by_name(name).filter(Character::is_npc);
    if npc.is_none() {
        ctx.error(format!("No NPC named '{}'", name));
    }
    npc
}
