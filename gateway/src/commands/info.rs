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

//! Status, terminal and preference commands

use super::{CommandContext, CommandRegistry};
use crate::telnet::protocol::ansi::Color;
use mudhall_common::ColorMode;

/// Largest frame `/ws` will draw
const MAX_FRAME: (u16, u16) = (250, 100);

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(&["quit"], quit);
    registry.register(&["loc", "location"], location);
    registry.register(&["roomid"], room_id);
    registry.register(&["time"], time);
    registry.register(&["ws"], window_size);
    registry.register(&["tt"], terminal_type);
    registry.register(&["silent"], silent);
    registry.register(&["colormode", "cm"], color_mode);
    registry.register(&["colors"], colors);
    registry.register(&["cash"], cash);
}

fn quit(ctx: &mut CommandContext<'_>, _args: &[&str]) {
    ctx.quit();
}

fn location(ctx: &mut CommandContext<'_>, _args: &[&str]) {
    let Some(room) = ctx.room() else {
        ctx.error("You are nowhere.");
        return;
    };
    let zone = ctx
        .store
        .zone(room.zone_id)
        .map(|z| z.name)
        .unwrap_or_default();
    let mut text = format!("{} {} - {}", room.location, zone, room.title);
    if let Some(area) = room.area_id.and_then(|id| ctx.store.area(id)) {
        text.push_str(&format!(" ({})", area.name));
    }
    ctx.line(text);
}

fn room_id(ctx: &mut CommandContext<'_>, _args: &[&str]) {
    if let Some(room) = ctx.room() {
        ctx.line(room.id.to_string());
    }
}

fn time(ctx: &mut CommandContext<'_>, _args: &[&str]) {
    let now = mudhall_server::clock::game_time();
    ctx.line(format!("It is {}.", now.format("%H:%M")));
}

/// Draw a box the size of the client's window
fn window_size(ctx: &mut CommandContext<'_>, _args: &[&str]) {
    let Some(user) = ctx.user() else {
        return;
    };
    let (width, height) = user.window_size;
    let width = usize::from(width.clamp(2, MAX_FRAME.0));
    let height = usize::from(height.clamp(3, MAX_FRAME.1));

    let edge = format!("+{}+", "-".repeat(width - 2));
    let label = format!("{}x{}", user.window_size.0, user.window_size.1);
    ctx.line(edge.clone());
    // Leave the last row for the prompt
    for row in 0..height - 3 {
        let inner = if row == 0 {
            format!("{:<1$}", label, width - 2)
        } else {
            " ".repeat(width - 2)
        };
        let inner: String = inner.chars().take(width - 2).collect();
        ctx.line(format!("|{}|", inner));
    }
    ctx.line(edge);
}

fn terminal_type(ctx: &mut CommandContext<'_>, _args: &[&str]) {
    let terminal = ctx
        .user()
        .and_then(|u| u.terminal_type)
        .unwrap_or_else(|| "unknown".to_string());
    ctx.line(format!("Terminal type: {}", terminal));
}

fn silent(ctx: &mut CommandContext<'_>, args: &[&str]) {
    match args.first().map(|a| a.to_lowercase()).as_deref() {
        Some("on") => {
            ctx.play.silent = true;
            ctx.line("Silent mode on.");
        }
        Some("off") => {
            ctx.play.silent = false;
            ctx.line("Silent mode off.");
        }
        None => {
            let state = if ctx.play.silent { "on" } else { "off" };
            ctx.line(format!("Silent mode is {}.", state));
        }
        Some(_) => ctx.error("Usage: /silent on|off"),
    }
}

fn color_mode(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(arg) = args.first() else {
        let mode = ctx.color_mode();
        ctx.line(format!("Color mode: {}", mode));
        return;
    };
    let mode = match arg.parse::<ColorMode>() {
        Ok(mode) => mode,
        Err(message) => {
            ctx.error(message);
            return;
        }
    };
    match ctx.store.set_color_mode(ctx.user_id, mode) {
        Ok(()) => ctx.line(format!("Color mode set to {}", mode)),
        Err(e) => ctx.error(e.to_string()),
    }
}

fn colors(ctx: &mut CommandContext<'_>, _args: &[&str]) {
    if ctx.color_mode() == ColorMode::None {
        ctx.line("Colors are off. Use /colormode light or /colormode dark.");
    }
    for color in Color::ALL {
        let sample = ctx.paint(color, &color.to_string());
        ctx.line(sample);
    }
}

fn cash(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let result = match args {
        [] => ctx.character().map(|c| Ok(c.cash)),
        ["give", amount] => match amount.parse::<i64>() {
            Ok(amount) if amount > 0 => Some(ctx.store.add_cash(ctx.character_id, amount)),
            Ok(_) => {
                ctx.error("The amount must be positive");
                return;
            }
            Err(_) => {
                ctx.error(format!("Not an amount: {}", amount));
                return;
            }
        },
        _ => {
            ctx.error("Usage: /cash [give <amount>]");
            return;
        }
    };
    match result {
        Some(Ok(balance)) => ctx.line(format!("You have {} cash.", balance)),
        Some(Err(e)) => ctx.error(e.to_string()),
        None => {}
    }
}
