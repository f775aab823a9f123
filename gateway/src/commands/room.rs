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

//! Room editing and the zone map

use super::building::assign_area;
use super::{CommandContext, CommandRegistry, rest};
use mudhall_common::{Coordinate, Direction, Room};

const ROOM_USAGE: &str =
    "Usage: /room [title <text> | desc <text> | exit [<direction>] | area <name>|none]";

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(&["room"], room);
    registry.register(&["map"], map);
}

fn room(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(room) = ctx.room() else {
        return;
    };
    match args {
        ["title", title @ ..] if !title.is_empty() => {
            let title = rest(title);
            match ctx.store.set_room_title(room.id, &title) {
                Ok(()) => ctx.line(format!("Title set to {}", title.trim())),
                Err(e) => ctx.error(e.to_string()),
            }
        }
        ["desc" | "description", text @ ..] if !text.is_empty() => {
            match ctx.store.set_room_description(room.id, &rest(text)) {
                Ok(()) => ctx.line("Description updated"),
                Err(e) => ctx.error(e.to_string()),
            }
        }
        ["exit" | "exits"] => {
            for direction in Direction::ALL {
                let state = if room.has_exit(direction) { "On" } else { "Off" };
                ctx.line(format!("{}: {}", direction, state));
            }
        }
        ["exit" | "exits", name] => {
            let Some(direction) = Direction::parse(name) else {
                ctx.error(format!("Not a direction: {}", name));
                return;
            };
            match ctx.store.toggle_exit(room.id, direction) {
                Ok(open) => {
                    let state = if open { "open" } else { "closed" };
                    let direction = direction.to_string().to_lowercase();
                    ctx.line(format!("The {} exit is now {}", direction, state));
                }
                Err(e) => ctx.error(e.to_string()),
            }
        }
        ["area", "none"] => assign_area(ctx, &room, None),
        ["area", name @ ..] if !name.is_empty() => {
            assign_area(ctx, &room, Some(rest(name).as_str()))
        }
        _ => ctx.error(ROOM_USAGE),
    }
}

/// Rectangle of one level of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

impl Bounds {
    /// Rooms around `center` that fit a terminal of the given size
    fn around(center: Coordinate, (width, height): (u16, u16)) -> Self {
        // Every room takes two cells in each direction, and one row is the prompt
        let reach_x = ((i32::from(width) - 1) / 4).max(1);
        let reach_y = ((i32::from(height) - 2) / 4).max(1);
        Self {
            min_x: center.x - reach_x,
            min_y: center.y - reach_y,
            max_x: center.x + reach_x,
            max_y: center.y + reach_y,
        }
    }

    /// Smallest rectangle holding every room
    fn enclosing<'a>(rooms: impl IntoIterator<Item = &'a Room>) -> Option<Self> {
        rooms.into_iter().fold(None, |bounds, room| {
            let Coordinate { x, y, .. } = room.location;
            Some(match bounds {
                None => Self {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(b) => Self {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            })
        })
    }

    fn contains(&self, location: Coordinate) -> bool {
        (self.min_x..=self.max_x).contains(&location.x)
            && (self.min_y..=self.max_y).contains(&location.y)
    }
}

fn map(ctx: &mut CommandContext<'_>, args: &[&str]) {
    let Some(here) = ctx.room() else {
        return;
    };
    let level: Vec<Room> = ctx
        .store
        .rooms_in_zone(here.zone_id)
        .into_iter()
        .filter(|room| room.location.z == here.location.z)
        .collect();
    let bounds = match args {
        [] => {
            let window = ctx.user().map(|u| u.window_size).unwrap_or((80, 24));
            Bounds::around(here.location, window)
        }
        ["all"] => match Bounds::enclosing(&level) {
            Some(bounds) => bounds,
            None => return,
        },
        _ => {
            ctx.error("Usage: /map [all]");
            return;
        }
    };
    for line in draw_map(&level, &here, bounds) {
        ctx.line(line);
    }
}

/// Draw one level. Rooms sit on even cells as `#` (or `@` for `here`), and
/// exits are drawn on the cells between them.
fn draw_map(rooms: &[Room], here: &Room, bounds: Bounds) -> Vec<String> {
    let columns = (bounds.max_x - bounds.min_x) as usize * 2 + 1;
    let rows = (bounds.max_y - bounds.min_y) as usize * 2 + 1;
    let mut grid = vec![vec![' '; columns]; rows];

    for room in rooms.iter().filter(|r| bounds.contains(r.location)) {
        let column = (room.location.x - bounds.min_x) as usize * 2;
        let row = (room.location.y - bounds.min_y) as usize * 2;
        grid[row][column] = if room.id == here.id { '@' } else { '#' };

        for direction in &room.exits {
            let glyph = match direction.offset() {
                (_, _, dz) if dz != 0 => continue,
                (0, _, _) => '|',
                (_, 0, _) => '-',
                (dx, dy, _) if dx == -dy => '/',
                _ => '\\',
            };
            let (dx, dy, _) = direction.offset();
            let (Some(c), Some(r)) = (
                column.checked_add_signed(dx as isize),
                row.checked_add_signed(dy as isize),
            ) else {
                continue;
            };
            let Some(cell) = grid.get_mut(r).and_then(|line| line.get_mut(c)) else {
                continue;
            };
            *cell = match (*cell, glyph) {
                ('/', '\\') | ('\\', '/') | ('X', _) => 'X',
                _ => glyph,
            };
        }
    }

    let mut lines: Vec<String> = grid
        .into_iter()
        .map(|line| line.into_iter().collect::<String>().trim_end().to_string())
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    let blank = lines.iter().take_while(|line| line.is_empty()).count();
    lines.split_off(blank)
}
