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

//! In-world time of day

use chrono::{NaiveTime, Timelike};

/// Game days pass this many times faster than real days
pub const TIME_MULTIPLIER: u32 = 3;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Game time of day for a given local wall clock time
pub fn game_time_at(real: NaiveTime) -> NaiveTime {
    let seconds = (real.num_seconds_from_midnight() * TIME_MULTIPLIER) % SECONDS_PER_DAY;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or(NaiveTime::MIN)
}

/// Current game time of day
pub fn game_time() -> NaiveTime {
    game_time_at(chrono::Local::now().time())
}
