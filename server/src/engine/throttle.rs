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

//! Fixed period loop pacing

use std::time::Duration;
use tokio::time::Instant;

/// Paces a loop so that consecutive iterations start at least one period
/// apart. An iteration that overruns the period is not made up for: the next
/// one starts immediately and the schedule is re-based on the current time.
#[derive(Debug)]
pub struct Throttle {
    period: Duration,
    last: Instant,
}

impl Throttle {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last: Instant::now(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait until one period has passed since the previous sync
    pub async fn sync(&mut self) {
        let target = self.last + self.period;
        let now = Instant::now();
        if target > now {
            tokio::time::sleep_until(target).await;
            self.last = target;
        } else {
            self.last = now;
        }
    }
}
