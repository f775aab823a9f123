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

//! Autonomous entity engine
//!
//! Runs one behavior task per NPC. Tasks are started for every NPC present
//! when the engine starts and for every NPC created afterwards, and are
//! stopped when the NPC is deleted. When the engine's event queue overflows
//! the task table is rebuilt from the store.

mod behavior;
mod throttle;

pub use behavior::{Behavior, Tick};
pub use throttle::Throttle;

use crate::events::{EntityKind, Event, EventKind};
use crate::store::WorldStore;
use mudhall_common::CharacterId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default behavior tick period
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Supervises NPC behavior tasks
pub struct NpcEngine {
    store: Arc<WorldStore>,
    period: Duration,
    tasks: Mutex<HashMap<CharacterId, JoinHandle<()>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl NpcEngine {
    pub fn new(store: Arc<WorldStore>, period: Duration) -> Arc<Self> {
        Arc::new(Self {
            store,
            period,
            tasks: Mutex::new(HashMap::new()),
            listener: Mutex::new(None),
        })
    }

    /// Start managing NPCs.
    ///
    /// Registers on the event bus before enumerating existing NPCs so an NPC
    /// created in between is seen at least once; duplicate starts are ignored.
    pub fn start(self: &Arc<Self>) {
        let mut subscriber = self.store.bus().register();

        let npcs = self.store.npcs();
        tracing::info!("Starting behavior for {} NPCs", npcs.len());
        for npc in npcs {
            self.manage(npc.id);
        }

        let engine: Weak<Self> = Arc::downgrade(self);
        let listener = tokio::spawn(async move {
            while let Some(event) = subscriber.recv().await {
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                engine.handle_event(event);
                let missed = subscriber.take_missed();
                if missed > 0 {
                    tracing::warn!("NPC engine missed {} events, reconciling", missed);
                    engine.reconcile();
                }
            }
            tracing::debug!("NPC engine listener stopped");
        });

        if let Some(previous) = self.listener.lock().replace(listener) {
            previous.abort();
        }
    }

    fn handle_event(&self, event: Event) {
        if event.entity != EntityKind::Npc {
            return;
        }
        let id = CharacterId::from_uuid(event.id);
        match event.kind {
            EventKind::Create => self.manage(id),
            EventKind::Delete => self.release(id),
            EventKind::Update => {}
        }
    }

    /// Start a behavior task for `id` unless one is already running
    fn manage(&self, id: CharacterId) {
        let mut tasks = self.tasks.lock();
        if tasks.get(&id).is_some_and(|task| !task.is_finished()) {
            return;
        }
        let behavior = Behavior::new(self.store.clone(), id, self.period);
        tasks.insert(id, tokio::spawn(behavior.run()));
    }

    /// Match the task table to the NPCs currently in the store
    fn reconcile(&self) {
        let npcs: HashSet<CharacterId> = self.store.npcs().into_iter().map(|npc| npc.id).collect();
        self.tasks.lock().retain(|id, task| {
            let keep = npcs.contains(id);
            if !keep {
                task.abort();
            }
            keep
        });
        for id in npcs {
            self.manage(id);
        }
    }

    fn release(&self, id: CharacterId) {
        if let Some(task) = self.tasks.lock().remove(&id) {
            task.abort();
            tracing::debug!(npc = %id, "Stopped behavior task");
        }
    }

    /// Number of behavior tasks still running
    pub fn task_count(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.retain(|_, task| !task.is_finished());
        tasks.len()
    }

    /// Whether a live behavior task exists for `id`
    pub fn is_managed(&self, id: CharacterId) -> bool {
        self.tasks
            .lock()
            .get(&id)
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the listener and every behavior task
    pub fn shutdown(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}

impl Drop for NpcEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
