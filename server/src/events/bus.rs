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

//! Event bus implementation

use super::types::Event;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Default per-subscriber queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Event bus fanning world events out to independent subscriber queues.
///
/// Publishing never waits. A subscriber whose queue is full misses that event
/// and nobody else is affected. Missed events are counted so the subscriber
/// can tell that it fell behind.
pub struct EventBus {
    subscribers: Mutex<Vec<Registration>>,
    capacity: usize,
}

struct Registration {
    sender: mpsc::Sender<Event>,
    missed: Arc<AtomicUsize>,
}

/// Receiving end of one registration
pub struct Subscriber {
    receiver: mpsc::Receiver<Event>,
    missed: Arc<AtomicUsize>,
}

impl EventBus {
    /// Create a new event bus whose subscriber queues hold `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber.
    ///
    /// The subscriber sees every event published after this call returns and
    /// none published before.
    pub fn register(&self) -> Subscriber {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let missed = Arc::new(AtomicUsize::new(0));
        self.subscribers.lock().push(Registration {
            sender,
            missed: missed.clone(),
        });
        Subscriber { receiver, missed }
    }

    /// Publish an event to every live subscriber, in registration order
    pub fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|registration| match registration.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                registration.missed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Subscriber queue full, dropping event {}", event);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Number of subscribers that have not been dropped yet
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|registration| !registration.sender.is_closed());
        subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Subscriber {
    /// Wait for the next event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Number of events dropped for this subscriber since the last call
    pub fn take_missed(&self) -> usize {
        self.missed.swap(0, Ordering::Relaxed)
    }
}
