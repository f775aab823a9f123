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

//! Output fan-out for spectating
//!
//! A [`FanOut`] sits on one connection's output path. Everything the session
//! writes goes to the primary sink and is mirrored to any number of watchers.

use crate::telnet::ConnectionId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

/// Destination for session output
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Write data bytes
    async fn write(&self, bytes: &[u8]) -> io::Result<()>;
}

/// Errors from watch set management
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Connection is closed")]
    Closed,
}

#[derive(Default)]
struct WatchSet {
    closed: bool,
    watchers: HashMap<ConnectionId, Arc<dyn OutputSink>>,
}

/// Primary output plus mirrored watchers
pub struct FanOut {
    id: ConnectionId,
    primary: Arc<dyn OutputSink>,
    watch: Mutex<WatchSet>,
}

impl FanOut {
    pub fn new(id: ConnectionId, primary: Arc<dyn OutputSink>) -> Self {
        Self {
            id,
            primary,
            watch: Mutex::new(WatchSet::default()),
        }
    }

    /// Connection this fan-out belongs to
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Mirror output to `sink` under `id`, replacing any previous sink for it
    pub fn add_watcher(&self, id: ConnectionId, sink: Arc<dyn OutputSink>) -> Result<(), WatchError> {
        let mut watch = self.watch.lock();
        if watch.closed {
            return Err(WatchError::Closed);
        }
        watch.watchers.insert(id, sink);
        tracing::debug!(connection = %self.id, watcher = %id, "Watcher attached");
        Ok(())
    }

    /// Stop mirroring to `id`. Returns whether it was watching.
    pub fn remove_watcher(&self, id: ConnectionId) -> bool {
        let removed = self.watch.lock().watchers.remove(&id).is_some();
        if removed {
            tracing::debug!(connection = %self.id, watcher = %id, "Watcher detached");
        }
        removed
    }

    pub fn watcher_count(&self) -> usize {
        self.watch.lock().watchers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.watch.lock().closed
    }

    /// Drop every watcher and refuse new ones
    pub fn close(&self) {
        let mut watch = self.watch.lock();
        watch.closed = true;
        watch.watchers.clear();
    }

    /// Write to the primary sink, then mirror to every watcher.
    ///
    /// Only the primary result is returned. Watcher failures are logged and
    /// skipped; the watcher stays registered.
    pub async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let result = self.primary.write(bytes).await;

        let watchers: Vec<(ConnectionId, Arc<dyn OutputSink>)> = self
            .watch
            .lock()
            .watchers
            .iter()
            .map(|(id, sink)| (*id, sink.clone()))
            .collect();
        if !watchers.is_empty() {
            let writes = watchers.iter().map(|(_, sink)| sink.write(bytes));
            let results = futures::future::join_all(writes).await;
            for ((id, _), outcome) in watchers.iter().zip(results) {
                if let Err(e) = outcome {
                    tracing::debug!(connection = %self.id, watcher = %id, "Mirror write failed: {}", e);
                }
            }
        }

        result
    }

    /// Write a string as-is
    pub async fn write_str(&self, text: &str) -> io::Result<()> {
        self.write(text.as_bytes()).await
    }

    /// Write a string followed by CR LF
    pub async fn write_line(&self, text: &str) -> io::Result<()> {
        let mut line = String::with_capacity(text.len() + 2);
        line.push_str(text);
        line.push_str("\r\n");
        self.write(line.as_bytes()).await
    }
}
