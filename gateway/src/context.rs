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

use crate::commands::CommandRegistry;
use crate::presence::PresenceRegistry;
use mudhall_server::WorldStore;
use std::sync::Arc;
use std::time::Duration;

/// Login policy applied by every session
#[derive(Debug, Clone, Copy)]
pub struct LoginPolicy {
    /// Wrong passwords allowed before the connection is dropped
    pub max_attempts: u32,
    /// Pause after each wrong password
    pub retry_delay: Duration,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Server context containing shared resources
#[derive(Clone)]
pub struct ServerContext {
    /// The world every session plays in
    pub store: Arc<WorldStore>,

    /// Online users and in-game characters
    pub presence: Arc<PresenceRegistry>,

    /// In-game command table
    pub commands: Arc<CommandRegistry>,

    pub login: LoginPolicy,
}

impl ServerContext {
    /// Create a new server context with the standard command table
    pub fn new(store: Arc<WorldStore>, login: LoginPolicy) -> Self {
        Self {
            store,
            presence: Arc::new(PresenceRegistry::new()),
            commands: Arc::new(CommandRegistry::standard()),
            login,
        }
    }

    /// Get the world store
    pub fn store(&self) -> &Arc<WorldStore> {
        &self.store
    }

    /// Get the presence registry
    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }
}
