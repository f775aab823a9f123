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

//! Mudhall Gateway Library
//!
//! This library provides the telnet front end of Mudhall: protocol handling,
//! output fan-out for session watching, per-connection sessions and the
//! in-game command table.

pub mod commands;
pub mod config;
pub mod context;
pub mod presence;
pub mod session;
pub mod telnet;
pub mod watch;

// Re-export commonly used types
pub use context::{LoginPolicy, ServerContext};
pub use presence::PresenceRegistry;
pub use session::{Session, SessionError, SessionState};
pub use telnet::{TelnetConnection, TelnetServer};
pub use watch::{FanOut, OutputSink};
