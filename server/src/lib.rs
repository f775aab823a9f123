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

//! Mudhall World Server
//!
//! The shared world every session plays in:
//! - [`store::WorldStore`]: the in-memory world model
//! - [`events::EventBus`]: notifications about every world mutation
//! - [`engine::NpcEngine`]: autonomous NPC behavior
//! - [`clock`]: in-world time of day

pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod store;

pub use error::{WorldError, WorldResult};
pub use store::WorldStore;
