//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
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

//! User account data types

use serde::{Deserialize, Serialize};

crate::entity_id! {
    /// Unique identifier of a user account
    UserId
}

/// Account role for access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Player,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Player => write!(f, "Player"),
            UserRole::Admin => write!(f, "Admin"),
        }
    }
}

/// Colour palette a user prefers for rendered output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorMode {
    /// Plain text, no escape sequences
    #[default]
    None,
    /// Palette tuned for light terminal backgrounds
    Light,
    /// Palette tuned for dark terminal backgrounds
    Dark,
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorMode::None => write!(f, "None"),
            ColorMode::Light => write!(f, "Light"),
            ColorMode::Dark => write!(f, "Dark"),
        }
    }
}

impl std::str::FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ColorMode::None),
            "light" => Ok(ColorMode::Light),
            "dark" => Ok(ColorMode::Dark),
            _ => Err("Valid color modes are: None, Light, Dark".to_string()),
        }
    }
}

/// A user account.
///
/// The password is stored as a bcrypt hash and never leaves the world store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub online: bool,
    pub color_mode: ColorMode,
    /// Last window size reported by the user's terminal
    pub window_size: (u16, u16),
    /// Last terminal type reported by the user's terminal
    pub terminal_type: Option<String>,
}

impl User {
    pub fn new(name: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            password_hash: password_hash.into(),
            role: UserRole::Player,
            online: false,
            color_mode: ColorMode::None,
            window_size: (80, 24),
            terminal_type: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("Alice", "hash");

        assert_eq!(user.name, "Alice");
        assert_eq!(user.role, UserRole::Player);
        assert!(!user.online);
        assert!(!user.is_admin());
        assert_eq!(user.window_size, (80, 24));
    }

    #[test]
    fn test_user_serialization_hides_password() {
        let user = User::new("Alice", "secret-hash");

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("Alice"));
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn test_color_mode_parse() {
        assert_eq!("DARK".parse::<ColorMode>(), Ok(ColorMode::Dark));
        assert_eq!("none".parse::<ColorMode>(), Ok(ColorMode::None));
        assert!("purple".parse::<ColorMode>().is_err());
    }
}
