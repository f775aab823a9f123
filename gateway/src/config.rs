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

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "gateway/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "gateway/.env"
    )]
    pub env_file: Option<String>,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub telnet: TelnetConfig,

    #[serde(default)]
    pub login: LoginConfig,

    #[serde(default)]
    pub world: WorldConfig,
}

impl Configuration {
    pub fn load(path: &str) -> Result<Self, String> {
        tracing::debug!("Loading configuration from file: {}", path);
        let file =
            std::fs::File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?;

        let conf = serde_yaml::from_reader(file)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        Ok(conf)
    }

    /// Like [`Configuration::load`], but a missing file yields the defaults
    pub fn load_or_default(path: &str) -> Result<Self, String> {
        if !std::path::Path::new(path).exists() {
            tracing::warn!("Config file {} not found, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TelnetConfig {
    #[serde(default)]
    pub addr: EnvField<TelnetBinding>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TelnetBinding(SocketAddr);

impl TelnetBinding {
    pub fn to_addr(&self) -> SocketAddr {
        self.0
    }
    pub fn to_ip(&self) -> IpAddr {
        self.0.ip()
    }
    pub fn to_port(&self) -> u16 {
        self.0.port()
    }
}

impl FromStr for TelnetBinding {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(SocketAddr::from_str(s)?))
    }
}

impl Default for TelnetBinding {
    fn default() -> Self {
        Self(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::new(0, 0, 0, 0),
            8945,
        )))
    }
}

impl std::fmt::Display for TelnetBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Password attempts before the connection is dropped (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after a wrong password in milliseconds (default: 2000)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// bcrypt work factor for new passwords
    #[serde(default)]
    pub password_cost: Option<u32>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

impl LoginConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        LoginConfig {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            password_cost: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorldConfig {
    /// NPC behavior tick in milliseconds (default: 1000)
    #[serde(default = "default_npc_tick_ms")]
    pub npc_tick_ms: u64,

    /// Per-subscriber event queue capacity (default: 1024)
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Zone created when the world is empty
    #[serde(default)]
    pub start_zone: EnvField<ZoneName>,
}

fn default_npc_tick_ms() -> u64 {
    1000
}

fn default_event_queue_capacity() -> usize {
    mudhall_server::events::DEFAULT_QUEUE_CAPACITY
}

impl WorldConfig {
    pub fn npc_tick(&self) -> Duration {
        Duration::from_millis(self.npc_tick_ms)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            npc_tick_ms: default_npc_tick_ms(),
            event_queue_capacity: default_event_queue_capacity(),
            start_zone: Default::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ZoneName(String);

impl ZoneName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ZoneName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Default for ZoneName {
    fn default() -> Self {
        Self(String::from("Default"))
    }
}

impl std::fmt::Display for ZoneName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_telnet_config_default() {
        let config = TelnetConfig::default();
        assert_eq!(
            config.addr.to_addr(),
            SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(0, 0, 0, 0), 8945))
        );
        assert_eq!(config.addr.to_ip(), Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.addr.to_port(), 8945);
    }

    #[test]
    fn test_login_and_world_defaults() {
        let login = LoginConfig::default();
        assert_eq!(login.max_attempts, 3);
        assert_eq!(login.retry_delay(), Duration::from_secs(2));
        assert_eq!(login.password_cost, None);

        let world = WorldConfig::default();
        assert_eq!(world.npc_tick(), Duration::from_secs(1));
        assert_eq!(world.event_queue_capacity, 1024);
        assert_eq!(world.start_zone.as_str(), "Default");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Configuration::load_or_default("does/not/exist.yaml").unwrap();
        assert_eq!(config.telnet.addr.to_port(), 8945);
        assert_eq!(config.login.max_attempts, 3);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "telnet: [this is: not valid").unwrap();
        let path = file.path().to_str().unwrap();
        assert!(Configuration::load_or_default(path).is_err());
    }

    #[test]
    fn test_configuration_new_from_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            file,
            r#"
telnet:
  addr: 127.0.0.1:4001
login:
  max_attempts: 5
  retry_delay_ms: 10
world:
  npc_tick_ms: 250
  start_zone: Midgaard
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        unsafe {
            std::env::remove_var("MUDHALL_TELNET_ADDR");
        }

        let config = Configuration::load(path).unwrap();

        assert_eq!(config.telnet.addr.to_port(), 4001);
        assert_eq!(config.login.max_attempts, 5);
        assert_eq!(config.login.retry_delay(), Duration::from_millis(10));
        assert_eq!(config.world.npc_tick(), Duration::from_millis(250));
        assert_eq!(config.world.event_queue_capacity, 1024);
        assert_eq!(config.world.start_zone.as_str(), "Midgaard");
    }

    #[test]
    fn test_configuration_env_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            file,
            r#"
telnet:
  addr: "${{MUDHALL_TELNET_ADDR:-127.0.0.1:4000}}"
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap();

        unsafe {
            std::env::set_var("MUDHALL_TELNET_ADDR", "127.0.0.1:9000");
        }

        let config = Configuration::load(path).unwrap();

        unsafe {
            std::env::remove_var("MUDHALL_TELNET_ADDR");
        }

        assert_eq!(
            config.telnet.addr.to_addr(),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9000)
        );
    }
}
