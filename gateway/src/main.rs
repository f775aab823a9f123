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
use mudhall_gateway::config::{Arguments, Configuration};
use mudhall_gateway::{LoginPolicy, ServerContext, TelnetServer};
use mudhall_server::WorldStore;
use mudhall_server::engine::NpcEngine;
use mudhall_server::events::EventBus;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration from a file with environment variable substitution
    let config = Configuration::load_or_default(&arguments.config_file)
        .inspect_err(|err| tracing::error!("Configuration load error: {}", err))?;
    debug!("Configuration loaded: {:?}", config);
    info!("Starting Mudhall Gateway...");

    // Build the world
    let bus = Arc::new(EventBus::new(config.world.event_queue_capacity));
    let mut store = WorldStore::new(bus);
    if let Some(cost) = config.login.password_cost {
        store = store.with_password_cost(cost);
    }
    let store = Arc::new(store);
    let start_room = store.bootstrap(config.world.start_zone.as_str())?;
    info!("Start room is {}", start_room);

    let engine = NpcEngine::new(store.clone(), config.world.npc_tick());
    engine.start();

    let login = LoginPolicy {
        max_attempts: config.login.max_attempts,
        retry_delay: config.login.retry_delay(),
    };
    let context = ServerContext::new(store, login);

    // Start the telnet listener
    let addr = config.telnet.addr.to_addr();
    let listener = TcpListener::bind(addr)
        .await
        .inspect_err(|err| tracing::error!("Unable to bind {}: {}", addr, err))?;
    info!("Telnet server listening on {}", addr);

    let server = TelnetServer::new(context);
    tokio::select! {
        result = server.run(listener) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    engine.shutdown();
    Ok(())
}
