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

//! Telnet front end for the Mudhall gateway
//!
//! This module provides:
//! - A byte level codec for the telnet stream
//! - Option negotiation for ECHO, NAWS and TERMINAL-TYPE
//! - [`TelnetConnection`], a line oriented connection over any async stream
//! - [`TelnetServer`], the accept loop that starts one session per client

use crate::context::ServerContext;
use crate::session::Session;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

pub mod codec;
pub mod connection;
pub mod options;
pub mod protocol;

pub use connection::{ConnectionId, TelnetConnection, TelnetWriter};

/// Telnet server
pub struct TelnetServer {
    context: ServerContext,
}

impl TelnetServer {
    /// Create a new telnet server
    pub fn new(context: ServerContext) -> Self {
        Self { context }
    }

    /// Accept connections until the listener fails permanently
    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        tracing::info!(addr = ?listener.local_addr().ok(), "Telnet server accepting connections");

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    tracing::info!("New telnet connection from {}", addr);
                    let context = self.context.clone();
                    let session = tokio::spawn(handle_connection(stream, addr, context));

                    // A panicking session only takes down its own task
                    tokio::spawn(async move {
                        if let Err(e) = session.await {
                            if e.is_panic() {
                                tracing::error!(peer = %addr, "Session task panicked: {}", e);
                            }
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Error accepting telnet connection: {}", e);
                }
            }
        }
    }
}

/// Handle a single telnet connection
#[tracing::instrument(skip(stream, context), fields(peer = %addr))]
async fn handle_connection(stream: TcpStream, addr: SocketAddr, context: ServerContext) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("Unable to set TCP_NODELAY: {}", e);
    }
    let connection = TelnetConnection::new(stream).with_peer(addr);
    let connection_id = connection.id();
    let session = Session::new(context, connection);

    tracing::debug!(connection = %connection_id, "Session started");
    // Failures are logged by the session with user and character attached
    let _ = session.run().await;
    tracing::info!(connection = %connection_id, "Telnet connection closed");
}
