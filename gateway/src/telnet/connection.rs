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

//! Telnet connection management

use super::codec::{TelnetCodec, TelnetFrame};
use super::options::{OptionEvent, OptionState, OptionTable};
use super::protocol::{TelnetOption, escape_iac_into};
use crate::watch::OutputSink;
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Callback for option changes. Runs on the read path and must not block.
pub type OptionHandler = Arc<dyn Fn(OptionEvent) + Send + Sync>;

const BACKSPACE: u8 = 8;
const DELETE: u8 = 127;
const CR: u8 = b'\r';
const LF: u8 = b'\n';
const NUL: u8 = 0;

/// Unique identifier of one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client capabilities learned through negotiation
#[derive(Debug, Clone, Default)]
pub struct ClientCapabilities {
    /// Terminal window size (width, height)
    pub window_size: Option<(u16, u16)>,

    /// Terminal type
    pub terminal_type: Option<String>,
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed")
}

async fn with_deadline<T>(
    deadline: Option<Instant>,
    operation: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, operation)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "deadline expired"))?,
        None => operation.await,
    }
}

/// Write half of a telnet connection
pub struct TelnetWriter {
    sink: tokio::sync::Mutex<Option<BoxedWriter>>,
    deadline: Mutex<Option<Instant>>,
    closed: CancellationToken,
}

impl TelnetWriter {
    fn new(sink: BoxedWriter, closed: CancellationToken) -> Self {
        Self {
            sink: tokio::sync::Mutex::new(Some(sink)),
            deadline: Mutex::new(None),
            closed,
        }
    }

    /// Write bytes exactly as given. Used for negotiation sequences.
    pub async fn write_raw(&self, bytes: &[u8]) -> io::Result<()> {
        if self.closed.is_cancelled() {
            return Err(closed_error());
        }
        let deadline = *self.deadline.lock();
        let write = async {
            let mut sink = self.sink.lock().await;
            let writer = sink.as_mut().ok_or_else(closed_error)?;
            writer.write_all(bytes).await?;
            writer.flush().await
        };
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(closed_error()),
            result = with_deadline(deadline, write) => result,
        }
    }

    /// Write data bytes, doubling any literal IAC
    pub async fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut escaped = Vec::with_capacity(data.len());
        escape_iac_into(data, &mut escaped);
        self.write_raw(&escaped).await
    }

    pub fn set_deadline(&self, deadline: Option<Instant>) {
        *self.deadline.lock() = deadline;
    }

    async fn shutdown(&self) {
        let writer = self.sink.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!("Error shutting down connection: {}", e);
            }
        }
    }
}

#[async_trait]
impl OutputSink for TelnetWriter {
    async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        TelnetWriter::write(self, bytes).await
    }
}

/// Input state that must survive a cancelled `read_line`
struct LineReader {
    frames: FramedRead<BoxedReader, TelnetCodec>,
    line: Vec<u8>,
    after_cr: bool,
    lines: VecDeque<String>,
    /// Negotiation replies not yet transmitted
    replies: Vec<u8>,
}

impl LineReader {
    fn push_data(&mut self, data: &[u8]) {
        for &byte in data {
            if self.after_cr {
                self.after_cr = false;
                if byte == LF || byte == NUL {
                    continue;
                }
            }
            match byte {
                CR => {
                    self.after_cr = true;
                    self.finish_line();
                }
                LF => self.finish_line(),
                BACKSPACE | DELETE => {
                    self.line.pop();
                }
                byte if byte < 0x20 => {}
                byte => self.line.push(byte),
            }
        }
    }

    fn finish_line(&mut self) {
        let line = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        self.lines.push_back(line);
    }
}

/// Telnet connection wrapper
///
/// Owns the negotiation state of one peer. Input is consumed a line at a
/// time through [`TelnetConnection::read_line`]; option traffic found on the
/// way is answered and reported through the option handler.
pub struct TelnetConnection {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    reader: tokio::sync::Mutex<LineReader>,
    writer: Arc<TelnetWriter>,
    options: Mutex<OptionTable>,
    handler: Mutex<Option<OptionHandler>>,
    capabilities: Mutex<ClientCapabilities>,
    read_deadline: Mutex<Option<Instant>>,
    closed: CancellationToken,
}

impl TelnetConnection {
    /// Create a new telnet connection over any byte stream
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let closed = CancellationToken::new();
        Self {
            id: ConnectionId::new(),
            peer: None,
            reader: tokio::sync::Mutex::new(LineReader {
                frames: FramedRead::new(Box::new(read_half), TelnetCodec::new()),
                line: Vec::new(),
                after_cr: false,
                lines: VecDeque::new(),
                replies: Vec::new(),
            }),
            writer: Arc::new(TelnetWriter::new(Box::new(write_half), closed.clone())),
            options: Mutex::new(OptionTable::new()),
            handler: Mutex::new(None),
            capabilities: Mutex::new(ClientCapabilities::default()),
            read_deadline: Mutex::new(None),
            closed,
        }
    }

    /// Record the remote address
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Shared handle to the write half
    pub fn writer(&self) -> Arc<TelnetWriter> {
        self.writer.clone()
    }

    /// Get client capabilities
    pub fn capabilities(&self) -> ClientCapabilities {
        self.capabilities.lock().clone()
    }

    pub fn option_state(&self, option: TelnetOption) -> OptionState {
        self.options.lock().state(option)
    }

    /// Forget what was negotiated for `option`
    pub fn reset_option(&self, option: TelnetOption) {
        self.options.lock().reset(option);
    }

    /// Register the callback for option changes, replacing any previous one
    pub fn set_option_handler<F>(&self, handler: F)
    where
        F: Fn(OptionEvent) + Send + Sync + 'static,
    {
        *self.handler.lock() = Some(Arc::new(handler));
    }

    pub fn clear_option_handler(&self) {
        self.handler.lock().take();
    }

    /// Wait for the next complete line of input.
    ///
    /// Cancel-safe: bytes already received stay buffered for the next call.
    pub async fn read_line(&self) -> io::Result<String> {
        let mut reader = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(closed_error()),
            reader = self.reader.lock() => reader,
        };

        loop {
            if self.closed.is_cancelled() {
                return Err(closed_error());
            }
            if !reader.replies.is_empty() {
                self.writer.write_raw(&reader.replies).await?;
                reader.replies.clear();
            }
            if let Some(line) = reader.lines.pop_front() {
                return Ok(line);
            }

            let deadline = *self.read_deadline.lock();
            let next = tokio::select! {
                biased;
                _ = self.closed.cancelled() => return Err(closed_error()),
                next = with_deadline(deadline, async { reader.frames.next().await.transpose() }) => next?,
            };
            let Some(frame) = next else {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer disconnected",
                ));
            };
            self.process(&mut reader, frame);
        }
    }

    fn process(&self, reader: &mut LineReader, frame: TelnetFrame) {
        match frame {
            TelnetFrame::Data(data) => reader.push_data(&data),
            TelnetFrame::Negotiate(command, option) => {
                let negotiation = self.options.lock().receive(command, option);
                reader.replies.extend_from_slice(&negotiation.reply);
                if let Some(event) = negotiation.event {
                    self.dispatch(event);
                }
            }
            TelnetFrame::Subnegotiate(option, payload) => {
                let event = self.options.lock().subnegotiation(option, &payload);
                if let Some(event) = event {
                    self.dispatch(event);
                }
            }
            TelnetFrame::Command(command) => {
                tracing::trace!(connection = %self.id, command, "Ignoring telnet command");
            }
        }
    }

    fn dispatch(&self, event: OptionEvent) {
        tracing::debug!(connection = %self.id, ?event, "Telnet option event");
        match &event {
            OptionEvent::WindowSize(width, height) => {
                self.capabilities.lock().window_size = Some((*width, *height));
            }
            OptionEvent::TerminalType(terminal) => {
                self.capabilities.lock().terminal_type = Some(terminal.clone());
            }
            _ => {}
        }
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }

    async fn request(&self, option: TelnetOption, enable: bool) -> io::Result<()> {
        let negotiation = self.options.lock().request(option, enable);
        match negotiation {
            Some(bytes) => self.writer.write_raw(&bytes).await,
            None => Ok(()),
        }
    }

    /// Ask the client to stop (or resume) local echo
    pub async fn request_echo(&self, enable: bool) -> io::Result<()> {
        self.request(TelnetOption::Echo, enable).await
    }

    /// Ask the client to report its window size
    pub async fn request_window_size(&self) -> io::Result<()> {
        self.request(TelnetOption::NAWS, true).await
    }

    /// Ask the client to report its terminal type
    pub async fn request_terminal_type(&self) -> io::Result<()> {
        self.request(TelnetOption::TerminalType, true).await
    }

    /// Send data to client
    pub async fn write(&self, data: &[u8]) -> io::Result<()> {
        self.writer.write(data).await
    }

    /// Close the connection. Pending reads fail with `UnexpectedEof`.
    pub async fn close(&self) {
        if !self.closed.is_cancelled() {
            tracing::debug!(connection = %self.id, "Closing connection");
        }
        self.closed.cancel();
        self.writer.shutdown().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Token cancelled when this connection closes
    pub fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Apply `deadline` to both reads and writes
    pub fn set_deadline(&self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }

    pub fn set_read_deadline(&self, deadline: Option<Instant>) {
        *self.read_deadline.lock() = deadline;
    }

    pub fn set_write_deadline(&self, deadline: Option<Instant>) {
        self.writer.set_deadline(deadline);
    }
}

impl Drop for TelnetConnection {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, DuplexStream};

    fn pair() -> (TelnetConnection, DuplexStream) {
        let (server, client) = tokio::io::duplex(1024);
        (TelnetConnection::new(server), client)
    }

    #[tokio::test]
    async fn test_read_line_handles_terminators_and_erasure() {
        let (connection, mut client) = pair();
        client
            .write_all(b"helo\x08lo\r\nsecond\nthird\r\0fourth\x07\r\n")
            .await
            .unwrap();

        assert_eq!(connection.read_line().await.unwrap(), "hello");
        assert_eq!(connection.read_line().await.unwrap(), "second");
        assert_eq!(connection.read_line().await.unwrap(), "third");
        assert_eq!(connection.read_line().await.unwrap(), "fourth");
    }

    #[tokio::test]
    async fn test_read_line_strips_negotiation_and_replies() {
        let (connection, mut client) = pair();
        // DO SUPPRESS-GO-AHEAD in the middle of a line
        client.write_all(b"lo\xff\xfd\x03ok\r\n").await.unwrap();

        assert_eq!(connection.read_line().await.unwrap(), "look");

        let mut reply = [0u8; 3];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [255, 252, 3]);
    }

    #[tokio::test]
    async fn test_literal_iac_in_input() {
        let (connection, mut client) = pair();
        client.write_all(b"a\xff\xffb\r\n").await.unwrap();
        let line = connection.read_line().await.unwrap();
        assert_eq!(line, String::from_utf8_lossy(b"a\xffb"));
    }

    #[tokio::test]
    async fn test_option_handler_receives_window_size() {
        let (connection, mut client) = pair();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        connection.set_option_handler(move |event| sink.lock().push(event));

        connection.request_window_size().await.unwrap();
        let mut request = [0u8; 3];
        client.read_exact(&mut request).await.unwrap();
        assert_eq!(request, [255, 253, 31]);

        client
            .write_all(b"\xff\xfb\x1f\xff\xfa\x1f\x01\x2c\x00\x1e\xff\xf0go\r\n")
            .await
            .unwrap();
        assert_eq!(connection.read_line().await.unwrap(), "go");

        assert_eq!(
            *seen.lock(),
            vec![
                OptionEvent::Enabled(TelnetOption::NAWS),
                OptionEvent::WindowSize(299, 30),
            ]
        );
        assert_eq!(connection.capabilities().window_size, Some((299, 30)));
    }

    #[tokio::test]
    async fn test_repeated_request_transmits_nothing() {
        let (connection, mut client) = pair();
        connection.request_echo(true).await.unwrap();
        connection.request_echo(true).await.unwrap();
        connection.write(b"x").await.unwrap();

        let mut wire = [0u8; 4];
        client.read_exact(&mut wire).await.unwrap();
        assert_eq!(wire, [255, 251, 1, b'x']);
        assert_eq!(connection.option_state(TelnetOption::Echo), OptionState::Requested);

        // A reset slot negotiates again
        connection.reset_option(TelnetOption::Echo);
        assert_eq!(connection.option_state(TelnetOption::Echo), OptionState::Unknown);
        connection.request_echo(true).await.unwrap();
        let mut again = [0u8; 3];
        client.read_exact(&mut again).await.unwrap();
        assert_eq!(again, [255, 251, 1]);
    }

    #[tokio::test]
    async fn test_write_doubles_iac() {
        let (connection, mut client) = pair();
        connection.write(&[1, 255, 2]).await.unwrap();
        let mut wire = [0u8; 4];
        client.read_exact(&mut wire).await.unwrap();
        assert_eq!(wire, [1, 255, 255, 2]);
    }

    #[tokio::test]
    async fn test_close_wakes_pending_read() {
        let (connection, _client) = pair();
        let connection = Arc::new(connection);

        let reader = connection.clone();
        let pending = tokio::spawn(async move { reader.read_line().await });
        tokio::task::yield_now().await;

        connection.close().await;
        let error = pending.await.unwrap().unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);

        // Idempotent
        connection.close().await;
        assert!(connection.is_closed());
        assert!(connection.write(b"late").await.is_err());
    }

    #[tokio::test]
    async fn test_peer_disconnect_is_eof() {
        let (connection, client) = pair();
        drop(client);
        let error = connection.read_line().await.unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_read_keeps_partial_input() {
        let (connection, mut client) = pair();
        client.write_all(b"hel").await.unwrap();

        let attempt = tokio::time::timeout(Duration::from_millis(50), connection.read_line()).await;
        assert!(attempt.is_err());

        client.write_all(b"lo\r\n").await.unwrap();
        assert_eq!(connection.read_line().await.unwrap(), "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_deadline_times_out() {
        let (connection, _client) = pair();
        connection.set_read_deadline(Some(Instant::now() + Duration::from_secs(5)));
        let error = connection.read_line().await.unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_deadline_times_out() {
        let (server, _client) = tokio::io::duplex(8);
        let connection = TelnetConnection::new(server);
        connection.set_write_deadline(Some(Instant::now() + Duration::from_secs(5)));
        let error = connection.write(&[b'x'; 64]).await.unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_read_line_from_mock_stream() {
        let mock = tokio_test::io::Builder::new()
            .read(b"north\r\n")
            .read(b"sou")
            .read(b"th\r\n")
            .build();
        let connection = TelnetConnection::new(mock);

        assert_eq!(connection.read_line().await.unwrap(), "north");
        assert_eq!(connection.read_line().await.unwrap(), "south");
        assert_eq!(
            connection.read_line().await.unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }
}
