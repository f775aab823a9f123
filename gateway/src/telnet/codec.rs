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

//! Telnet stream framing
//!
//! Splits the raw byte stream into data runs and telnet control frames, and
//! encodes frames back onto the wire with IAC doubling.

use super::protocol::{IAC, TelnetCommand, build_negotiation, escape_iac_into};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Largest sub-negotiation payload accepted before it is discarded
pub const MAX_SUBNEGOTIATION: usize = 4096;

const SB: u8 = 250;
const SE: u8 = 240;

/// One unit of the telnet stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetFrame {
    /// Plain data bytes with escaping removed
    Data(Bytes),
    /// `IAC WILL|WONT|DO|DONT <option>`
    Negotiate(TelnetCommand, u8),
    /// `IAC SB <option> <payload> IAC SE`, payload unescaped
    Subnegotiate(u8, Bytes),
    /// Any other two-byte command such as NOP or GA
    Command(u8),
}

/// Telnet framing codec
#[derive(Debug, Default)]
pub struct TelnetCodec {
    /// Set while skipping an oversized sub-negotiation up to its `IAC SE`
    discarding: bool,
}

impl TelnetCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop bytes up to and including the next `IAC SE`.
    /// Returns true once the terminator has been consumed.
    fn skip_subnegotiation(&mut self, src: &mut BytesMut) -> bool {
        let mut index = 0;
        while index + 1 < src.len() {
            if src[index] == IAC {
                if src[index + 1] == SE {
                    src.advance(index + 2);
                    self.discarding = false;
                    return true;
                }
                index += 2;
            } else {
                index += 1;
            }
        }
        // Keep a trailing IAC, it may start the terminator
        src.advance(index);
        false
    }

    /// Scan a sub-negotiation starting at `src[0] == IAC, src[1] == SB`.
    fn decode_subnegotiation(&mut self, src: &mut BytesMut) -> Option<TelnetFrame> {
        if src.len() < 3 {
            return None;
        }
        let option = src[2];
        let mut payload = BytesMut::new();
        let mut index = 3;
        while index < src.len() {
            let byte = src[index];
            if byte != IAC {
                payload.put_u8(byte);
                index += 1;
            } else {
                let Some(&next) = src.get(index + 1) else {
                    break;
                };
                match next {
                    IAC => payload.put_u8(IAC),
                    SE => {
                        src.advance(index + 2);
                        return Some(TelnetFrame::Subnegotiate(option, payload.freeze()));
                    }
                    other => {
                        tracing::debug!("Ignoring IAC {} inside sub-negotiation", other);
                    }
                }
                index += 2;
            }
            if payload.len() > MAX_SUBNEGOTIATION {
                break;
            }
        }

        if payload.len() > MAX_SUBNEGOTIATION {
            tracing::warn!(
                option,
                "Discarding sub-negotiation longer than {} bytes",
                MAX_SUBNEGOTIATION
            );
            src.advance(index);
            self.discarding = true;
        }
        None
    }
}

impl Decoder for TelnetCodec {
    type Item = TelnetFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.discarding && !self.skip_subnegotiation(src) {
                return Ok(None);
            }
            if src.is_empty() {
                return Ok(None);
            }

            if src[0] != IAC {
                let end = src.iter().position(|&b| b == IAC).unwrap_or(src.len());
                return Ok(Some(TelnetFrame::Data(src.split_to(end).freeze())));
            }

            let Some(&command) = src.get(1) else {
                return Ok(None);
            };
            match command {
                IAC => {
                    src.advance(2);
                    return Ok(Some(TelnetFrame::Data(Bytes::from_static(&[IAC]))));
                }
                SB => {
                    let frame = self.decode_subnegotiation(src);
                    if frame.is_some() || !self.discarding {
                        return Ok(frame);
                    }
                    // Oversized payload dropped; keep scanning for its end
                }
                byte => match TelnetCommand::from_byte(byte) {
                    Some(negotiation) if negotiation.is_negotiation() => {
                        let Some(&option) = src.get(2) else {
                            return Ok(None);
                        };
                        src.advance(3);
                        return Ok(Some(TelnetFrame::Negotiate(negotiation, option)));
                    }
                    _ => {
                        src.advance(2);
                        return Ok(Some(TelnetFrame::Command(byte)));
                    }
                },
            }
        }
    }
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = io::Error;

    fn encode(&mut self, frame: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut out = Vec::new();
        match frame {
            TelnetFrame::Data(data) => escape_iac_into(&data, &mut out),
            TelnetFrame::Negotiate(command, option) => {
                out.extend_from_slice(&build_negotiation(command, option))
            }
            TelnetFrame::Subnegotiate(option, payload) => {
                out.extend_from_slice(&[IAC, SB, option]);
                escape_iac_into(&payload, &mut out);
                out.extend_from_slice(&[IAC, SE]);
            }
            TelnetFrame::Command(command) => out.extend_from_slice(&[IAC, command]),
        }
        dst.extend_from_slice(&out);
        Ok(())
    }
}
