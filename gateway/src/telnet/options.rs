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

//! Per-connection telnet option negotiation
//!
//! Every supported option has one slot holding its negotiation state. Local
//! requests and peer commands both run through [`OptionTable`], which decides
//! what (if anything) goes back on the wire.

use super::protocol::{
    TTYPE_SEND, TelnetCommand, TelnetOption, build_negotiation, build_subnegotiation,
    parse_terminal_type, parse_window_size,
};

/// Negotiation state of one option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionState {
    #[default]
    Unknown,
    Requested,
    Enabled,
    Disabled,
}

/// Something the application should hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionEvent {
    Enabled(TelnetOption),
    Disabled(TelnetOption),
    WindowSize(u16, u16),
    TerminalType(String),
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    state: OptionState,
    /// Direction of the outstanding request while `Requested`
    wanted: bool,
}

/// Which side performs an option
fn is_local(option: TelnetOption) -> bool {
    // We echo; the peer reports its window size and terminal type
    option == TelnetOption::Echo
}

/// Result of processing one peer command
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Negotiation {
    /// Bytes to send back to the peer
    pub reply: Vec<u8>,
    /// Change to report to the application
    pub event: Option<OptionEvent>,
}

/// Option slots for one connection
#[derive(Debug, Default)]
pub struct OptionTable {
    echo: Slot,
    window_size: Slot,
    terminal_type: Slot,
}

impl OptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, option: TelnetOption) -> &mut Slot {
        match option {
            TelnetOption::Echo => &mut self.echo,
            TelnetOption::NAWS => &mut self.window_size,
            TelnetOption::TerminalType => &mut self.terminal_type,
        }
    }

    pub fn state(&self, option: TelnetOption) -> OptionState {
        match option {
            TelnetOption::Echo => self.echo.state,
            TelnetOption::NAWS => self.window_size.state,
            TelnetOption::TerminalType => self.terminal_type.state,
        }
    }

    /// Return a slot to `Unknown`
    pub fn reset(&mut self, option: TelnetOption) {
        *self.slot(option) = Slot::default();
    }

    /// Ask to turn `option` on or off.
    ///
    /// Returns the negotiation to transmit, or `None` when the option is
    /// already in (or already heading to) the requested state.
    pub fn request(&mut self, option: TelnetOption, enable: bool) -> Option<[u8; 3]> {
        let slot = self.slot(option);
        let redundant = match slot.state {
            OptionState::Enabled => enable,
            OptionState::Disabled => !enable,
            OptionState::Requested => slot.wanted == enable,
            OptionState::Unknown => false,
        };
        if redundant {
            return None;
        }
        slot.state = OptionState::Requested;
        slot.wanted = enable;

        let command = match (is_local(option), enable) {
            (true, true) => TelnetCommand::WILL,
            (true, false) => TelnetCommand::WONT,
            (false, true) => TelnetCommand::DO,
            (false, false) => TelnetCommand::DONT,
        };
        Some(build_negotiation(command, option.to_byte()))
    }

    /// Process `IAC <command> <option>` received from the peer
    pub fn receive(&mut self, command: TelnetCommand, option_byte: u8) -> Negotiation {
        let Some(option) = TelnetOption::from_byte(option_byte) else {
            return refuse(command, option_byte);
        };

        // Which commands speak about the side that performs this option
        let (affirm, deny, ack_on, ack_off) = if is_local(option) {
            (TelnetCommand::DO, TelnetCommand::DONT, TelnetCommand::WILL, TelnetCommand::WONT)
        } else {
            (TelnetCommand::WILL, TelnetCommand::WONT, TelnetCommand::DO, TelnetCommand::DONT)
        };

        let slot = self.slot(option);
        if command == affirm {
            let mut reply = match slot.state {
                OptionState::Enabled => return Negotiation::default(),
                // Answer to our own request
                OptionState::Requested => Vec::new(),
                // Peer offer, accepted once
                OptionState::Unknown | OptionState::Disabled => {
                    build_negotiation(ack_on, option_byte).to_vec()
                }
            };
            slot.state = OptionState::Enabled;
            if option == TelnetOption::TerminalType {
                reply.extend(build_subnegotiation(option, &[TTYPE_SEND]));
            }
            Negotiation {
                reply,
                event: Some(OptionEvent::Enabled(option)),
            }
        } else if command == deny {
            let reply = match slot.state {
                OptionState::Disabled => return Negotiation::default(),
                OptionState::Unknown => {
                    slot.state = OptionState::Disabled;
                    return Negotiation::default();
                }
                OptionState::Requested => Vec::new(),
                OptionState::Enabled => build_negotiation(ack_off, option_byte).to_vec(),
            };
            slot.state = OptionState::Disabled;
            Negotiation {
                reply,
                event: Some(OptionEvent::Disabled(option)),
            }
        } else {
            // The peer wants to take the other side of an option we only
            // support in one direction
            refuse(command, option_byte)
        }
    }

    /// Decode a sub-negotiation payload for `option_byte`
    pub fn subnegotiation(&self, option_byte: u8, payload: &[u8]) -> Option<OptionEvent> {
        match TelnetOption::from_byte(option_byte) {
            Some(TelnetOption::NAWS) => match parse_window_size(payload) {
                Some((width, height)) => Some(OptionEvent::WindowSize(width, height)),
                None => {
                    tracing::debug!("Ignoring window size payload of {} bytes", payload.len());
                    None
                }
            },
            Some(TelnetOption::TerminalType) => Some(OptionEvent::TerminalType(parse_terminal_type(payload))),
            _ => {
                tracing::debug!(option = option_byte, "Ignoring sub-negotiation");
                None
            }
        }
    }
}

fn refuse(command: TelnetCommand, option: u8) -> Negotiation {
    let reply = match command {
        TelnetCommand::DO => build_negotiation(TelnetCommand::WONT, option).to_vec(),
        TelnetCommand::WILL => build_negotiation(TelnetCommand::DONT, option).to_vec(),
        _ => Vec::new(),
    };
    Negotiation { reply, event: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECHO: u8 = 1;
    const TTYPE: u8 = 24;
    const NAWS: u8 = 31;

    #[test]
    fn test_request_echo_then_acknowledge() {
        let mut table = OptionTable::new();
        assert_eq!(table.request(TelnetOption::Echo, true), Some([255, 251, ECHO]));
        assert_eq!(table.state(TelnetOption::Echo), OptionState::Requested);

        let result = table.receive(TelnetCommand::DO, ECHO);
        assert!(result.reply.is_empty());
        assert_eq!(result.event, Some(OptionEvent::Enabled(TelnetOption::Echo)));
        assert_eq!(table.state(TelnetOption::Echo), OptionState::Enabled);
    }

    #[test]
    fn test_repeated_request_is_noop() {
        let mut table = OptionTable::new();
        assert!(table.request(TelnetOption::NAWS, true).is_some());
        assert_eq!(table.request(TelnetOption::NAWS, true), None);

        table.receive(TelnetCommand::WILL, NAWS);
        assert_eq!(table.request(TelnetOption::NAWS, true), None);
        assert_eq!(table.request(TelnetOption::NAWS, false), Some([255, 254, NAWS]));
    }

    #[test]
    fn test_refusal_disables() {
        let mut table = OptionTable::new();
        table.request(TelnetOption::NAWS, true);
        let result = table.receive(TelnetCommand::WONT, NAWS);
        assert!(result.reply.is_empty());
        assert_eq!(result.event, Some(OptionEvent::Disabled(TelnetOption::NAWS)));
        assert_eq!(table.state(TelnetOption::NAWS), OptionState::Disabled);
        assert_eq!(table.request(TelnetOption::NAWS, false), None);
    }

    #[test]
    fn test_peer_offer_acknowledged_once() {
        let mut table = OptionTable::new();
        let first = table.receive(TelnetCommand::WILL, NAWS);
        assert_eq!(first.reply, vec![255, 253, NAWS]);
        let second = table.receive(TelnetCommand::WILL, NAWS);
        assert_eq!(second, Negotiation::default());
    }

    #[test]
    fn test_terminal_type_solicited_when_enabled() {
        let mut table = OptionTable::new();
        table.request(TelnetOption::TerminalType, true);
        let result = table.receive(TelnetCommand::WILL, TTYPE);
        assert_eq!(result.reply, vec![255, 250, TTYPE, 1, 255, 240]);
    }

    #[test]
    fn test_unsupported_options_refused() {
        let mut table = OptionTable::new();
        assert_eq!(table.receive(TelnetCommand::DO, 3).reply, vec![255, 252, 3]);
        assert_eq!(table.receive(TelnetCommand::WILL, 3).reply, vec![255, 254, 3]);
        assert!(table.receive(TelnetCommand::WONT, 3).reply.is_empty());
        // Peer-side echo is not something we support
        assert_eq!(table.receive(TelnetCommand::WILL, ECHO).reply, vec![255, 254, ECHO]);
    }

    #[test]
    fn test_disabling_enabled_option_by_peer_is_acknowledged() {
        let mut table = OptionTable::new();
        table.request(TelnetOption::Echo, true);
        table.receive(TelnetCommand::DO, ECHO);
        let result = table.receive(TelnetCommand::DONT, ECHO);
        assert_eq!(result.reply, vec![255, 252, ECHO]);
        assert_eq!(table.state(TelnetOption::Echo), OptionState::Disabled);
    }

    #[test]
    fn test_reset_returns_to_unknown() {
        let mut table = OptionTable::new();
        table.request(TelnetOption::Echo, true);
        table.reset(TelnetOption::Echo);
        assert_eq!(table.state(TelnetOption::Echo), OptionState::Unknown);
        assert!(table.request(TelnetOption::Echo, true).is_some());
    }

    #[test]
    fn test_subnegotiation_events() {
        let table = OptionTable::new();
        assert_eq!(
            table.subnegotiation(NAWS, &[0, 80, 0, 24]),
            Some(OptionEvent::WindowSize(80, 24))
        );
        assert_eq!(table.subnegotiation(NAWS, &[0, 80, 0]), None);
        assert_eq!(
            table.subnegotiation(TTYPE, b"\x00VT100"),
            Some(OptionEvent::TerminalType("VT100".to_string()))
        );
        assert_eq!(table.subnegotiation(ECHO, b"x"), None);
    }
}
