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

//! Telnet protocol constants and utilities
//!
//! This module defines telnet protocol commands, the options the gateway
//! negotiates, and helpers for building and parsing negotiation payloads.

/// Interpret As Command
pub const IAC: u8 = 255;

/// Terminal type sub-negotiation: the value follows
pub const TTYPE_IS: u8 = 0;

/// Terminal type sub-negotiation: ask the peer for its value
pub const TTYPE_SEND: u8 = 1;

/// Telnet command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TelnetCommand {
    /// Interpret As Command
    IAC = 255,
    /// Don't do option
    DONT = 254,
    /// Do option
    DO = 253,
    /// Won't do option
    WONT = 252,
    /// Will do option
    WILL = 251,
    /// Subnegotiation begin
    SB = 250,
    /// Go ahead
    GA = 249,
    /// Erase line
    EL = 248,
    /// Erase character
    EC = 247,
    /// Are you there
    AYT = 246,
    /// Abort output
    AO = 245,
    /// Interrupt process
    IP = 244,
    /// Break
    BRK = 243,
    /// Data mark
    DM = 242,
    /// No operation
    NOP = 241,
    /// Subnegotiation end
    SE = 240,
}

impl TelnetCommand {
    /// Convert byte to telnet command
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            255 => Some(Self::IAC),
            254 => Some(Self::DONT),
            253 => Some(Self::DO),
            252 => Some(Self::WONT),
            251 => Some(Self::WILL),
            250 => Some(Self::SB),
            249 => Some(Self::GA),
            248 => Some(Self::EL),
            247 => Some(Self::EC),
            246 => Some(Self::AYT),
            245 => Some(Self::AO),
            244 => Some(Self::IP),
            243 => Some(Self::BRK),
            242 => Some(Self::DM),
            241 => Some(Self::NOP),
            240 => Some(Self::SE),
            _ => None,
        }
    }

    /// Convert command to byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Whether this is one of WILL, WONT, DO or DONT
    pub fn is_negotiation(self) -> bool {
        matches!(self, Self::WILL | Self::WONT | Self::DO | Self::DONT)
    }
}

/// Telnet option codes the gateway understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TelnetOption {
    /// Echo
    Echo = 1,
    /// Terminal type
    TerminalType = 24,
    /// Negotiate about window size (NAWS)
    NAWS = 31,
}

impl TelnetOption {
    /// Convert byte to telnet option
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Echo),
            24 => Some(Self::TerminalType),
            31 => Some(Self::NAWS),
            _ => None,
        }
    }

    /// Convert option to byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Build a telnet negotiation sequence
pub fn build_negotiation(command: TelnetCommand, option: u8) -> [u8; 3] {
    [TelnetCommand::IAC.to_byte(), command.to_byte(), option]
}

/// Build a telnet subnegotiation sequence
pub fn build_subnegotiation(option: TelnetOption, data: &[u8]) -> Vec<u8> {
    let mut result = vec![
        TelnetCommand::IAC.to_byte(),
        TelnetCommand::SB.to_byte(),
        option.to_byte(),
    ];
    escape_iac_into(data, &mut result);
    result.push(TelnetCommand::IAC.to_byte());
    result.push(TelnetCommand::SE.to_byte());
    result
}

/// Append `data` to `out`, doubling every IAC byte
pub fn escape_iac_into(data: &[u8], out: &mut Vec<u8>) {
    out.reserve(data.len());
    for &byte in data {
        out.push(byte);
        if byte == IAC {
            out.push(byte);
        }
    }
}

/// Parse window size from NAWS subnegotiation data.
///
/// Each dimension is two bytes combined as `255 * high + low`. Peers send
/// exactly four bytes; anything else is rejected.
pub fn parse_window_size(data: &[u8]) -> Option<(u16, u16)> {
    let [w0, w1, h0, h1] = data else {
        return None;
    };
    let combine = |high: u8, low: u8| (high as u16) * 255 + low as u16;
    Some((combine(*w0, *w1), combine(*h0, *h1)))
}

/// Parse a terminal type subnegotiation payload, stripping the `IS` marker
pub fn parse_terminal_type(data: &[u8]) -> String {
    let value = match data.split_first() {
        Some((&TTYPE_IS, rest)) => rest,
        _ => data,
    };
    String::from_utf8_lossy(value).into_owned()
}

/// ANSI color codes
pub mod ansi {
    use mudhall_common::ColorMode;

    /// Reset all attributes
    pub const RESET: &str = "\x1b[0m";

    /// Foreground colors
    pub mod fg {
        pub const BLACK: &str = "\x1b[30m";
        pub const RED: &str = "\x1b[31m";
        pub const GREEN: &str = "\x1b[32m";
        pub const YELLOW: &str = "\x1b[33m";
        pub const BLUE: &str = "\x1b[34m";
        pub const MAGENTA: &str = "\x1b[35m";
        pub const CYAN: &str = "\x1b[36m";
        pub const WHITE: &str = "\x1b[37m";

        /// Bright colors
        pub const BRIGHT_BLACK: &str = "\x1b[90m";
        pub const BRIGHT_RED: &str = "\x1b[91m";
        pub const BRIGHT_GREEN: &str = "\x1b[92m";
        pub const BRIGHT_YELLOW: &str = "\x1b[93m";
        pub const BRIGHT_BLUE: &str = "\x1b[94m";
        pub const BRIGHT_MAGENTA: &str = "\x1b[95m";
        pub const BRIGHT_CYAN: &str = "\x1b[96m";
        pub const BRIGHT_WHITE: &str = "\x1b[97m";
    }

    /// Logical text colors. The escape code used depends on the viewer's
    /// color mode: bright codes on dark terminals, plain codes on light ones.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Color {
        Red,
        Green,
        Yellow,
        Blue,
        Magenta,
        Cyan,
        White,
        Gray,
    }

    impl Color {
        pub const ALL: [Color; 8] = [
            Color::Red,
            Color::Green,
            Color::Yellow,
            Color::Blue,
            Color::Magenta,
            Color::Cyan,
            Color::White,
            Color::Gray,
        ];

        /// Escape code for this color, or `None` when color is off
        pub fn code(self, mode: ColorMode) -> Option<&'static str> {
            let code = match (mode, self) {
                (ColorMode::None, _) => return None,
                (ColorMode::Dark, Color::Red) => fg::BRIGHT_RED,
                (ColorMode::Dark, Color::Green) => fg::BRIGHT_GREEN,
                (ColorMode::Dark, Color::Yellow) => fg::BRIGHT_YELLOW,
                (ColorMode::Dark, Color::Blue) => fg::BRIGHT_BLUE,
                (ColorMode::Dark, Color::Magenta) => fg::BRIGHT_MAGENTA,
                (ColorMode::Dark, Color::Cyan) => fg::BRIGHT_CYAN,
                (ColorMode::Dark, Color::White) => fg::BRIGHT_WHITE,
                (ColorMode::Dark, Color::Gray) => fg::WHITE,
                (ColorMode::Light, Color::Red) => fg::RED,
                (ColorMode::Light, Color::Green) => fg::GREEN,
                (ColorMode::Light, Color::Yellow) => fg::YELLOW,
                (ColorMode::Light, Color::Blue) => fg::BLUE,
                (ColorMode::Light, Color::Magenta) => fg::MAGENTA,
                (ColorMode::Light, Color::Cyan) => fg::CYAN,
                (ColorMode::Light, Color::White) => fg::BLACK,
                (ColorMode::Light, Color::Gray) => fg::BRIGHT_BLACK,
            };
            Some(code)
        }
    }

    impl std::fmt::Display for Color {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            std::fmt::Debug::fmt(self, f)
        }
    }

    /// Wrap `text` in the escape code for `color`
    pub fn paint(mode: ColorMode, color: Color, text: &str) -> String {
        match color.code(mode) {
            Some(code) => format!("{}{}{}", code, text, RESET),
            None => text.to_string(),
        }
    }
}
