//! Commands understood by the car firmware.
//!
//! Every command is a single ASCII letter sent as its own `\r\n` terminated
//! line. The session itself never frames anything; callers use [`line`].

use std::{fmt, str::FromStr};

use thiserror::Error;

pub const LINE_TERMINATOR: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Drive {
    Forward,
    Left,
    Stop,
    Right,
    Back,
}

impl Drive {
    pub const ALL: [Drive; 5] = [
        Drive::Forward,
        Drive::Left,
        Drive::Stop,
        Drive::Right,
        Drive::Back,
    ];

    pub fn letter(self) -> char {
        match self {
            Drive::Forward => 'F',
            Drive::Left => 'L',
            Drive::Stop => 'S',
            Drive::Right => 'R',
            Drive::Back => 'B',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Drive::Forward => "forward",
            Drive::Left => "left",
            Drive::Stop => "stop",
            Drive::Right => "right",
            Drive::Back => "back",
        }
    }

    /// The bytes to put on the wire for this command.
    pub fn to_line(self) -> Vec<u8> {
        let mut buf = [0u8; 4];
        line(self.letter().encode_utf8(&mut buf))
    }
}

impl fmt::Display for Drive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown drive command `{0}`")]
pub struct UnknownCommand(pub String);

impl FromStr for Drive {
    type Err = UnknownCommand;

    /// Accepts the letter or the full name, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Drive::ALL
            .into_iter()
            .find(|x| {
                s.eq_ignore_ascii_case(x.name())
                    || (s.len() == 1 && s.chars().all(|c| c.eq_ignore_ascii_case(&x.letter())))
            })
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

/// Appends the line terminator to `text`.
pub fn line(text: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(text.len() + LINE_TERMINATOR.len());
    buf.extend_from_slice(text.as_bytes());
    buf.extend_from_slice(LINE_TERMINATOR);
    buf
}
