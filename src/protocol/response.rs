//! Response status codes
//!
//! Sent by the server with the `!` prefix (`!<code>\n`).

use std::fmt;
use std::io::{BufRead, Write};

use crate::error::Result;
use super::codec::{assert_prefix, invalid, parse_payload, read_line, write_scalar, Marshal, Unmarshal};
use super::prefix::WireType;

/// Response status codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseCode {
    #[default]
    Okay = 0,
    NotFound = 1,
    OverWriteError = 2,
    ActionError = 3,
    PacketError = 4,
    ServerError = 5,
    ErrorString = 6,
    WrongType = 7,
    UnknownDataType = 8,
    EncodingError = 9,
}

impl ResponseCode {
    /// Look up a code by its number
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ResponseCode::Okay),
            1 => Some(ResponseCode::NotFound),
            2 => Some(ResponseCode::OverWriteError),
            3 => Some(ResponseCode::ActionError),
            4 => Some(ResponseCode::PacketError),
            5 => Some(ResponseCode::ServerError),
            6 => Some(ResponseCode::ErrorString),
            7 => Some(ResponseCode::WrongType),
            8 => Some(ResponseCode::UnknownDataType),
            9 => Some(ResponseCode::EncodingError),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            ResponseCode::Okay => "Okay",
            ResponseCode::NotFound => "Not Found",
            ResponseCode::OverWriteError => "Overwrite Error",
            ResponseCode::ActionError => "Action Error",
            ResponseCode::PacketError => "Packet Error",
            ResponseCode::ServerError => "Server Error",
            ResponseCode::ErrorString => "Error String",
            ResponseCode::WrongType => "Wrong Type Error",
            ResponseCode::UnknownDataType => "Unknown Data Type Error",
            ResponseCode::EncodingError => "Encoding Error",
        }
    }

    /// Wire form of this code (`!<code>\n`)
    pub fn to_response(self) -> Vec<u8> {
        format!("!{}\n", self.code()).into_bytes()
    }

    pub fn is_okay(self) -> bool {
        self == ResponseCode::Okay
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Marshal for ResponseCode {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        write_scalar(writer, WireType::Response, self.code())
    }
}

impl Unmarshal for ResponseCode {
    fn unmarshal(&mut self, reader: &mut dyn BufRead) -> Result<()> {
        assert_prefix(reader, WireType::Response)?;
        let line = read_line(reader)?;
        let code: u8 = parse_payload(WireType::Response, &line)?;
        *self = ResponseCode::from_code(code)
            .ok_or_else(|| invalid(WireType::Response, format!("unknown response code {}", code)))?;
        Ok(())
    }
}
