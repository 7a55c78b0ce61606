//! Wire type registry
//!
//! Maps the leading byte of a Skyhash message to its type.

use std::borrow::Cow;

/// Message delimiter terminating every scalar and length line
pub const DELIMITER: u8 = b'\n';

/// Request header prefix (`*<count>\n`), sent by clients only
pub const QUERY_PREFIX: u8 = b'*';

/// Skyhash wire types, one per message prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    String = b'+',
    SmallInt = b'.',
    SmallIntSigned = b'-',
    Int = b':',
    IntSigned = b';',
    Float = b'%',
    Json = b'$',
    Blob = b'?',
    Response = b'!',
    AnyArray = b'~',
    Error = b'1',
}

impl WireType {
    /// Every known wire type
    pub const ALL: [WireType; 11] = [
        WireType::String,
        WireType::SmallInt,
        WireType::SmallIntSigned,
        WireType::Int,
        WireType::IntSigned,
        WireType::Float,
        WireType::Json,
        WireType::Blob,
        WireType::Response,
        WireType::AnyArray,
        WireType::Error,
    ];

    /// Look up the wire type for a prefix byte
    pub fn from_prefix(byte: u8) -> Option<WireType> {
        match byte {
            b'+' => Some(WireType::String),
            b'.' => Some(WireType::SmallInt),
            b'-' => Some(WireType::SmallIntSigned),
            b':' => Some(WireType::Int),
            b';' => Some(WireType::IntSigned),
            b'%' => Some(WireType::Float),
            b'$' => Some(WireType::Json),
            b'?' => Some(WireType::Blob),
            b'!' => Some(WireType::Response),
            b'~' => Some(WireType::AnyArray),
            b'1' => Some(WireType::Error),
            _ => None,
        }
    }

    /// The prefix byte for this type
    pub fn prefix(self) -> u8 {
        self as u8
    }

    /// Human-readable label
    pub fn name(self) -> &'static str {
        match self {
            WireType::String => "string",
            WireType::SmallInt => "small-integer",
            WireType::SmallIntSigned => "small-integer-signed",
            WireType::Int => "integer",
            WireType::IntSigned => "integer-signed",
            WireType::Float => "float",
            WireType::Json => "json",
            WireType::Blob => "blob",
            WireType::Response => "response",
            WireType::AnyArray => "any-array",
            WireType::Error => "error",
        }
    }
}

/// Label a raw prefix for diagnostics.
///
/// Unknown prefixes are returned as their (lossy) text.
pub fn prefix_name(bytes: &[u8]) -> Cow<'_, str> {
    match bytes {
        [byte] => match WireType::from_prefix(*byte) {
            Some(wire_type) => Cow::Borrowed(wire_type.name()),
            None => String::from_utf8_lossy(bytes),
        },
        _ => String::from_utf8_lossy(bytes),
    }
}
