//! Wire value types
//!
//! One type per Skyhash wire type, each implementing [`Marshal`] and
//! [`Unmarshal`] for exactly one message.

use std::io::{BufRead, Write};

use bytes::BufMut;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SkyError, WireError};
use super::codec::{
    assert_prefix, invalid, parse_payload, put_length, read_length, read_line, read_sized,
    write_scalar, write_sized, Marshal, Unmarshal,
};
use super::pool;
use super::prefix::{WireType, DELIMITER, QUERY_PREFIX};

// =============================================================================
// String
// =============================================================================

/// Skyhash string (`+<len>\n<utf8>\n`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SkyString(pub String);

impl SkyString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for SkyString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SkyString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Marshal for SkyString {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        self.0.as_str().marshal(writer)
    }
}

impl Marshal for str {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        write_sized(writer, WireType::String, self.as_bytes())
    }
}

impl Marshal for String {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        self.as_str().marshal(writer)
    }
}

impl Unmarshal for SkyString {
    fn unmarshal(&mut self, reader: &mut dyn BufRead) -> Result<()> {
        assert_prefix(reader, WireType::String)?;
        let payload = read_sized(reader)?;
        self.0 = String::from_utf8(payload).map_err(|e| invalid(WireType::String, e))?;
        Ok(())
    }
}

// =============================================================================
// Blob
// =============================================================================

/// Binary blob (`?<len>\n<bytes>\n`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Blob(pub Vec<u8>);

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Marshal for Blob {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        write_sized(writer, WireType::Blob, &self.0)
    }
}

impl Unmarshal for Blob {
    fn unmarshal(&mut self, reader: &mut dyn BufRead) -> Result<()> {
        assert_prefix(reader, WireType::Blob)?;
        self.0 = read_sized(reader)?;
        Ok(())
    }
}

// =============================================================================
// JSON
// =============================================================================

/// JSON document (`$<len>\n<json>\n`), typed through serde
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize> Marshal for Json<T> {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        let payload = serde_json::to_vec(&self.0).map_err(|e| SkyError::Encode(e.to_string()))?;
        write_sized(writer, WireType::Json, &payload)
    }
}

impl<T: DeserializeOwned> Unmarshal for Json<T> {
    fn unmarshal(&mut self, reader: &mut dyn BufRead) -> Result<()> {
        assert_prefix(reader, WireType::Json)?;
        let payload = read_sized(reader)?;
        self.0 = serde_json::from_slice(&payload).map_err(|e| invalid(WireType::Json, e))?;
        Ok(())
    }
}

// =============================================================================
// Numeric Scalars
// =============================================================================

macro_rules! scalar_type {
    ($(#[$meta:meta])* $name:ident($inner:ty) => $wire:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
        pub struct $name(pub $inner);

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl Marshal for $name {
            fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
                write_scalar(writer, $wire, self.0)
            }
        }

        impl Unmarshal for $name {
            fn unmarshal(&mut self, reader: &mut dyn BufRead) -> Result<()> {
                assert_prefix(reader, $wire)?;
                let line = read_line(reader)?;
                self.0 = parse_payload($wire, &line)?;
                Ok(())
            }
        }
    };
}

scalar_type! {
    /// Small unsigned integer (`.<u8>\n`)
    SmallInt(u8) => WireType::SmallInt
}

scalar_type! {
    /// Small signed integer (`-<i8>\n`)
    SmallIntSigned(i8) => WireType::SmallIntSigned
}

scalar_type! {
    /// Unsigned integer (`:<u64>\n`)
    Int(u64) => WireType::Int
}

scalar_type! {
    /// Signed integer (`;<i64>\n`)
    IntSigned(i64) => WireType::IntSigned
}

scalar_type! {
    /// Float (`%<f32>\n`)
    Float(f32) => WireType::Float
}

// =============================================================================
// Error
// =============================================================================

impl Marshal for WireError {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        write_scalar(writer, WireType::Error, self.message())
    }
}

impl Unmarshal for WireError {
    fn unmarshal(&mut self, reader: &mut dyn BufRead) -> Result<()> {
        assert_prefix(reader, WireType::Error)?;
        let line = read_line(reader)?;
        *self = WireError::new(String::from_utf8_lossy(&line));
        Ok(())
    }
}

// =============================================================================
// Arrays
// =============================================================================

/// Ordered sequence of strings (`~<count>\n` then `<len>\n<bytes>\n` each)
///
/// Elements of an any-array carry no type prefix of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AnyArray(pub Vec<String>);

impl AnyArray {
    pub fn new<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(elements.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    fn put(&self, buf: &mut bytes::BytesMut) {
        buf.put_u8(WireType::AnyArray.prefix());
        put_length(buf, self.0.len());
        for element in &self.0 {
            put_length(buf, element.len());
            buf.put_slice(element.as_bytes());
            buf.put_u8(DELIMITER);
        }
    }
}

impl Marshal for AnyArray {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        let mut scratch = pool::scratch();
        self.put(&mut scratch);
        writer.write_all(&scratch)?;
        Ok(())
    }
}

impl Unmarshal for AnyArray {
    fn unmarshal(&mut self, reader: &mut dyn BufRead) -> Result<()> {
        assert_prefix(reader, WireType::AnyArray)?;
        let count = read_length(reader)?;
        let mut raw = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            raw.push(read_sized(reader)?);
        }
        // Validate only once the whole array is off the stream.
        self.0 = raw
            .into_iter()
            .map(String::from_utf8)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| invalid(WireType::AnyArray, e))?;
        Ok(())
    }
}

/// Request envelope (`*<count>\n` followed by one any-array per action)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    actions: Vec<AnyArray>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-action query
    pub fn single(action: AnyArray) -> Self {
        Self {
            actions: vec![action],
        }
    }

    pub fn push(&mut self, action: AnyArray) -> &mut Self {
        self.actions.push(action);
        self
    }

    pub fn actions(&self) -> &[AnyArray] {
        &self.actions
    }
}

impl Marshal for Query {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        if self.actions.is_empty() {
            return Err(SkyError::Encode("query has no actions".to_string()));
        }
        let mut scratch = pool::scratch();
        scratch.put_u8(QUERY_PREFIX);
        put_length(&mut scratch, self.actions.len());
        for action in &self.actions {
            action.put(&mut scratch);
        }
        writer.write_all(&scratch)?;
        Ok(())
    }
}
