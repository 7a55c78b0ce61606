//! Dynamically typed wire values
//!
//! [`Value::decode`] is the single dispatch from a prefix byte to the
//! matching decode routine.

use std::fmt;
use std::io::{BufRead, Write};

use crate::error::{Result, SkyError, WireError};
use super::codec::{peek_byte, read_value, Marshal, Unmarshal};
use super::prefix::{prefix_name, WireType};
use super::response::ResponseCode;
use super::types::{AnyArray, Blob, Float, Int, IntSigned, Json, SkyString, SmallInt, SmallIntSigned};

/// Any non-error Skyhash value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    SmallInt(u8),
    SmallIntSigned(i8),
    Int(u64),
    IntSigned(i64),
    Float(f32),
    Json(serde_json::Value),
    Blob(Vec<u8>),
    Response(ResponseCode),
    Array(Vec<String>),
}

impl Value {
    /// Decode whatever message comes next.
    ///
    /// A peer error message is returned as a discarded peer error.
    pub fn decode(reader: &mut dyn BufRead) -> Result<Value> {
        let byte = peek_byte(reader)?;
        let wire_type = WireType::from_prefix(byte)
            .ok_or_else(|| SkyError::Framing(format!("unknown prefix {:?}", prefix_name(&[byte]))))?;

        let value = match wire_type {
            WireType::String => Value::String(read_value::<SkyString>(reader)?.0),
            WireType::SmallInt => Value::SmallInt(read_value::<SmallInt>(reader)?.0),
            WireType::SmallIntSigned => Value::SmallIntSigned(read_value::<SmallIntSigned>(reader)?.0),
            WireType::Int => Value::Int(read_value::<Int>(reader)?.0),
            WireType::IntSigned => Value::IntSigned(read_value::<IntSigned>(reader)?.0),
            WireType::Float => Value::Float(read_value::<Float>(reader)?.0),
            WireType::Json => Value::Json(read_value::<Json<serde_json::Value>>(reader)?.0),
            WireType::Blob => Value::Blob(read_value::<Blob>(reader)?.0),
            WireType::Response => Value::Response(read_value::<ResponseCode>(reader)?),
            WireType::AnyArray => Value::Array(read_value::<AnyArray>(reader)?.0),
            WireType::Error => return Err(read_value::<WireError>(reader)?.into()),
        };
        Ok(value)
    }

    /// The wire type this value is sent as
    pub fn wire_type(&self) -> WireType {
        match self {
            Value::String(_) => WireType::String,
            Value::SmallInt(_) => WireType::SmallInt,
            Value::SmallIntSigned(_) => WireType::SmallIntSigned,
            Value::Int(_) => WireType::Int,
            Value::IntSigned(_) => WireType::IntSigned,
            Value::Float(_) => WireType::Float,
            Value::Json(_) => WireType::Json,
            Value::Blob(_) => WireType::Blob,
            Value::Response(_) => WireType::Response,
            Value::Array(_) => WireType::AnyArray,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Any integer variant widened to i128
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Value::SmallInt(n) => Some(n.into()),
            Value::SmallIntSigned(n) => Some(n.into()),
            Value::Int(n) => Some(n.into()),
            Value::IntSigned(n) => Some(n.into()),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<ResponseCode> {
        match self {
            Value::Response(code) => Some(*code),
            _ => None,
        }
    }
}

impl Marshal for Value {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        match self {
            Value::String(s) => s.marshal(writer),
            Value::SmallInt(n) => SmallInt(*n).marshal(writer),
            Value::SmallIntSigned(n) => SmallIntSigned(*n).marshal(writer),
            Value::Int(n) => Int(*n).marshal(writer),
            Value::IntSigned(n) => IntSigned(*n).marshal(writer),
            Value::Float(n) => Float(*n).marshal(writer),
            Value::Json(doc) => Json(doc).marshal(writer),
            Value::Blob(bytes) => super::codec::write_sized(writer, WireType::Blob, bytes),
            Value::Response(code) => code.marshal(writer),
            Value::Array(elements) => AnyArray(elements.clone()).marshal(writer),
        }
    }
}

/// Receives any value; `None` until a message was read
impl Unmarshal for Option<Value> {
    fn unmarshal(&mut self, reader: &mut dyn BufRead) -> Result<()> {
        *self = Some(Value::decode(reader)?);
        Ok(())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::SmallInt(n) => write!(f, "{}", n),
            Value::SmallIntSigned(n) => write!(f, "{}", n),
            Value::Int(n) => write!(f, "{}", n),
            Value::IntSigned(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Json(doc) => write!(f, "{}", doc),
            Value::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Response(code) => write!(f, "({})", code),
            Value::Array(elements) => {
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {:?}", i + 1, element)?;
                }
                Ok(())
            }
        }
    }
}
