//! Protocol codec
//!
//! Marshal/unmarshal contracts and the shared stream primitives every wire
//! type builds on.
//!
//! ## Wire Format
//!
//! ### Length-prefixed types (string, json, blob)
//! ```text
//! ┌────────────┬──────────────────┬────┬───────────────┬────┐
//! │ Prefix (1) │ Len (ASCII dec.) │ \n │ Payload (len) │ \n │
//! └────────────┴──────────────────┴────┴───────────────┴────┘
//! ```
//!
//! ### Fixed-form scalars (integers, float, response, error)
//! ```text
//! ┌────────────┬───────────────┬────┐
//! │ Prefix (1) │ Payload (text)│ \n │
//! └────────────┴───────────────┴────┘
//! ```
//!
//! ## Framing Guarantee
//! An unmarshal call either consumes its whole message and succeeds, or
//! fails with [`SkyError::Discarded`] after draining the whole message. Any
//! other error means the stream position is lost.

use std::io::{self, BufRead, Read, Write};

use bytes::BufMut;

use crate::error::{Discarded, Result, SkyError};
use super::pool;
use super::prefix::{prefix_name, WireType, DELIMITER};
use super::value::Value;

/// Maximum payload or element count accepted from a length line (512 MB)
pub const MAX_PAYLOAD_SIZE: usize = 512 * 1024 * 1024;

// =============================================================================
// Contracts
// =============================================================================

/// Types that can write themselves as exactly one Skyhash message
pub trait Marshal {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()>;
}

/// Types that can read themselves from exactly one Skyhash message
///
/// Implementations must always consume the whole message, unless the reader
/// itself fails.
pub trait Unmarshal {
    fn unmarshal(&mut self, reader: &mut dyn BufRead) -> Result<()>;
}

impl<T: Marshal + ?Sized> Marshal for &T {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        (**self).marshal(writer)
    }
}

impl<T: Marshal + ?Sized> Marshal for Box<T> {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        (**self).marshal(writer)
    }
}

/// Read a fresh value from the stream
pub fn read_value<T: Unmarshal + Default>(reader: &mut dyn BufRead) -> Result<T> {
    let mut value = T::default();
    value.unmarshal(reader)?;
    Ok(value)
}

/// Marshal a value into a new byte vector
pub fn to_bytes<M: Marshal + ?Sized>(value: &M) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    value.marshal(&mut out)?;
    Ok(out)
}

// =============================================================================
// Prefix Primitives
// =============================================================================

/// Check the next message is of the `expected` type without consuming it.
///
/// If the peer sent an error message instead, it is read off the stream and
/// returned as [`Discarded::Peer`]. Any other known type is drained and
/// reported as [`Discarded::UnexpectedPrefix`].
pub fn peek_prefix(reader: &mut dyn BufRead, expected: WireType) -> Result<()> {
    let byte = peek_byte(reader)?;
    let observed = WireType::from_prefix(byte).ok_or_else(|| {
        SkyError::Framing(format!(
            "unknown prefix {:?} while expecting {}",
            prefix_name(&[byte]),
            expected.name()
        ))
    })?;

    if observed == expected {
        return Ok(());
    }

    if observed == WireType::Error {
        let mut peer = crate::error::WireError::default();
        peer.unmarshal(reader)?;
        return Err(Discarded::Peer(peer).into());
    }

    // Drain the unexpected message. A payload error inside it still leaves
    // the stream framed.
    match Value::decode(reader) {
        Ok(_) => {}
        Err(err) if err.is_discarded() => {}
        Err(err) => return Err(err),
    }
    tracing::trace!("Discarded unexpected {} message", observed.name());

    Err(Discarded::UnexpectedPrefix { expected, observed }.into())
}

/// Like [`peek_prefix`], and consumes the prefix byte on success
pub fn assert_prefix(reader: &mut dyn BufRead, expected: WireType) -> Result<()> {
    peek_prefix(reader, expected)?;
    reader.consume(1);
    Ok(())
}

/// Look at the next byte without consuming it
pub fn peek_byte(reader: &mut dyn BufRead) -> Result<u8> {
    let buf = reader.fill_buf()?;
    match buf.first() {
        Some(byte) => Ok(*byte),
        None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended before message").into()),
    }
}

// =============================================================================
// Body Primitives
// =============================================================================

/// Read up to and including the next delimiter, returning the bytes before it
pub fn read_line(reader: &mut dyn BufRead) -> Result<Vec<u8>> {
    read_line_within(reader, MAX_PAYLOAD_SIZE)
}

fn read_line_within(reader: &mut dyn BufRead, max: usize) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    (&mut *reader).take(max as u64 + 1).read_until(DELIMITER, &mut line)?;
    if line.pop() != Some(DELIMITER) {
        if line.len() >= max {
            return Err(SkyError::Framing(format!("line exceeds {} bytes without delimiter", max)));
        }
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended before delimiter").into());
    }
    Ok(line)
}

/// Read a decimal length line
pub fn read_length(reader: &mut dyn BufRead) -> Result<usize> {
    let line = read_line(reader)?;
    let length = parse_decimal(&line)
        .ok_or_else(|| SkyError::Framing(format!("invalid length line {:?}", String::from_utf8_lossy(&line))))?;
    if length > MAX_PAYLOAD_SIZE {
        return Err(SkyError::Framing(format!(
            "length too large: {} (max {})",
            length, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(length)
}

/// Read a `<len>\n<payload>\n` block, returning the payload
pub fn read_sized(reader: &mut dyn BufRead) -> Result<Vec<u8>> {
    let length = read_length(reader)?;
    // Grows with the bytes that actually arrive, not the announced length
    let mut payload = Vec::new();
    (&mut *reader).take(length as u64).read_to_end(&mut payload)?;
    if payload.len() < length {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended inside payload").into());
    }

    let mut delimiter = [0u8; 1];
    reader.read_exact(&mut delimiter)?;
    if delimiter[0] != DELIMITER {
        return Err(SkyError::Framing(format!(
            "payload of {} bytes not followed by delimiter",
            length
        )));
    }
    Ok(payload)
}

/// Strict ASCII decimal (no sign, no whitespace, non-empty)
fn parse_decimal(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Decode a payload that was already fully read
pub fn parse_payload<T: std::str::FromStr>(wire_type: WireType, payload: &[u8]) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let text = std::str::from_utf8(payload).map_err(|e| invalid(wire_type, e))?;
    text.parse().map_err(|e| invalid(wire_type, e))
}

/// Build a discarded error for a bad payload
pub fn invalid(wire_type: WireType, reason: impl std::fmt::Display) -> SkyError {
    Discarded::InvalidPayload {
        wire_type,
        reason: reason.to_string(),
    }
    .into()
}

// =============================================================================
// Marshal Helpers
// =============================================================================

/// Append a decimal length line (`<n>\n`)
pub fn put_length(buf: &mut bytes::BytesMut, length: usize) {
    put_display(buf, length);
    buf.put_u8(DELIMITER);
}

/// Append the textual form of a value
pub fn put_display(buf: &mut bytes::BytesMut, value: impl std::fmt::Display) {
    use std::fmt::Write as _;
    // Formatting into BytesMut cannot fail.
    let _ = write!(buf, "{}", value);
}

/// Write `<prefix><len>\n<payload>\n` in one call
pub fn write_sized(writer: &mut dyn Write, wire_type: WireType, payload: &[u8]) -> Result<()> {
    let mut scratch = pool::scratch();
    scratch.put_u8(wire_type.prefix());
    put_length(&mut scratch, payload.len());
    scratch.put_slice(payload);
    scratch.put_u8(DELIMITER);
    writer.write_all(&scratch)?;
    Ok(())
}

/// Write `<prefix><text>\n` in one call
pub fn write_scalar(writer: &mut dyn Write, wire_type: WireType, value: impl std::fmt::Display) -> Result<()> {
    let mut scratch = pool::scratch();
    scratch.put_u8(wire_type.prefix());
    put_display(&mut scratch, value);
    if scratch[1..].contains(&DELIMITER) {
        return Err(SkyError::Encode(format!(
            "{} payload contains the delimiter",
            wire_type.name()
        )));
    }
    scratch.put_u8(DELIMITER);
    writer.write_all(&scratch)?;
    Ok(())
}
