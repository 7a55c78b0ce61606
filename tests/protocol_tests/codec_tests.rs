//! Codec Tests
//!
//! Tests for marshaling and unmarshaling each wire type, and for the
//! framing guarantees on error paths.

use std::io::{self, BufRead, Cursor, Write};

use serde::{Deserialize, Serialize};
use skyhash::protocol::{read_value, to_bytes};
use skyhash::{
    AnyArray, Blob, Discarded, Float, Int, IntSigned, Json, Marshal, Query, ResponseCode, SkyError,
    SkyString, SmallInt, SmallIntSigned, Unmarshal, WireError, WireType,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn round_trip<T>(value: &T) -> T
where
    T: Marshal + Unmarshal + Default,
{
    let bytes = to_bytes(value).unwrap();
    let mut reader = Cursor::new(bytes.clone());
    let decoded: T = read_value(&mut reader).unwrap();
    assert_eq!(reader.position() as usize, bytes.len(), "message not fully consumed");
    decoded
}

/// Reader positioned at `first`, followed by a `+4\nnext\n` string
fn stream_of(first: &[u8]) -> Cursor<Vec<u8>> {
    let mut bytes = first.to_vec();
    bytes.extend_from_slice(b"+4\nnext\n");
    Cursor::new(bytes)
}

fn assert_next_is_marker(reader: &mut Cursor<Vec<u8>>) {
    let next: SkyString = read_value(reader).unwrap();
    assert_eq!(next.as_str(), "next");
    assert!(reader.fill_buf().unwrap().is_empty());
}

/// Writer that always fails
struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// String Tests
// =============================================================================

#[test]
fn test_string_wire_bytes() {
    let bytes = to_bytes(&SkyString::from("SET")).unwrap();
    assert_eq!(bytes, b"+3\nSET\n");
}

#[test]
fn test_string_empty() {
    let bytes = to_bytes(&SkyString::default()).unwrap();
    assert_eq!(bytes, b"+0\n\n");
    assert_eq!(round_trip(&SkyString::default()), SkyString::default());
}

#[test]
fn test_string_single_byte() {
    let value = SkyString::from("x");
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_string_multi_digit_length() {
    let value = SkyString::new("a".repeat(128));
    let bytes = to_bytes(&value).unwrap();
    assert!(bytes.starts_with(b"+128\n"));
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_string_length_counts_bytes() {
    let value = SkyString::from("héllo");
    let bytes = to_bytes(&value).unwrap();
    assert!(bytes.starts_with(b"+6\n"));
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_string_containing_delimiter() {
    let value = SkyString::from("line one\nline two");
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_invalid_utf8_string_is_discarded() {
    let mut reader = stream_of(b"+2\n\xff\xfe\n");
    let err = read_value::<SkyString>(&mut reader).unwrap_err();

    assert!(matches!(
        err,
        SkyError::Discarded(Discarded::InvalidPayload { wire_type: WireType::String, .. })
    ));
    assert_next_is_marker(&mut reader);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_error_round_trip() {
    let value = WireError::new("Unknown action");
    assert_eq!(to_bytes(&value).unwrap(), b"1Unknown action\n");
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_error_empty_round_trip() {
    let value = WireError::default();
    assert_eq!(to_bytes(&value).unwrap(), b"1\n");
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_error_with_delimiter_rejected() {
    let mut out = Vec::new();
    let err = WireError::new("two\nlines").marshal(&mut out).unwrap_err();
    assert!(matches!(err, SkyError::Encode(_)));
    assert!(out.is_empty());
}

// =============================================================================
// Scalar Tests
// =============================================================================

#[test]
fn test_integer_wire_bytes() {
    assert_eq!(to_bytes(&SmallInt(7)).unwrap(), b".7\n");
    assert_eq!(to_bytes(&SmallIntSigned(-7)).unwrap(), b"--7\n");
    assert_eq!(to_bytes(&Int(18_446_744_073_709_551_615)).unwrap(), b":18446744073709551615\n");
    assert_eq!(to_bytes(&IntSigned(-42)).unwrap(), b";-42\n");
}

#[test]
fn test_integer_round_trips() {
    assert_eq!(round_trip(&SmallInt(255)), SmallInt(255));
    assert_eq!(round_trip(&SmallIntSigned(-128)), SmallIntSigned(-128));
    assert_eq!(round_trip(&Int(1 << 40)), Int(1 << 40));
    assert_eq!(round_trip(&IntSigned(i64::MIN)), IntSigned(i64::MIN));
}

#[test]
fn test_float_round_trip() {
    assert_eq!(to_bytes(&Float(1.5)).unwrap(), b"%1.5\n");
    assert_eq!(round_trip(&Float(-0.25)), Float(-0.25));
}

#[test]
fn test_integer_out_of_range_is_discarded() {
    let mut reader = stream_of(b".300\n");
    let err = read_value::<SmallInt>(&mut reader).unwrap_err();

    assert!(err.is_discarded());
    assert_next_is_marker(&mut reader);
}

#[test]
fn test_response_code_round_trip() {
    assert_eq!(to_bytes(&ResponseCode::NotFound).unwrap(), b"!1\n");
    assert_eq!(round_trip(&ResponseCode::WrongType), ResponseCode::WrongType);
}

#[test]
fn test_unknown_response_code_is_discarded() {
    let mut reader = stream_of(b"!42\n");
    let err = read_value::<ResponseCode>(&mut reader).unwrap_err();

    assert!(err.is_discarded());
    assert_next_is_marker(&mut reader);
}

// =============================================================================
// Blob / JSON Tests
// =============================================================================

#[test]
fn test_blob_binary_round_trip() {
    let value = Blob((0..=255).collect());
    let bytes = to_bytes(&value).unwrap();
    assert!(bytes.starts_with(b"?256\n"));
    assert_eq!(round_trip(&value), value);
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    visits: u32,
}

#[test]
fn test_json_round_trip() {
    let value = Json(Profile {
        name: "sky".to_string(),
        visits: 3,
    });
    let bytes = to_bytes(&value).unwrap();
    assert_eq!(bytes, b"$25\n{\"name\":\"sky\",\"visits\":3}\n");
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_malformed_json_is_discarded() {
    let mut reader = stream_of(b"$3\n{x}\n");
    let err = read_value::<Json<Profile>>(&mut reader).unwrap_err();

    assert!(matches!(
        err,
        SkyError::Discarded(Discarded::InvalidPayload { wire_type: WireType::Json, .. })
    ));
    assert_next_is_marker(&mut reader);
}

// =============================================================================
// Array / Query Tests
// =============================================================================

#[test]
fn test_any_array_wire_bytes() {
    let value = AnyArray::new(["SET", "xx", "exo"]);
    assert_eq!(to_bytes(&value).unwrap(), b"~3\n3\nSET\n2\nxx\n3\nexo\n");
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_any_array_empty() {
    let value = AnyArray::default();
    assert_eq!(to_bytes(&value).unwrap(), b"~0\n");
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_any_array_bad_element_still_drained() {
    let mut reader = stream_of(b"~2\n1\n\xff\n2\nok\n");
    let err = read_value::<AnyArray>(&mut reader).unwrap_err();

    assert!(err.is_discarded());
    assert_next_is_marker(&mut reader);
}

#[test]
fn test_reference_request_bytes() {
    let query = Query::single(AnyArray::new(["SET", "xx", "exo"]));
    assert_eq!(to_bytes(&query).unwrap(), b"*1\n~3\n3\nSET\n2\nxx\n3\nexo\n");
}

#[test]
fn test_empty_query_rejected() {
    let mut out = Vec::new();
    assert!(matches!(Query::new().marshal(&mut out), Err(SkyError::Encode(_))));
    assert!(out.is_empty());
}

#[test]
fn test_multi_action_query() {
    let mut query = Query::new();
    query.push(AnyArray::new(["GET", "a"])).push(AnyArray::new(["HEYA"]));
    assert_eq!(to_bytes(&query).unwrap(), b"*2\n~2\n3\nGET\n1\na\n~1\n4\nHEYA\n");
}

// =============================================================================
// Framing Guarantee Tests
// =============================================================================

#[test]
fn test_prefix_mismatch_drains_scalar() {
    let mut reader = stream_of(b":12345\n");
    let err = read_value::<SkyString>(&mut reader).unwrap_err();

    match err {
        SkyError::Discarded(Discarded::UnexpectedPrefix { expected, observed }) => {
            assert_eq!(expected, WireType::String);
            assert_eq!(observed, WireType::Int);
        }
        other => panic!("expected unexpected-prefix error, got {:?}", other),
    }
    assert_next_is_marker(&mut reader);
}

#[test]
fn test_prefix_mismatch_drains_array() {
    let mut reader = stream_of(b"~2\n1\na\n3\nb\nc\n");
    let err = read_value::<Int>(&mut reader).unwrap_err();

    assert!(err.is_discarded());
    assert!(err.peer_error().is_none());
    assert_next_is_marker(&mut reader);
}

#[test]
fn test_prefix_mismatch_with_bad_payload_still_drained() {
    let mut reader = stream_of(b"+1\n\xff\n");
    let err = read_value::<Blob>(&mut reader).unwrap_err();

    assert!(matches!(
        err,
        SkyError::Discarded(Discarded::UnexpectedPrefix { observed: WireType::String, .. })
    ));
    assert_next_is_marker(&mut reader);
}

#[test]
fn test_peer_error_intercepted() {
    let mut reader = stream_of(b"1Wrong password\n");
    let err = read_value::<SkyString>(&mut reader).unwrap_err();

    assert_eq!(err.peer_error(), Some(&WireError::new("Wrong password")));
    assert_eq!(err.to_string(), "Wrong password");
    assert_next_is_marker(&mut reader);
}

#[test]
fn test_unknown_prefix_is_fatal() {
    let mut reader = stream_of(b"#oops\n");
    let err = read_value::<SkyString>(&mut reader).unwrap_err();

    assert!(err.is_fatal());
    assert!(!err.is_discarded());
}

#[test]
fn test_truncated_message_is_fatal() {
    let mut reader = Cursor::new(b"+10\nshort".to_vec());
    let err = read_value::<SkyString>(&mut reader).unwrap_err();

    match err {
        SkyError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("expected EOF, got {:?}", other),
    }
}

// =============================================================================
// Scratch Buffer Tests
// =============================================================================

#[test]
fn test_scratch_reusable_after_failed_write() {
    let err = SkyString::from("lost").marshal(&mut BrokenPipe).unwrap_err();
    assert!(matches!(err, SkyError::Io(_)));

    // The released buffer must not leak bytes into the next message.
    assert_eq!(to_bytes(&SkyString::from("ok")).unwrap(), b"+2\nok\n");
    assert_eq!(to_bytes(&Int(1)).unwrap(), b":1\n");
}

#[test]
fn test_scratch_shared_across_threads() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                for j in 0..200 {
                    let text = format!("t{}-{}", i, j);
                    let expected = format!("+{}\n{}\n", text.len(), text);
                    assert_eq!(to_bytes(&SkyString::new(text)).unwrap(), expected.as_bytes());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
