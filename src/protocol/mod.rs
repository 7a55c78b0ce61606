//! Protocol Module
//!
//! The Skyhash wire protocol: prefix-tagged, `\n`-delimited messages.
//!
//! ## Wire Types
//! ```text
//! ┌────────┬──────────────────────┬──────────────────────────────┐
//! │ Prefix │ Type                 │ Framing                      │
//! ├────────┼──────────────────────┼──────────────────────────────┤
//! │   +    │ string               │ +<len>\n<utf8>\n             │
//! │   ?    │ blob                 │ ?<len>\n<bytes>\n            │
//! │   $    │ json                 │ $<len>\n<json>\n             │
//! │   .    │ small-integer        │ .<u8>\n                      │
//! │   -    │ small-integer-signed │ -<i8>\n                      │
//! │   :    │ integer              │ :<u64>\n                     │
//! │   ;    │ integer-signed       │ ;<i64>\n                     │
//! │   %    │ float                │ %<f32>\n                     │
//! │   !    │ response             │ !<code>\n                    │
//! │   ~    │ any-array            │ ~<n>\n then n × <len>\n<b>\n │
//! │   1    │ error                │ 1<text>\n                    │
//! └────────┴──────────────────────┴──────────────────────────────┘
//! ```
//!
//! ### Requests
//! Clients wrap actions in a query header: `*<n>\n` followed by `n`
//! any-arrays. `SET xx exo` is sent as `*1\n~3\n3\nSET\n2\nxx\n3\nexo\n`.

mod codec;
mod prefix;
mod response;
mod types;
mod value;

pub mod pool;

pub use codec::{
    assert_prefix, peek_prefix, read_length, read_line, read_sized, read_value, to_bytes, Marshal,
    Unmarshal, MAX_PAYLOAD_SIZE,
};
pub use prefix::{prefix_name, WireType, DELIMITER, QUERY_PREFIX};
pub use response::ResponseCode;
pub use types::{AnyArray, Blob, Float, Int, IntSigned, Json, Query, SkyString, SmallInt, SmallIntSigned};
pub use value::Value;
