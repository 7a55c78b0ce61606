//! # Skyhash
//!
//! A blocking client for the Skyhash protocol spoken by Skytable:
//! - Prefix-tagged, delimiter-framed wire codec
//! - Framed connections that never lose message boundaries on errors
//! - Dialing over TCP or TLS with timeouts and keepalive
//! - Generic command actions
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Action / Cmd (request + reply)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Framed Connection                          │
//! │          (BufWriter: encode  |  BufReader: decode)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Codec    │          │  Transport  │
//!   │ (wire types)│          │ (TCP / TLS) │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │ Scratch Pool│
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod action;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use action::{Action, Client, Cmd, CmdAction};
pub use config::{Credentials, DialConfig, TlsConfig};
pub use error::{Discarded, Result, SkyError, WireError};
pub use network::{dial, Connection, Transport};
pub use protocol::{
    AnyArray, Blob, Float, Int, IntSigned, Json, Marshal, Query, ResponseCode, SkyString, SmallInt,
    SmallIntSigned, Unmarshal, Value, WireType,
};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
