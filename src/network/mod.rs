//! Network Module
//!
//! Framed connections over TCP or TLS.
//!
//! ## Architecture
//! - One [`Connection`] per transport stream, no multiplexing
//! - Independent buffered reader and writer per connection
//! - [`dial`] applies timeouts, keepalive, TLS and the login handshake

mod connection;
mod dial;
mod transport;

pub use connection::Connection;
pub use dial::{default_connect, dial, enable_keepalive, ConnectFn};
pub use transport::{TlsTransport, Transport};
