//! Framed Connection
//!
//! Whole-message encode/decode over a single transport.

use std::io::{BufReader, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::action::{Action, Client};
use crate::error::{Result, SkyError};
use crate::protocol::pool;
use crate::protocol::{Marshal, Unmarshal};
use super::transport::{SharedTransport, Transport};

/// A client connection to a single Skyhash server
///
/// ## Concurrency
/// The buffered reader and writer are locked independently: one `encode`
/// and one `decode` may run at the same time from different threads.
/// [`Client::execute`] is not coordinated with direct `encode`/`decode`
/// calls; callers keep one access pattern per connection.
///
/// ## Failure
/// Any fatal error (transport, timeout, lost framing) shuts the transport
/// down. Every later call fails with [`SkyError::ConnectionClosed`].
pub struct Connection {
    /// Underlying stream, shared by reader and writer
    transport: Arc<Transport>,

    /// Buffered read side
    reader: Mutex<BufReader<SharedTransport>>,

    /// Buffered write side
    writer: Mutex<BufWriter<SharedTransport>>,

    /// Set once the transport has been shut down
    closed: AtomicBool,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Wrap an open transport. The transport must not be used directly
    /// afterwards.
    pub fn new(transport: Transport) -> Self {
        let peer_addr = transport
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let transport = Arc::new(transport);
        Self {
            reader: Mutex::new(BufReader::new(SharedTransport(Arc::clone(&transport)))),
            writer: Mutex::new(BufWriter::new(SharedTransport(Arc::clone(&transport)))),
            transport,
            closed: AtomicBool::new(false),
            peer_addr,
        }
    }

    /// Send one complete message and flush it.
    ///
    /// The message is assembled before anything is written, so a value that
    /// fails to marshal leaves the stream untouched.
    pub fn encode(&self, value: &dyn Marshal) -> Result<()> {
        self.ensure_open()?;

        let mut staged = pool::scratch();
        value.marshal(&mut staged)?;

        let mut writer = self.writer.lock();
        let result = writer
            .write_all(&staged)
            .and_then(|()| writer.flush())
            .map_err(SkyError::from);
        tracing::trace!("Encoded {} bytes to {}", staged.len(), self.peer_addr);
        self.check(result)
    }

    /// Read one complete message into `value`
    pub fn decode(&self, value: &mut dyn Unmarshal) -> Result<()> {
        self.ensure_open()?;

        let mut reader = self.reader.lock();
        let result = value.unmarshal(&mut *reader);
        if let Err(ref e) = result {
            if e.is_discarded() {
                tracing::debug!("Discarded message from {}: {}", self.peer_addr, e);
            }
        }
        self.check(result)
    }

    /// Decode a fresh value of type `T`
    pub fn read<T: Unmarshal + Default>(&self) -> Result<T> {
        let mut value = T::default();
        self.decode(&mut value)?;
        Ok(value)
    }

    /// The underlying stream, for inspection only.
    ///
    /// Reading, writing or shutting it down bypasses the framing.
    pub fn raw_stream(&self) -> &Transport {
        &self.transport
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shut the transport down. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!("Closing connection to {}", self.peer_addr);
        match self.transport.shutdown() {
            Ok(()) => Ok(()),
            // Already torn down by the peer.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(SkyError::ConnectionClosed);
        }
        Ok(())
    }

    /// Close on fatal errors, pass everything through
    fn check<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            if e.is_fatal() && !self.is_closed() {
                tracing::warn!("Closing connection to {} after error: {}", self.peer_addr, e);
                if let Err(close_err) = self.close() {
                    tracing::debug!("Shutdown of {} failed: {}", self.peer_addr, close_err);
                }
            }
        }
        result
    }
}

impl Client for Connection {
    fn execute(&self, action: &mut dyn Action) -> Result<()> {
        action.run(self)
    }

    fn close(&self) -> Result<()> {
        Connection::close(self)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer_addr", &self.peer_addr)
            .field("tls", &self.transport.is_tls())
            .field("closed", &self.is_closed())
            .finish()
    }
}
