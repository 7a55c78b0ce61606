//! Byte stream transports
//!
//! A [`Transport`] is shared between a connection's buffered reader and
//! buffered writer, so reads and writes go through `&Transport`.
//!
//! ## TLS
//! Socket I/O never happens while the rustls session is locked. Reads pull
//! ciphertext from the socket first and then feed it to the session; writes
//! encrypt under the lock and send afterwards. A blocked read therefore
//! never holds up a write, and shutdown always reaches the socket.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;

use parking_lot::Mutex;
use rustls::ClientConnection;

/// Largest TLS record on the wire (16 KiB plaintext plus expansion)
const TLS_RECORD_SIZE: usize = 16 * 1024 + 2048;

/// The stream underneath a framed connection
pub enum Transport {
    Tcp(TcpStream),
    Tls(TlsTransport),
}

impl Transport {
    /// Address of the server
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket().peer_addr()
    }

    /// Local address of the socket
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket().local_addr()
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }

    /// The TCP socket underneath
    pub fn socket(&self) -> &TcpStream {
        match self {
            Transport::Tcp(stream) => stream,
            Transport::Tls(tls) => &tls.sock,
        }
    }

    /// Shut both directions down. Blocked reads on other threads return EOF.
    pub fn shutdown(&self) -> io::Result<()> {
        match self {
            Transport::Tcp(stream) => stream.shutdown(Shutdown::Both),
            Transport::Tls(tls) => tls.shutdown(),
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Tcp(stream) => f.debug_tuple("Tcp").field(stream).finish(),
            Transport::Tls(tls) => f.debug_tuple("Tls").field(&tls.sock).finish(),
        }
    }
}

impl Read for &Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            Transport::Tcp(stream) => (&*stream).read(buf),
            Transport::Tls(tls) => tls.read(buf),
        }
    }
}

impl Write for &Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            Transport::Tcp(stream) => (&*stream).write(buf),
            Transport::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            Transport::Tcp(stream) => (&*stream).flush(),
            Transport::Tls(tls) => tls.flush(),
        }
    }
}

// =============================================================================
// TLS
// =============================================================================

/// A rustls client session over a TCP socket whose handshake has completed
pub struct TlsTransport {
    /// Session state, locked only while no socket call is in progress
    session: Mutex<ClientConnection>,

    /// Read side of the socket
    sock: TcpStream,

    /// Write side; held across a send so records leave in session order
    write_half: Mutex<TcpStream>,

    /// Ciphertext read from the socket but not yet taken by the session
    backlog: Mutex<Vec<u8>>,
}

impl TlsTransport {
    pub fn new(session: ClientConnection, sock: TcpStream) -> io::Result<Self> {
        let write_half = sock.try_clone()?;
        Ok(Self {
            session: Mutex::new(session),
            sock,
            write_half: Mutex::new(write_half),
            backlog: Mutex::new(Vec::new()),
        })
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let wants_write = {
                let mut session = self.session.lock();
                match session.reader().read(buf) {
                    Ok(n) => return Ok(n),
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(e) => return Err(e),
                }

                // Plaintext is drained, so the session has room for one more feed
                let mut backlog = self.backlog.lock();
                if backlog.is_empty() {
                    None
                } else {
                    let mut ciphertext = &backlog[..];
                    session.read_tls(&mut ciphertext)?;
                    let consumed = backlog.len() - ciphertext.len();
                    backlog.drain(..consumed);
                    Some(process(&mut session)?)
                }
            };

            match wants_write {
                Some(true) => self.send_pending()?,
                Some(false) => {}
                None => self.fill_backlog()?,
            }
        }
    }

    /// Block on the socket for more ciphertext
    fn fill_backlog(&self) -> io::Result<()> {
        let mut incoming = vec![0u8; TLS_RECORD_SIZE];
        let n = (&self.sock).read(&mut incoming)?;
        if n == 0 {
            // Let the session decide between a clean close and a truncation
            let mut session = self.session.lock();
            session.read_tls(&mut io::empty())?;
            process(&mut session)?;
            return Ok(());
        }
        self.backlog.lock().extend_from_slice(&incoming[..n]);
        Ok(())
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut sock = self.write_half.lock();
        let n = self.session.lock().writer().write(buf)?;
        self.drain_into(&mut sock)?;
        Ok(n)
    }

    fn flush(&self) -> io::Result<()> {
        let mut sock = self.write_half.lock();
        self.drain_into(&mut sock)?;
        sock.flush()
    }

    fn send_pending(&self) -> io::Result<()> {
        let mut sock = self.write_half.lock();
        self.drain_into(&mut sock)
    }

    /// Move every pending record from the session onto the socket
    fn drain_into(&self, sock: &mut TcpStream) -> io::Result<()> {
        loop {
            let mut records = Vec::new();
            {
                let mut session = self.session.lock();
                if !session.wants_write() {
                    return Ok(());
                }
                session.write_tls(&mut records)?;
            }
            sock.write_all(&records)?;
        }
    }

    fn shutdown(&self) -> io::Result<()> {
        // A writer blocked on the socket keeps the write half; skip the
        // close_notify rather than wait for it.
        if let Some(mut sock) = self.write_half.try_lock() {
            self.session.lock().send_close_notify();
            let _ = self.drain_into(&mut sock);
        }
        self.sock.shutdown(Shutdown::Both)
    }
}

/// Decrypt buffered records; returns whether the session has records of
/// its own to send
fn process(session: &mut ClientConnection) -> io::Result<bool> {
    session
        .process_new_packets()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(session.wants_write())
}

/// Owned handle used by the buffered reader and writer
pub(crate) struct SharedTransport(pub(crate) Arc<Transport>);

impl Read for SharedTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self.0).read(buf)
    }
}

impl Write for SharedTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self.0).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self.0).flush()
    }
}
