//! Dial / Setup
//!
//! Builds a ready-to-use [`Connection`] from a network kind and address.
//!
//! ## Steps
//! 1. Resolve the address and connect (bounded by the connect timeout)
//! 2. Enable TCP keepalive; a failure tears the socket down
//! 3. Apply read/write timeouts
//! 4. Complete the TLS handshake when configured
//! 5. Run the AUTH / USE handshake when configured

use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::ClientConnection;
use socket2::{SockRef, TcpKeepalive};

use crate::action::{Client, Cmd};
use crate::config::{nonzero, DialConfig, TlsConfig};
use crate::error::{Result, SkyError};
use crate::protocol::ResponseCode;
use super::connection::Connection;
use super::transport::{TlsTransport, Transport};

/// Constructor contract for anything that hands out connections (e.g. a
/// future pool): network kind and address in, ready connection out.
pub type ConnectFn = fn(&str, &str) -> Result<Connection>;

/// [`ConnectFn`] using [`DialConfig::default`]
pub fn default_connect(network: &str, addr: &str) -> Result<Connection> {
    dial(network, addr, &DialConfig::default())
}

/// Network kinds accepted by [`dial`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Network {
    Tcp,
    Tcp4,
    Tcp6,
}

impl Network {
    fn parse(network: &str) -> Result<Self> {
        match network {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            other => Err(SkyError::Config(format!("unsupported network {:?}", other))),
        }
    }

    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Network::Tcp => true,
            Network::Tcp4 => addr.is_ipv4(),
            Network::Tcp6 => addr.is_ipv6(),
        }
    }
}

/// Connect to a Skyhash server
pub fn dial(network: &str, addr: &str, config: &DialConfig) -> Result<Connection> {
    let network = Network::parse(network)?;
    let stream = connect(network, addr, nonzero(config.connect_timeout))?;
    tracing::debug!("Connected to {}", addr);

    let transport = establish(stream, addr, config, enable_keepalive)?;
    let conn = Connection::new(transport);

    if let Err(e) = handshake(&conn, config) {
        tracing::warn!("Handshake with {} failed: {}", addr, e);
        let _ = conn.close();
        return Err(e);
    }
    Ok(conn)
}

fn connect(network: Network, addr: &str, timeout: Option<Duration>) -> Result<TcpStream> {
    let mut last_err = None;

    for socket_addr in addr.to_socket_addrs()?.filter(|a| network.accepts(a)) {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&socket_addr, timeout),
            None => TcpStream::connect(socket_addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", socket_addr, e);
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(e) => Err(e.into()),
        None => Err(SkyError::Config(format!("{} resolved to no usable address", addr))),
    }
}

/// Turn a connected socket into a transport. The socket is shut down on
/// any failure.
pub(crate) fn establish<K>(
    stream: TcpStream,
    addr: &str,
    config: &DialConfig,
    keepalive: K,
) -> Result<Transport>
where
    K: FnOnce(&TcpStream, Duration) -> io::Result<()>,
{
    match configure(&stream, config, keepalive) {
        Ok(()) => {}
        Err(e) => {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(e);
        }
    }

    match &config.tls {
        None => Ok(Transport::Tcp(stream)),
        Some(tls) => {
            let shutdown_handle = stream.try_clone()?;
            wrap_tls(stream, addr, tls).map_err(|e| {
                let _ = shutdown_handle.shutdown(Shutdown::Both);
                e
            })
        }
    }
}

fn configure<K>(stream: &TcpStream, config: &DialConfig, keepalive: K) -> Result<()>
where
    K: FnOnce(&TcpStream, Duration) -> io::Result<()>,
{
    if let Some(period) = nonzero(config.keepalive) {
        keepalive(stream, period)?;
    }

    // Disable Nagle's algorithm: every message is flushed whole
    stream.set_nodelay(true)?;
    stream.set_read_timeout(nonzero(config.read_timeout))?;
    stream.set_write_timeout(nonzero(config.write_timeout))?;
    Ok(())
}

/// Enable TCP keepalive: the first probe after `period` of idleness, then
/// one probe every `period`
pub fn enable_keepalive(stream: &TcpStream, period: Duration) -> io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(period).with_interval(period);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

fn wrap_tls(mut stream: TcpStream, addr: &str, tls: &TlsConfig) -> Result<Transport> {
    let name = match &tls.server_name {
        Some(name) => name.clone(),
        None => host_of(addr).to_string(),
    };
    let server_name = ServerName::try_from(name.clone())
        .map_err(|e| SkyError::Config(format!("invalid TLS server name {:?}: {}", name, e)))?;

    let mut session = ClientConnection::new(tls.client.clone(), server_name)?;
    while session.is_handshaking() {
        session.complete_io(&mut stream)?;
    }
    tracing::debug!("TLS session established with {}", name);

    Ok(Transport::Tls(TlsTransport::new(session, stream)?))
}

/// Host part of `host:port`, without IPv6 brackets
pub(crate) fn host_of(addr: &str) -> &str {
    let host = match addr.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => addr,
    };
    host.trim_start_matches('[').trim_end_matches(']')
}

fn handshake(conn: &Connection, config: &DialConfig) -> Result<()> {
    if let Some(auth) = &config.auth {
        let mut login = Cmd::new(
            ResponseCode::default(),
            "AUTH",
            ["LOGIN", auth.username.as_str(), auth.token.as_str()],
        );
        conn.execute(&mut login)?;
        expect_okay("AUTH", login.into_inner())?;
        tracing::debug!("Authenticated as {}", auth.username);
    }

    if let Some(entity) = &config.database {
        let mut select = Cmd::new(ResponseCode::default(), "USE", [entity.as_str()]);
        conn.execute(&mut select)?;
        expect_okay("USE", select.into_inner())?;
        tracing::debug!("Using entity {}", entity);
    }
    Ok(())
}

fn expect_okay(action: &str, code: ResponseCode) -> Result<()> {
    if code.is_okay() {
        Ok(())
    } else {
        Err(SkyError::Handshake(format!("{} returned {}", action, code)))
    }
}
