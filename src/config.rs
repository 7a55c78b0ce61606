//! Configuration for dialing a Skyhash server
//!
//! Centralized dial options with sensible defaults.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for connect, read and write
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default TCP keepalive probe period
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(10);

/// Options applied by [`crate::network::dial`]
#[derive(Debug, Clone)]
pub struct DialConfig {
    // -------------------------------------------------------------------------
    // Timeouts (None = unbounded)
    // -------------------------------------------------------------------------
    /// Bound on establishing the transport
    pub connect_timeout: Option<Duration>,

    /// Applied to every read on the connection
    pub read_timeout: Option<Duration>,

    /// Applied to every write on the connection
    pub write_timeout: Option<Duration>,

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------
    /// TCP keepalive period (None disables keepalive)
    pub keepalive: Option<Duration>,

    /// Use TLS instead of plaintext when set
    pub tls: Option<TlsConfig>,

    // -------------------------------------------------------------------------
    // Handshake
    // -------------------------------------------------------------------------
    /// Credentials sent with `AUTH LOGIN` after connecting
    pub auth: Option<Credentials>,

    /// Entity selected with `USE` after connecting
    pub database: Option<String>,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_TIMEOUT),
            read_timeout: Some(DEFAULT_TIMEOUT),
            write_timeout: Some(DEFAULT_TIMEOUT),
            keepalive: Some(DEFAULT_KEEPALIVE),
            tls: None,
            auth: None,
            database: None,
        }
    }
}

impl DialConfig {
    /// Create a new config builder
    pub fn builder() -> DialConfigBuilder {
        DialConfigBuilder::default()
    }
}

/// Builder for DialConfig
#[derive(Default)]
pub struct DialConfigBuilder {
    config: DialConfig,
}

impl DialConfigBuilder {
    /// Set connect, read and write timeouts to the same value
    pub fn timeout(self, timeout: impl Into<Option<Duration>>) -> Self {
        let timeout = timeout.into();
        self.connect_timeout(timeout)
            .read_timeout(timeout)
            .write_timeout(timeout)
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.config.connect_timeout = nonzero(timeout.into());
        self
    }

    /// Set the read timeout
    pub fn read_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.config.read_timeout = nonzero(timeout.into());
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.config.write_timeout = nonzero(timeout.into());
        self
    }

    /// Set the keepalive period
    pub fn keepalive(mut self, period: impl Into<Option<Duration>>) -> Self {
        self.config.keepalive = nonzero(period.into());
        self
    }

    /// Connect over TLS
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.config.tls = Some(tls);
        self
    }

    /// Authenticate after connecting
    pub fn auth(mut self, username: impl Into<String>, token: impl Into<String>) -> Self {
        self.config.auth = Some(Credentials {
            username: username.into(),
            token: token.into(),
        });
        self
    }

    /// Switch to an entity after connecting
    pub fn database(mut self, entity: impl Into<String>) -> Self {
        self.config.database = Some(entity.into());
        self
    }

    pub fn build(self) -> DialConfig {
        self.config
    }
}

/// A zero duration means unset
pub(crate) fn nonzero(duration: Option<Duration>) -> Option<Duration> {
    duration.filter(|d| !d.is_zero())
}

/// Login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// TLS settings for the transport
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// rustls client configuration (roots, client auth, ALPN)
    pub client: Arc<rustls::ClientConfig>,

    /// Name to verify the server certificate against. Defaults to the host
    /// part of the dial address.
    pub server_name: Option<String>,
}

impl TlsConfig {
    pub fn new(client: Arc<rustls::ClientConfig>) -> Self {
        Self {
            client,
            server_name: None,
        }
    }

    /// Verify the certificate against `name` instead of the dialed host
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}
