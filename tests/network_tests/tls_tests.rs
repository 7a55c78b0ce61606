//! TLS Tests
//!
//! Tests for dialing over TLS against a loopback rustls server with a
//! self-signed certificate.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ClientConfig, RootCertStore, ServerConfig, ServerConnection, StreamOwned};
use skyhash::{dial, Client, Cmd, DialConfig, ResponseCode, SkyError, SkyString, TlsConfig};

struct TlsPeer {
    addr: SocketAddr,
    client: Arc<ClientConfig>,
    server: JoinHandle<Vec<u8>>,
    done: mpsc::Sender<()>,
}

impl TlsPeer {
    /// Wait for the server thread and return what it received
    fn finish(self) -> Vec<u8> {
        drop(self.done);
        self.server.join().unwrap()
    }
}

/// TLS server for `localhost` that completes the handshake, reads `expect`
/// plaintext bytes, answers with `reply`, then waits for the test to end.
fn tls_peer(expect: usize, reply: &'static [u8]) -> TlsPeer {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert = certified.cert.der().clone();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let server_config = ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert.clone()], key)
        .unwrap();

    let mut roots = RootCertStore::empty();
    roots.add(cert).unwrap();
    let client = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (done, done_rx) = mpsc::channel::<()>();

    let server = thread::spawn(move || {
        let (sock, _) = listener.accept().unwrap();
        sock.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let session = ServerConnection::new(Arc::new(server_config)).unwrap();
        let mut tls = StreamOwned::new(session, sock);
        while tls.conn.is_handshaking() {
            if tls.conn.complete_io(&mut tls.sock).is_err() {
                return Vec::new();
            }
        }

        let mut received = vec![0u8; expect];
        tls.read_exact(&mut received).unwrap();
        tls.write_all(reply).unwrap();
        tls.flush().unwrap();
        let _ = done_rx.recv();
        received
    });

    TlsPeer {
        addr,
        client: Arc::new(client),
        server,
        done,
    }
}

fn tls_config(peer: &TlsPeer) -> DialConfig {
    DialConfig::builder()
        .timeout(Duration::from_secs(3))
        .tls(TlsConfig::new(peer.client.clone()).with_server_name("localhost"))
        .build()
}

// =============================================================================
// Dial Tests
// =============================================================================

#[test]
fn test_cmd_over_tls() {
    let request = b"*1\n~3\n3\nSET\n2\nxx\n3\nexo\n";
    let peer = tls_peer(request.len(), b"!0\n");

    let conn = dial("tcp", &peer.addr.to_string(), &tls_config(&peer)).unwrap();
    assert!(conn.raw_stream().is_tls());

    let mut set = Cmd::new(ResponseCode::NotFound, "SET", ["xx", "exo"]);
    conn.execute(&mut set).unwrap();
    assert_eq!(set.into_inner(), ResponseCode::Okay);

    conn.close().unwrap();
    assert!(conn.is_closed());
    assert_eq!(peer.finish(), request);
}

#[test]
fn test_server_name_defaults_to_host() {
    let peer = tls_peer(0, b"+4\nHEY!\n");

    let config = DialConfig::builder()
        .timeout(Duration::from_secs(3))
        .tls(TlsConfig::new(peer.client.clone()))
        .build();
    let addr = format!("localhost:{}", peer.addr.port());
    let conn = dial("tcp4", &addr, &config).unwrap();

    let greeting: SkyString = conn.read().unwrap();
    assert_eq!(greeting.as_str(), "HEY!");
    conn.close().unwrap();
    peer.finish();
}

#[test]
fn test_server_name_mismatch_rejected() {
    let peer = tls_peer(0, b"");

    let config = DialConfig::builder()
        .timeout(Duration::from_secs(3))
        .tls(TlsConfig::new(peer.client.clone()).with_server_name("db.example.com"))
        .build();
    let err = dial("tcp", &peer.addr.to_string(), &config).unwrap_err();

    assert!(err.is_fatal());
    assert!(!matches!(err, SkyError::Config(_)));
    peer.finish();
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_encode_not_blocked_by_pending_decode() {
    let peer = tls_peer(6, b"+2\nok\n");
    let conn = dial("tcp", &peer.addr.to_string(), &tls_config(&peer)).unwrap();

    thread::scope(|scope| {
        let reader = scope.spawn(|| conn.read::<SkyString>());
        thread::sleep(Duration::from_millis(200));

        let started = Instant::now();
        conn.encode(&SkyString::new("hi")).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));

        let reply = reader.join().unwrap().unwrap();
        assert_eq!(reply.as_str(), "ok");
    });

    assert!(!conn.is_closed());
    conn.close().unwrap();
    assert_eq!(peer.finish(), b"+2\nhi\n");
}

#[test]
fn test_close_wakes_blocked_decode() {
    let peer = tls_peer(0, b"");
    let config = DialConfig::builder()
        .timeout(None)
        .tls(TlsConfig::new(peer.client.clone()).with_server_name("localhost"))
        .build();
    let conn = dial("tcp", &peer.addr.to_string(), &config).unwrap();

    thread::scope(|scope| {
        let reader = scope.spawn(|| conn.read::<SkyString>());
        thread::sleep(Duration::from_millis(200));

        let started = Instant::now();
        conn.close().unwrap();
        let result = reader.join().unwrap();
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
    });

    assert!(matches!(conn.read::<SkyString>(), Err(SkyError::ConnectionClosed)));
    peer.finish();
}
