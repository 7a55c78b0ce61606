//! Skyhash CLI Client
//!
//! Sends one command to a Skytable server and prints the reply.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::CertificateDer;
use skyhash::{dial, Client, Cmd, DialConfig, SkyError, TlsConfig, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// Skyhash CLI
#[derive(Parser, Debug)]
#[command(name = "skyhash-cli")]
#[command(about = "Run a single command against a Skytable server")]
#[command(version)]
struct Args {
    /// Server address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:2003")]
    server: String,

    /// Connect, read and write timeout in milliseconds (0 = none)
    #[arg(short, long, default_value = "10000")]
    timeout_ms: u64,

    /// Connect over TLS
    #[arg(long)]
    tls: bool,

    /// PEM file with the CA certificates to trust (implies --tls)
    #[arg(long)]
    tls_ca: Option<PathBuf>,

    /// Name to verify the server certificate against
    #[arg(long)]
    tls_name: Option<String>,

    /// Username for AUTH LOGIN
    #[arg(short, long, requires = "token")]
    user: Option<String>,

    /// Token for AUTH LOGIN
    #[arg(long, requires = "user")]
    token: Option<String>,

    /// Entity to USE after connecting
    #[arg(short, long)]
    entity: Option<String>,

    /// Command and its arguments, e.g. `SET foo bar`
    #[arg(required = true, trailing_var_arg = true)]
    command: Vec<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,skyhash=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(value) => println!("{}", value),
        Err(SkyError::Discarded(skyhash::Discarded::Peer(err))) => {
            eprintln!("(server error) {}", err);
            std::process::exit(2);
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> skyhash::Result<Value> {
    let config = build_config(&args)?;
    tracing::debug!("Dialing {} (skyhash v{})", args.server, skyhash::VERSION);
    let conn = dial("tcp", &args.server, &config)?;

    let mut command = args.command.into_iter();
    let name = command.next().unwrap_or_default();
    let mut cmd = Cmd::new(None::<Value>, name, command);
    conn.execute(&mut cmd)?;
    conn.close()?;

    cmd.into_inner()
        .ok_or_else(|| SkyError::Framing("no reply received".to_string()))
}

fn build_config(args: &Args) -> skyhash::Result<DialConfig> {
    let timeout = match args.timeout_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };
    let mut builder = DialConfig::builder().timeout(timeout);

    if args.tls || args.tls_ca.is_some() {
        let mut tls = TlsConfig::new(Arc::new(client_config(args.tls_ca.as_deref())?));
        if let Some(name) = &args.tls_name {
            tls = tls.with_server_name(name.clone());
        }
        builder = builder.tls(tls);
    }
    if let (Some(user), Some(token)) = (&args.user, &args.token) {
        builder = builder.auth(user.clone(), token.clone());
    }
    if let Some(entity) = &args.entity {
        builder = builder.database(entity.clone());
    }
    Ok(builder.build())
}

fn client_config(ca: Option<&std::path::Path>) -> skyhash::Result<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    if let Some(path) = ca {
        for cert in CertificateDer::pem_file_iter(path)
            .map_err(|e| SkyError::Config(format!("cannot read {}: {}", path.display(), e)))?
        {
            let cert = cert.map_err(|e| SkyError::Config(format!("bad certificate in {}: {}", path.display(), e)))?;
            roots.add(cert)?;
        }
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(config)
}
