// Channel construction for the evaluation service.
//
// The endpoint scheme picks the transport: `http` is plaintext h2c,
// `https` is TLS (optionally trusting an extra CA), `unix` dials a local
// socket. Channels connect lazily, so building one never touches the
// network and only fails on configuration problems.

use std::path::{Path, PathBuf};
use std::time::Duration;

use percent_encoding::percent_decode_str;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use url::Url;

use crate::error::Error;

/// How to reach the evaluation server.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// `http://host:port`, `https://host:port`, or `unix:///path/to.sock`.
    pub uri: String,
    /// Extra CA certificate (PEM) trusted for this channel only.
    pub ca_cert: Option<PathBuf>,
    /// Upper bound on establishing the underlying connection.
    pub connect_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:8013".into(),
            ca_cert: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Transport selected from the endpoint scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// Cleartext HTTP/2 to `authority` (`scheme://host:port`).
    Plaintext { authority: String },
    /// HTTP/2 over TLS to `authority`, verifying against `domain`.
    Tls { authority: String, domain: String },
    /// Unix domain socket at `path`.
    LocalSocket { path: PathBuf },
}

impl EndpointConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    /// Work out which transport the configured URI asks for.
    pub fn transport(&self) -> Result<TransportKind, Error> {
        let url = Url::parse(&self.uri)?;

        match url.scheme() {
            "unix" => Ok(TransportKind::LocalSocket {
                path: socket_path(&url)?,
            }),
            scheme @ ("http" | "https") => {
                let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;
                let port = url
                    .port_or_known_default()
                    .ok_or(url::ParseError::InvalidPort)?;
                let authority = format!("{scheme}://{host}:{port}");

                if scheme == "https" {
                    Ok(TransportKind::Tls {
                        authority,
                        domain: host.trim_start_matches('[').trim_end_matches(']').into(),
                    })
                } else {
                    Ok(TransportKind::Plaintext { authority })
                }
            }
            other => Err(Error::UnsupportedScheme {
                scheme: other.into(),
            }),
        }
    }
}

/// The socket path of a `unix:` URI, percent-decoded. Only an empty
/// authority or `localhost` is accepted: `unix://run/flagd.sock` would
/// otherwise silently dial `/flagd.sock`.
fn socket_path(url: &Url) -> Result<PathBuf, Error> {
    if let Some(host) = url.host_str() {
        if !host.is_empty() && host != "localhost" {
            return Err(Error::InvalidSocketPath {
                reason: format!(
                    "'{}' has host '{host}'; use unix:///absolute/path",
                    url.as_str()
                ),
            });
        }
    }

    let path = percent_decode_str(url.path())
        .decode_utf8()
        .map_err(|e| Error::InvalidSocketPath {
            reason: format!("path is not valid UTF-8 after decoding: {e}"),
        })?;
    if !path.starts_with('/') || path == "/" {
        return Err(Error::InvalidSocketPath {
            reason: format!("'{}' does not name an absolute socket path", url.as_str()),
        });
    }
    Ok(PathBuf::from(path.as_ref()))
}

/// Build a lazily-connecting [`Channel`] for the given endpoint.
///
/// Fails fast on configuration problems: a CA path that does not exist, a
/// certificate tonic cannot load, an unknown scheme, or a local socket on
/// a platform without Unix domain sockets.
pub fn build_channel(config: &EndpointConfig) -> Result<Channel, Error> {
    if let Some(ref path) = config.ca_cert {
        ensure_exists(path)?;
    }

    match config.transport()? {
        TransportKind::Plaintext { authority } => {
            if config.ca_cert.is_some() {
                tracing::warn!(
                    endpoint = %authority,
                    "CA certificate configured for a plaintext endpoint; ignoring it"
                );
            }
            tracing::debug!(endpoint = %authority, "building plaintext channel");
            let endpoint = Endpoint::from_shared(authority)?.connect_timeout(config.connect_timeout);
            Ok(endpoint.connect_lazy())
        }
        TransportKind::Tls { authority, domain } => {
            tracing::debug!(endpoint = %authority, "building TLS channel");
            let tls = tls_config(&domain, config.ca_cert.as_deref())?;
            let endpoint = Endpoint::from_shared(authority)?
                .connect_timeout(config.connect_timeout)
                .tls_config(tls)
                .map_err(|e| Error::Tls(format!("rejected TLS configuration: {e}")))?;
            Ok(endpoint.connect_lazy())
        }
        TransportKind::LocalSocket { path } => {
            tracing::debug!(socket = %path.display(), "building local socket channel");
            local_socket_channel(path, config.connect_timeout)
        }
    }
}

fn ensure_exists(path: &Path) -> Result<(), Error> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::CertificateNotFound {
            path: path.display().to_string(),
        })
    }
}

/// Web PKI roots, plus the custom CA as an additional trust anchor when
/// one is configured. The chain must validate against that set.
fn tls_config(domain: &str, ca_cert: Option<&Path>) -> Result<ClientTlsConfig, Error> {
    let mut tls = ClientTlsConfig::new()
        .with_webpki_roots()
        .domain_name(domain);

    if let Some(path) = ca_cert {
        let pem = std::fs::read(path)
            .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
        let count = pem_certificate_count(&pem).map_err(|e| {
            Error::Tls(format!("CA cert {} is not valid PEM: {e}", path.display()))
        })?;
        if count == 0 {
            return Err(Error::Tls(format!(
                "CA cert {} contains no PEM certificates",
                path.display()
            )));
        }
        tls = tls.ca_certificate(Certificate::from_pem(pem));
    }

    Ok(tls)
}

/// Number of `CERTIFICATE` blocks in `pem`. Other PEM items are skipped.
fn pem_certificate_count(pem: &[u8]) -> std::io::Result<usize> {
    let mut reader = pem;
    rustls_pemfile::certs(&mut reader).try_fold(0, |count, cert| cert.map(|_| count + 1))
}

#[cfg(unix)]
fn local_socket_channel(path: PathBuf, connect_timeout: Duration) -> Result<Channel, Error> {
    use hyper_util::rt::TokioIo;
    use tokio::net::UnixStream;
    use tonic::transport::Uri;
    use tower::service_fn;

    // The connector ignores the authority, but HTTP/2 still needs a
    // well-formed `:authority` header.
    let endpoint = Endpoint::from_static("http://localhost").connect_timeout(connect_timeout);

    Ok(endpoint.connect_with_connector_lazy(service_fn(move |_: Uri| {
        let path = path.clone();
        async move {
            let stream = UnixStream::connect(path).await?;
            Ok::<_, std::io::Error>(TokioIo::new(stream))
        }
    })))
}

#[cfg(not(unix))]
fn local_socket_channel(_path: PathBuf, _connect_timeout: Duration) -> Result<Channel, Error> {
    Err(Error::UnsupportedPlatform)
}

// ── Tests ────────────────────────────────────────────────────────────
