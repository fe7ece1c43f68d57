use thiserror::Error;

/// Top-level error type for the `flagwire-api` crate.
///
/// Covers channel construction (endpoint, TLS, local socket) and
/// per-call RPC failures. `flagwire-core` maps these into the provider
/// error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// Endpoint URI could not be parsed.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// Endpoint scheme is not one of `http`, `https`, `unix`.
    #[error("Unsupported endpoint scheme '{scheme}' (expected http, https or unix)")]
    UnsupportedScheme { scheme: String },

    /// `unix:` URI that does not name an absolute socket path.
    #[error("Invalid socket endpoint: {reason}")]
    InvalidSocketPath { reason: String },

    /// Custom CA certificate path does not exist.
    #[error("CA certificate not found at {path}")]
    CertificateNotFound { path: String },

    /// TLS setup failed (unreadable certificate, rejected trust config).
    #[error("TLS error: {0}")]
    Tls(String),

    /// Local socket transport requested where the platform has none.
    #[error("Unix domain sockets are not supported on this platform")]
    UnsupportedPlatform,

    // ── Transport ───────────────────────────────────────────────────
    /// Channel-level transport error (connection refused, DNS failure, etc.)
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    // ── RPC ─────────────────────────────────────────────────────────
    /// The server answered a call with a non-OK status.
    #[error("RPC failed ({code}): {message}", code = .0.code(), message = .0.message())]
    Status(#[from] tonic::Status),
}

impl Error {
    /// Returns `true` if this error was raised while building the channel,
    /// i.e. it is a configuration problem rather than a runtime failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidEndpoint(_)
                | Self::UnsupportedScheme { .. }
                | Self::InvalidSocketPath { .. }
                | Self::CertificateNotFound { .. }
                | Self::Tls(_)
                | Self::UnsupportedPlatform
        )
    }

    /// The RPC status code, if this error came back from a call.
    pub fn status_code(&self) -> Option<tonic::Code> {
        match self {
            Self::Status(status) => Some(status.code()),
            _ => None,
        }
    }
}
