//! CLI error types with miette diagnostics.
//!
//! Maps `ProviderError` codes into user-facing errors with actionable help.

use miette::Diagnostic;
use thiserror::Error;

use flagwire_config::ConfigError;
use flagwire_core::{ErrorCode, ProviderError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const TYPE_MISMATCH: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Evaluation ──────────────────────────────────────────────────
    #[error("Flag '{flag}' not found")]
    #[diagnostic(
        code(flagwire::flag_not_found),
        help(
            "Server said: {message}\n\
             Check the flag key and that the flag source loaded by flagd defines it."
        )
    )]
    FlagNotFound { flag: String, message: String },

    #[error("Flag '{flag}' is not of the requested type: {message}")]
    #[diagnostic(
        code(flagwire::type_mismatch),
        help("Pass the flag's actual type with --type (boolean, string, integer, float, object).")
    )]
    TypeMismatch { flag: String, message: String },

    #[error("Provider at {endpoint} is not ready: {message}")]
    #[diagnostic(
        code(flagwire::provider_not_ready),
        help(
            "Check that flagd is running and reachable.\n\
             Endpoint: {endpoint}\n\
             Override with --endpoint or FLAGD_HOST / FLAGD_PORT."
        )
    )]
    ProviderNotReady { endpoint: String, message: String },

    #[error("Evaluation failed ({code}): {message}")]
    #[diagnostic(code(flagwire::evaluation))]
    Evaluation { code: ErrorCode, message: String },

    // ── Configuration ───────────────────────────────────────────────
    #[error("Invalid connection settings: {message}")]
    #[diagnostic(
        code(flagwire::connection_config),
        help("Run: flagwire config show to inspect the effective endpoint and certificate.")
    )]
    Connection { message: String },

    #[error(transparent)]
    #[diagnostic(
        code(flagwire::config),
        help("Run: flagwire config path to locate the config file.")
    )]
    Config(#[from] ConfigError),

    // ── Validation ──────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(flagwire::validation))]
    Validation { field: String, reason: String },

    // ── IO / Serialization ──────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FlagNotFound { .. } => exit_code::NOT_FOUND,
            Self::TypeMismatch { .. } => exit_code::TYPE_MISMATCH,
            Self::ProviderNotReady { .. } => exit_code::CONNECTION,
            Self::Connection { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the flag key and endpoint a provider error happened for.
    pub fn from_provider(err: ProviderError, flag: &str, endpoint: &str) -> Self {
        let code = err.code();
        let message = err.into_message();
        match code {
            ErrorCode::FlagNotFound => Self::FlagNotFound {
                flag: flag.into(),
                message,
            },
            ErrorCode::TypeMismatch => Self::TypeMismatch {
                flag: flag.into(),
                message,
            },
            ErrorCode::ProviderNotReady => Self::ProviderNotReady {
                endpoint: endpoint.into(),
                message,
            },
            ErrorCode::Configuration => Self::Connection { message },
            ErrorCode::ParseError | ErrorCode::General => Self::Evaluation { code, message },
        }
    }
}

impl From<ProviderError> for CliError {
    fn from(err: ProviderError) -> Self {
        Self::from_provider(err, "<unknown>", "<unknown>")
    }
}
