// ── Provider error taxonomy ──
//
// What resolve callers see. Raw RPC statuses and transport failures never
// escape this crate: the `From<flagwire_api::Error>` impl folds them into
// one of a handful of codes an application can branch on.

use strum::{Display, EnumIter};
use thiserror::Error;

/// Stable classification of a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    FlagNotFound,
    TypeMismatch,
    ParseError,
    ProviderNotReady,
    General,
    Configuration,
}

/// Error returned by every resolve operation and by resolver construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Flag not found: {message}")]
    FlagNotFound { message: String },

    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Provider not ready: {message}")]
    ProviderNotReady { message: String },

    #[error("{message}")]
    General { message: String },

    /// Construction-time only: the endpoint or TLS settings are unusable.
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ProviderError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            ErrorCode::FlagNotFound => Self::FlagNotFound { message },
            ErrorCode::TypeMismatch => Self::TypeMismatch { message },
            ErrorCode::ParseError => Self::ParseError { message },
            ErrorCode::ProviderNotReady => Self::ProviderNotReady { message },
            ErrorCode::General => Self::General { message },
            ErrorCode::Configuration => Self::Configuration { message },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::FlagNotFound { .. } => ErrorCode::FlagNotFound,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::ParseError { .. } => ErrorCode::ParseError,
            Self::ProviderNotReady { .. } => ErrorCode::ProviderNotReady,
            Self::General { .. } => ErrorCode::General,
            Self::Configuration { .. } => ErrorCode::Configuration,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::FlagNotFound { message }
            | Self::TypeMismatch { message }
            | Self::ParseError { message }
            | Self::ProviderNotReady { message }
            | Self::General { message }
            | Self::Configuration { message } => message,
        }
    }

    pub fn into_message(self) -> String {
        match self {
            Self::FlagNotFound { message }
            | Self::TypeMismatch { message }
            | Self::ParseError { message }
            | Self::ProviderNotReady { message }
            | Self::General { message }
            | Self::Configuration { message } => message,
        }
    }
}

/// Map an RPC status code onto the taxonomy. Exactly one code per status;
/// anything without a dedicated meaning is `General`.
pub fn map_status_code(code: tonic::Code) -> ErrorCode {
    match code {
        tonic::Code::NotFound => ErrorCode::FlagNotFound,
        tonic::Code::Unavailable => ErrorCode::ProviderNotReady,
        tonic::Code::InvalidArgument => ErrorCode::TypeMismatch,
        tonic::Code::DataLoss => ErrorCode::ParseError,
        _ => ErrorCode::General,
    }
}

// ── Conversion from wire-layer errors ────────────────────────────────

impl From<tonic::Status> for ProviderError {
    fn from(status: tonic::Status) -> Self {
        Self::new(map_status_code(status.code()), status.message())
    }
}

impl From<flagwire_api::Error> for ProviderError {
    fn from(err: flagwire_api::Error) -> Self {
        match err {
            flagwire_api::Error::Status(status) => status.into(),
            flagwire_api::Error::Transport(e) => Self::ProviderNotReady {
                message: e.to_string(),
            },
            other if other.is_configuration() => Self::Configuration {
                message: other.to_string(),
            },
            other => Self::General {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_status_code_maps_to_exactly_one_error_code() {
        let table = [
            (tonic::Code::Ok, ErrorCode::General),
            (tonic::Code::Cancelled, ErrorCode::General),
            (tonic::Code::Unknown, ErrorCode::General),
            (tonic::Code::InvalidArgument, ErrorCode::TypeMismatch),
            (tonic::Code::DeadlineExceeded, ErrorCode::General),
            (tonic::Code::NotFound, ErrorCode::FlagNotFound),
            (tonic::Code::AlreadyExists, ErrorCode::General),
            (tonic::Code::PermissionDenied, ErrorCode::General),
            (tonic::Code::ResourceExhausted, ErrorCode::General),
            (tonic::Code::FailedPrecondition, ErrorCode::General),
            (tonic::Code::Aborted, ErrorCode::General),
            (tonic::Code::OutOfRange, ErrorCode::General),
            (tonic::Code::Unimplemented, ErrorCode::General),
            (tonic::Code::Internal, ErrorCode::General),
            (tonic::Code::Unavailable, ErrorCode::ProviderNotReady),
            (tonic::Code::DataLoss, ErrorCode::ParseError),
            (tonic::Code::Unauthenticated, ErrorCode::General),
        ];

        // The table must cover the whole closed status set, in wire order.
        let all: Vec<tonic::Code> = (0..=16).map(tonic::Code::from_i32).collect();
        assert_eq!(all, table.iter().map(|(c, _)| *c).collect::<Vec<_>>());

        for (status, expected) in table {
            assert_eq!(map_status_code(status), expected, "status {status:?}");
        }
    }

    #[test]
    fn configuration_is_never_produced_by_a_status() {
        for raw in 0..=16 {
            assert_ne!(
                map_status_code(tonic::Code::from_i32(raw)),
                ErrorCode::Configuration
            );
        }
    }

    #[test]
    fn status_conversion_keeps_message() {
        let err = ProviderError::from(tonic::Status::not_found("flag 'beta' not found"));
        assert_eq!(err.code(), ErrorCode::FlagNotFound);
        assert_eq!(err.message(), "flag 'beta' not found");
    }

    #[test]
    fn api_configuration_errors_map_to_configuration() {
        let err = ProviderError::from(flagwire_api::Error::CertificateNotFound {
            path: "/missing.pem".into(),
        });
        assert_eq!(err.code(), ErrorCode::Configuration);
        assert!(err.message().contains("/missing.pem"));
    }

    #[test]
    fn new_and_code_agree() {
        for code in ErrorCode::iter() {
            assert_eq!(ProviderError::new(code, "x").code(), code);
        }
    }

    #[test]
    fn codes_display_in_screaming_snake_case() {
        assert_eq!(ErrorCode::FlagNotFound.to_string(), "FLAG_NOT_FOUND");
        assert_eq!(ErrorCode::ProviderNotReady.to_string(), "PROVIDER_NOT_READY");
    }
}
