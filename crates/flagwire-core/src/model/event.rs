use std::collections::BTreeSet;

use serde::Serialize;
use strum::Display;

/// What happened on the provider's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderEventKind {
    /// The server reported it is ready; the cache was purged.
    Ready,
    /// Flag configuration changed on the server.
    ConfigurationChanged,
    /// The stream failed. Carries a message; the last one before the loop
    /// gives up says so.
    Error,
}

/// Notification written to the outbound event sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderEvent {
    pub kind: ProviderEventKind,
    pub provider_name: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub changed_flags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProviderEvent {
    pub fn ready(provider_name: impl Into<String>) -> Self {
        Self {
            kind: ProviderEventKind::Ready,
            provider_name: provider_name.into(),
            changed_flags: BTreeSet::new(),
            message: None,
        }
    }

    pub fn configuration_changed(
        provider_name: impl Into<String>,
        changed_flags: BTreeSet<String>,
    ) -> Self {
        Self {
            kind: ProviderEventKind::ConfigurationChanged,
            provider_name: provider_name.into(),
            changed_flags,
            message: None,
        }
    }

    pub fn error(provider_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderEventKind::Error,
            provider_name: provider_name.into(),
            changed_flags: BTreeSet::new(),
            message: Some(message.into()),
        }
    }
}
