// ── Runtime resolver configuration ──
//
// Describes how to reach the evaluation service and how the resolver
// behaves once connected. Never touches disk: `flagwire-config` (or any
// embedding application) builds a `ResolverConfig` and hands it in.

use std::time::Duration;

use flagwire_api::EndpointConfig;

/// Name stamped on every emitted [`crate::ProviderEvent`] unless overridden.
pub const DEFAULT_PROVIDER_NAME: &str = "flagd";

/// Read-through cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum number of cached resolutions. Zero disables the cache.
    pub max_size: usize,
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_size: 0,
        }
    }

    /// Whether a cache should be constructed at all.
    pub fn is_active(&self) -> bool {
        self.enabled && self.max_size > 0
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 1000,
        }
    }
}

/// Event stream reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Consecutive failed attempts tolerated before the loop stops for good.
    pub max_retries: u32,
    /// Delay after the first failure; doubles after each further failure.
    pub base_backoff: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_backoff: Duration::from_secs(1),
        }
    }
}

/// Everything a [`crate::Resolver`] needs.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub endpoint: EndpointConfig,
    /// Deadline applied to each unary evaluation call.
    pub deadline: Duration,
    pub cache: CacheConfig,
    pub stream: StreamConfig,
    pub provider_name: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            deadline: Duration::from_millis(500),
            cache: CacheConfig::default(),
            stream: StreamConfig::default(),
            provider_name: DEFAULT_PROVIDER_NAME.into(),
        }
    }
}
