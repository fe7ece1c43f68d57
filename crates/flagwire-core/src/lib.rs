//! Cached, event-driven flag resolution against a remote flagd service.
//!
//! - **[`Resolver`]**: typed `resolve_*` calls. Consults the
//!   [`ResolutionCache`] first, falls through to the evaluation RPC, and
//!   caches only results whose reason is `STATIC`. Failures surface as a
//!   [`ProviderError`] carrying one [`ErrorCode`].
//!
//! - **[`EventStreamLoop`]**: background task started by
//!   [`Resolver::init`]. Listens on the server's event stream, deletes or
//!   purges cache entries on `configuration_changed`, purges on
//!   `provider_ready`, and reconnects with exponential backoff until the
//!   configured retry ceiling. Lifecycle is observable as a [`StreamPhase`];
//!   notable moments are written to an outbound [`ProviderEvent`] channel.
//!
//! - **[`FlagService`]**: the seam between the resolver and the wire.
//!   Implemented for [`flagwire_api::FlagdClient`].
//!
//! - **[`convert`]**: total conversion between [`Value`] and
//!   `google.protobuf.Value`.

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod resolver;
pub mod service;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CachedResolution, ResolutionCache};
pub use config::{CacheConfig, ResolverConfig, StreamConfig};
pub use error::{ErrorCode, ProviderError, map_status_code};
pub use resolver::Resolver;
pub use service::{EventStream, FlagService, RawFlagValue};
pub use stream::{EventStreamLoop, StreamPhase};

pub use model::{
    EvaluationContext, FlagKind, FlagType, FlagValue, ProviderEvent, ProviderEventKind, Reason,
    ResolutionDetails, Value,
};

// Wire types callers need to implement `FlagService` themselves.
pub use flagwire_api::{EndpointConfig, WireResolution};
