// ── Resolver ──
//
// Orchestrates evaluation: read-through cache, typed RPC, error mapping,
// and the background event stream that keeps the cache coherent.
// Cheaply cloneable; every clone shares the same cache and worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use flagwire_api::FlagdClient;

use crate::cache::ResolutionCache;
use crate::config::ResolverConfig;
use crate::convert;
use crate::error::ProviderError;
use crate::model::{
    EvaluationContext, FlagType, FlagValue, ProviderEvent, Reason, ResolutionDetails, Value,
};
use crate::service::{FlagService, RawFlagValue};
use crate::stream::{EventStreamLoop, StreamPhase};

/// Lifecycle of the background event stream task.
enum Worker {
    /// Built, waiting for [`Resolver::init`].
    Pending(EventStreamLoop),
    Running(JoinHandle<()>),
    /// Shut down. Never restarted.
    Finished,
}

/// Remote flag resolver with an event-invalidated cache.
///
/// Resolve calls run on the caller's task and may overlap freely with each
/// other and with the event stream; the cache is the only shared state.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    config: ResolverConfig,
    /// Emptied by shutdown, which releases the channel once in-flight
    /// calls drop their clones.
    service: RwLock<Option<Arc<dyn FlagService>>>,
    cache: Option<Arc<ResolutionCache>>,
    phase: watch::Receiver<StreamPhase>,
    ready: Arc<AtomicBool>,
    cancel: CancellationToken,
    worker: Mutex<Worker>,
}

impl Drop for ResolverInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Resolver {
    /// Build a resolver over `service`. Provider events are written to
    /// `events`; nothing is read back from it. The event stream does not
    /// start until [`init`](Self::init).
    pub fn new(
        config: ResolverConfig,
        service: Arc<dyn FlagService>,
        events: mpsc::UnboundedSender<ProviderEvent>,
    ) -> Self {
        let cache = if config.cache.is_active() {
            ResolutionCache::with_capacity(config.cache.max_size).map(Arc::new)
        } else {
            None
        };
        let cancel = CancellationToken::new();

        let stream_loop = EventStreamLoop::new(
            Arc::clone(&service),
            cache.clone(),
            events,
            config.stream.clone(),
            config.provider_name.clone(),
            cancel.clone(),
        );
        let phase = stream_loop.subscribe();
        let ready = stream_loop.ready_flag();

        Self {
            inner: Arc::new(ResolverInner {
                config,
                service: RwLock::new(Some(service)),
                cache,
                phase,
                ready,
                cancel,
                worker: Mutex::new(Worker::Pending(stream_loop)),
            }),
        }
    }

    /// Build the gRPC channel described by `config.endpoint` and wrap it.
    ///
    /// Fails with [`ProviderError::Configuration`] on an unusable endpoint
    /// or certificate. No network traffic happens until the first call.
    pub fn connect(
        config: ResolverConfig,
        events: mpsc::UnboundedSender<ProviderEvent>,
    ) -> Result<Self, ProviderError> {
        let client = FlagdClient::connect(&config.endpoint)?.with_deadline(config.deadline);
        tracing::debug!(endpoint = %config.endpoint.uri, "Evaluation channel built");
        Ok(Self::new(config, Arc::new(client), events))
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the event stream. Idempotent; a no-op after shutdown.
    pub async fn init(&self) {
        let mut worker = self.inner.worker.lock().await;
        match std::mem::replace(&mut *worker, Worker::Finished) {
            Worker::Pending(stream_loop) => {
                tracing::info!(
                    provider = %self.inner.config.provider_name,
                    endpoint = %self.inner.config.endpoint.uri,
                    cache = self.inner.cache.is_some(),
                    "Starting resolver"
                );
                *worker = Worker::Running(tokio::spawn(stream_loop.run()));
            }
            running @ Worker::Running(_) => *worker = running,
            Worker::Finished => {
                tracing::warn!("Resolver already shut down; event stream not restarted");
            }
        }
    }

    /// Stop the event stream, wait for its task to exit and release the
    /// channel. In-flight resolve calls are left to finish on their own;
    /// later ones fail with [`ProviderError::ProviderNotReady`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner
            .service
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let mut worker = self.inner.worker.lock().await;
        match std::mem::replace(&mut *worker, Worker::Finished) {
            Worker::Pending(stream_loop) => stream_loop.abandon(),
            Worker::Running(handle) => {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "Event stream task ended abnormally");
                }
            }
            Worker::Finished => {}
        }
        tracing::debug!("Resolver shut down");
    }

    // ── State accessors ──────────────────────────────────────────────

    pub fn config(&self) -> &ResolverConfig {
        &self.inner.config
    }

    /// The shared cache, or `None` when caching is disabled.
    pub fn cache(&self) -> Option<&Arc<ResolutionCache>> {
        self.inner.cache.as_ref()
    }

    /// Subscribe to event stream phase changes.
    pub fn stream_phase(&self) -> watch::Receiver<StreamPhase> {
        self.inner.phase.clone()
    }

    /// `false` once [`shutdown`](Self::shutdown) has started.
    pub fn is_open(&self) -> bool {
        self.service().is_some()
    }

    fn service(&self) -> Option<Arc<dyn FlagService>> {
        self.inner
            .service
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `true` once the server has reported ready on the current stream.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    // ── Resolution ───────────────────────────────────────────────────

    pub async fn resolve_boolean(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> Result<ResolutionDetails<bool>, ProviderError> {
        self.resolve(flag_key, context).await
    }

    pub async fn resolve_string(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> Result<ResolutionDetails<String>, ProviderError> {
        self.resolve(flag_key, context).await
    }

    pub async fn resolve_integer(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> Result<ResolutionDetails<i64>, ProviderError> {
        self.resolve(flag_key, context).await
    }

    pub async fn resolve_float(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> Result<ResolutionDetails<f64>, ProviderError> {
        self.resolve(flag_key, context).await
    }

    pub async fn resolve_structure(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> Result<ResolutionDetails<Value>, ProviderError> {
        self.resolve(flag_key, context).await
    }

    /// Cache → RPC → cache (STATIC only).
    ///
    /// Entries are keyed by flag key alone, so only results that cannot
    /// depend on the context may be stored.
    pub async fn resolve<T: FlagType>(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> Result<ResolutionDetails<T>, ProviderError> {
        let Some(service) = self.service() else {
            return Err(ProviderError::ProviderNotReady {
                message: "resolver has been shut down".into(),
            });
        };

        if let Some(ref cache) = self.inner.cache {
            if let Some(hit) = cache.try_get(flag_key) {
                if let Some(typed) = hit.try_map(T::from_flag_value) {
                    tracing::debug!(flag_key, "Cache hit");
                    return Ok(typed);
                }
                tracing::debug!(
                    flag_key,
                    cached = %hit.value.kind(),
                    requested = %T::KIND,
                    "Cached entry has another type, resolving remotely"
                );
            } else {
                tracing::debug!(flag_key, "Cache miss");
            }
        }

        let wire = service
            .resolve(T::KIND, flag_key, convert::context_to_wire(context))
            .await
            .map_err(|e| {
                tracing::debug!(flag_key, error = %e, "Resolution failed");
                ProviderError::from(e)
            })?;

        let details = ResolutionDetails {
            value: match wire.value {
                RawFlagValue::Bool(b) => FlagValue::Bool(b),
                RawFlagValue::String(s) => FlagValue::String(s),
                RawFlagValue::Int(n) => FlagValue::Int(n),
                RawFlagValue::Float(n) => FlagValue::Float(n),
                RawFlagValue::Object(s) => {
                    FlagValue::Structure(Value::Structure(convert::structure_from_wire(&s)))
                }
            },
            variant: Some(wire.variant).filter(|v| !v.is_empty()),
            reason: Reason::parse(&wire.reason),
            flag_metadata: convert::metadata_from_wire(wire.metadata.as_ref()),
        };

        let typed = details
            .try_map(T::from_flag_value)
            .ok_or_else(|| ProviderError::TypeMismatch {
                message: format!(
                    "flag '{flag_key}' resolved to {} but {} was requested",
                    details.value.kind(),
                    T::KIND
                ),
            })?;

        if details.reason.is_cacheable() {
            if let Some(ref cache) = self.inner.cache {
                tracing::trace!(flag_key, "Caching static resolution");
                cache.add(flag_key, details);
            }
        }

        Ok(typed)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("provider", &self.inner.config.provider_name)
            .field("endpoint", &self.inner.config.endpoint.uri)
            .field("cache", &self.inner.cache)
            .field("phase", &*self.inner.phase.borrow())
            .finish_non_exhaustive()
    }
}
