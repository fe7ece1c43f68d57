// ── Event stream loop ──
//
// Background worker that keeps the server-push event stream open, turns
// its messages into cache invalidations and provider events, and
// reconnects with exponential backoff when the stream fails. The retry
// state lives on this task's stack; other components observe it only
// through the published `StreamPhase`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use prost_types::Struct;
use prost_types::value::Kind;
use serde::Serialize;
use strum::Display;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use flagwire_api::proto::EventStreamResponse;

use crate::cache::ResolutionCache;
use crate::config::StreamConfig;
use crate::model::ProviderEvent;
use crate::service::FlagService;

/// Event type sent once the server has loaded its flag configuration.
pub const PROVIDER_READY: &str = "provider_ready";
/// Event type sent when flag definitions change.
pub const CONFIGURATION_CHANGED: &str = "configuration_changed";

const FLAGS_FIELD: &str = "flags";

// ── StreamPhase ──────────────────────────────────────────────────────

/// Observable state of the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(tag = "phase", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StreamPhase {
    /// Created but not started.
    Idle,
    /// Opening the event stream.
    Connecting,
    /// Stream open; messages are being dispatched.
    Streaming,
    /// Waiting `delay` before reconnect attempt number `attempt`.
    BackingOff {
        attempt: u32,
        #[serde(with = "duration_millis")]
        delay: Duration,
    },
    /// Shut down, or gave up after exhausting retries. Terminal.
    Stopped,
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
    }
}

// ── ConnectionState ──────────────────────────────────────────────────

/// Retry bookkeeping. Owned by the loop task.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConnectionState {
    retry_count: u32,
    backoff: Duration,
}

impl ConnectionState {
    fn new(base: Duration) -> Self {
        Self {
            retry_count: 0,
            backoff: base,
        }
    }

    fn reset(&mut self, base: Duration) {
        *self = Self::new(base);
    }

    /// Count a failure. Returns the delay to wait before reconnecting, or
    /// `None` once the count exceeds `max_retries`.
    fn record_failure(&mut self, max_retries: u32) -> Option<Duration> {
        self.retry_count = self.retry_count.saturating_add(1);
        if self.retry_count > max_retries {
            return None;
        }
        let delay = self.backoff;
        self.backoff = self.backoff.saturating_mul(2);
        Some(delay)
    }
}

#[derive(Debug, Error)]
enum StreamError {
    #[error(transparent)]
    Api(#[from] flagwire_api::Error),

    #[error("event stream closed by server")]
    Closed,
}

/// The payload of a `configuration_changed` event did not name its flags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed configuration_changed payload: {0}")]
pub struct PayloadError(&'static str);

// ── EventStreamLoop ──────────────────────────────────────────────────

/// Long-running event stream consumer. Build with [`EventStreamLoop::new`],
/// then drive to completion with [`EventStreamLoop::run`] on its own task.
pub struct EventStreamLoop {
    service: Arc<dyn FlagService>,
    cache: Option<Arc<ResolutionCache>>,
    events: mpsc::UnboundedSender<ProviderEvent>,
    phase: watch::Sender<StreamPhase>,
    ready: Arc<AtomicBool>,
    config: StreamConfig,
    provider_name: String,
    cancel: CancellationToken,
}

impl EventStreamLoop {
    pub fn new(
        service: Arc<dyn FlagService>,
        cache: Option<Arc<ResolutionCache>>,
        events: mpsc::UnboundedSender<ProviderEvent>,
        config: StreamConfig,
        provider_name: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        let (phase, _) = watch::channel(StreamPhase::Idle);
        Self {
            service,
            cache,
            events,
            phase,
            ready: Arc::new(AtomicBool::new(false)),
            config,
            provider_name: provider_name.into(),
            cancel,
        }
    }

    /// Watch the loop's phase. Keeps the last value after the loop exits.
    pub fn subscribe(&self) -> watch::Receiver<StreamPhase> {
        self.phase.subscribe()
    }

    /// Flag that is `true` between a `provider_ready` and the next failure.
    pub fn ready_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.ready)
    }

    /// Mark the loop stopped without ever running it.
    pub fn abandon(self) {
        self.phase.send_replace(StreamPhase::Stopped);
    }

    /// Main loop: connect → read → on failure, back off → reconnect.
    /// Returns on cancellation or once the retry ceiling is exceeded.
    pub async fn run(self) {
        let mut state = ConnectionState::new(self.config.base_backoff);

        loop {
            self.phase.send_replace(StreamPhase::Connecting);

            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                outcome = self.connect_and_read(&mut state) => outcome,
            };

            self.ready.store(false, Ordering::Release);
            let reason = match outcome {
                Ok(()) => StreamError::Closed.to_string(),
                Err(e) => e.to_string(),
            };

            let Some(delay) = state.record_failure(self.config.max_retries) else {
                tracing::error!(
                    max_retries = self.config.max_retries,
                    error = %reason,
                    "Event stream retry limit reached, giving up"
                );
                self.emit(ProviderEvent::error(
                    &self.provider_name,
                    format!(
                        "{reason}; giving up after {} reconnect attempts",
                        self.config.max_retries
                    ),
                ));
                break;
            };

            tracing::warn!(
                error = %reason,
                attempt = state.retry_count,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Event stream failed, backing off"
            );
            self.phase.send_replace(StreamPhase::BackingOff {
                attempt: state.retry_count,
                delay,
            });
            self.emit(ProviderEvent::error(&self.provider_name, reason));

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.ready.store(false, Ordering::Release);
        self.phase.send_replace(StreamPhase::Stopped);
        tracing::debug!("Event stream loop exiting");
    }

    /// Open the stream once and dispatch messages until it ends or fails.
    async fn connect_and_read(&self, state: &mut ConnectionState) -> Result<(), StreamError> {
        tracing::info!(provider = %self.provider_name, "Opening event stream");
        let mut stream = self.service.event_stream().await?;
        self.phase.send_replace(StreamPhase::Streaming);

        while let Some(message) = stream.next().await {
            let message = message.map_err(flagwire_api::Error::from)?;
            self.dispatch(&message, state);
        }
        Ok(())
    }

    fn dispatch(&self, message: &EventStreamResponse, state: &mut ConnectionState) {
        match message.r#type.as_str() {
            PROVIDER_READY => {
                tracing::info!(provider = %self.provider_name, "Provider ready");
                state.reset(self.config.base_backoff);
                self.ready.store(true, Ordering::Release);
                if let Some(ref cache) = self.cache {
                    cache.purge();
                }
                self.emit(ProviderEvent::ready(&self.provider_name));
            }
            CONFIGURATION_CHANGED => {
                let changed = match changed_flag_keys(message.data.as_ref()) {
                    Ok(keys) => {
                        if let Some(ref cache) = self.cache {
                            for key in &keys {
                                cache.delete(key);
                            }
                        }
                        keys
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Purging cache");
                        if let Some(ref cache) = self.cache {
                            cache.purge();
                        }
                        BTreeSet::new()
                    }
                };
                tracing::debug!(flags = ?changed, "Configuration changed");
                self.emit(ProviderEvent::configuration_changed(
                    &self.provider_name,
                    changed,
                ));
            }
            other => tracing::trace!(event_type = other, "Ignoring event"),
        }
    }

    fn emit(&self, event: ProviderEvent) {
        // A dropped receiver just means nobody is listening.
        let _ = self.events.send(event);
    }
}

/// Extract the changed flag keys from a `configuration_changed` payload:
/// the keys of the `flags` struct.
pub fn changed_flag_keys(data: Option<&Struct>) -> Result<BTreeSet<String>, PayloadError> {
    let data = data.ok_or(PayloadError("missing data"))?;
    let flags = data
        .fields
        .get(FLAGS_FIELD)
        .ok_or(PayloadError("missing 'flags' field"))?;

    match flags.kind {
        Some(Kind::StructValue(ref flags)) => Ok(flags.fields.keys().cloned().collect()),
        _ => Err(PayloadError("'flags' is not a struct")),
    }
}

// ── Tests ────────────────────────────────────────────────────────────
