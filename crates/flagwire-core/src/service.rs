// ── Evaluation service seam ──
//
// The resolver and the event loop talk to the server through this trait
// rather than to `FlagdClient` directly. Tests substitute an in-process
// fake; production uses the tonic client.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use prost_types::Struct;

use flagwire_api::proto::EventStreamResponse;
use flagwire_api::{FlagdClient, WireResolution};

use crate::model::FlagKind;

/// Server-push messages as they come off the wire.
pub type EventStream = BoxStream<'static, Result<EventStreamResponse, tonic::Status>>;

/// A resolved value before domain conversion. Object flags stay in their
/// wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFlagValue {
    Bool(bool),
    String(String),
    Int(i64),
    Float(f64),
    Object(Struct),
}

/// The remote evaluation service: unary resolution plus the event stream.
#[async_trait]
pub trait FlagService: Send + Sync + 'static {
    /// Resolve `flag_key` as `kind` against `context`.
    async fn resolve(
        &self,
        kind: FlagKind,
        flag_key: &str,
        context: Struct,
    ) -> Result<WireResolution<RawFlagValue>, flagwire_api::Error>;

    /// Open the long-lived event stream.
    async fn event_stream(&self) -> Result<EventStream, flagwire_api::Error>;
}

fn widen<V>(
    resolution: WireResolution<V>,
    wrap: impl FnOnce(V) -> RawFlagValue,
) -> WireResolution<RawFlagValue> {
    WireResolution {
        value: wrap(resolution.value),
        variant: resolution.variant,
        reason: resolution.reason,
        metadata: resolution.metadata,
    }
}

#[async_trait]
impl FlagService for FlagdClient {
    async fn resolve(
        &self,
        kind: FlagKind,
        flag_key: &str,
        context: Struct,
    ) -> Result<WireResolution<RawFlagValue>, flagwire_api::Error> {
        Ok(match kind {
            FlagKind::Boolean => widen(
                self.resolve_boolean(flag_key, context).await?,
                RawFlagValue::Bool,
            ),
            FlagKind::String => widen(
                self.resolve_string(flag_key, context).await?,
                RawFlagValue::String,
            ),
            FlagKind::Integer => {
                widen(self.resolve_int(flag_key, context).await?, RawFlagValue::Int)
            }
            FlagKind::Float => widen(
                self.resolve_float(flag_key, context).await?,
                RawFlagValue::Float,
            ),
            FlagKind::Object => widen(
                self.resolve_object(flag_key, context).await?,
                RawFlagValue::Object,
            ),
        })
    }

    async fn event_stream(&self) -> Result<EventStream, flagwire_api::Error> {
        Ok(FlagdClient::event_stream(self).await?.boxed())
    }
}
