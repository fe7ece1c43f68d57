// Thin async wrapper around the generated evaluation client.
//
// One method per flag type plus the event stream. Every unary call carries
// the configured deadline; the event stream deliberately does not, since
// it is expected to stay open for the life of the process.

use std::time::Duration;

use prost_types::Struct;
use tonic::transport::Channel;

use crate::error::Error;
use crate::proto::service_client::ServiceClient;
use crate::proto::{
    EventStreamRequest, EventStreamResponse, ResolveBooleanRequest, ResolveFloatRequest,
    ResolveIntRequest, ResolveObjectRequest, ResolveStringRequest,
};
use crate::transport::{EndpointConfig, build_channel};

/// Raw result of a single evaluation RPC, before any domain conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct WireResolution<V> {
    pub value: V,
    pub variant: String,
    pub reason: String,
    pub metadata: Option<Struct>,
}

/// Client for `flagd.evaluation.v1.Service`.
///
/// Cheaply cloneable: the underlying [`Channel`] is a handle onto a shared
/// HTTP/2 connection pool.
#[derive(Debug, Clone)]
pub struct FlagdClient {
    inner: ServiceClient<Channel>,
    deadline: Option<Duration>,
}

impl FlagdClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: ServiceClient::new(channel),
            deadline: None,
        }
    }

    /// Build the channel for `config` and wrap it.
    pub fn connect(config: &EndpointConfig) -> Result<Self, Error> {
        build_channel(config).map(Self::new)
    }

    /// Apply `deadline` to every unary call made through this client.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        if let Some(deadline) = self.deadline {
            request.set_timeout(deadline);
        }
        request
    }

    pub async fn resolve_boolean(
        &self,
        flag_key: &str,
        context: Struct,
    ) -> Result<WireResolution<bool>, Error> {
        let request = self.request(ResolveBooleanRequest {
            flag_key: flag_key.to_owned(),
            context: Some(context),
        });
        let response = self.inner.clone().resolve_boolean(request).await?.into_inner();

        Ok(WireResolution {
            value: response.value,
            variant: response.variant,
            reason: response.reason,
            metadata: response.metadata,
        })
    }

    pub async fn resolve_string(
        &self,
        flag_key: &str,
        context: Struct,
    ) -> Result<WireResolution<String>, Error> {
        let request = self.request(ResolveStringRequest {
            flag_key: flag_key.to_owned(),
            context: Some(context),
        });
        let response = self.inner.clone().resolve_string(request).await?.into_inner();

        Ok(WireResolution {
            value: response.value,
            variant: response.variant,
            reason: response.reason,
            metadata: response.metadata,
        })
    }

    pub async fn resolve_int(
        &self,
        flag_key: &str,
        context: Struct,
    ) -> Result<WireResolution<i64>, Error> {
        let request = self.request(ResolveIntRequest {
            flag_key: flag_key.to_owned(),
            context: Some(context),
        });
        let response = self.inner.clone().resolve_int(request).await?.into_inner();

        Ok(WireResolution {
            value: response.value,
            variant: response.variant,
            reason: response.reason,
            metadata: response.metadata,
        })
    }

    pub async fn resolve_float(
        &self,
        flag_key: &str,
        context: Struct,
    ) -> Result<WireResolution<f64>, Error> {
        let request = self.request(ResolveFloatRequest {
            flag_key: flag_key.to_owned(),
            context: Some(context),
        });
        let response = self.inner.clone().resolve_float(request).await?.into_inner();

        Ok(WireResolution {
            value: response.value,
            variant: response.variant,
            reason: response.reason,
            metadata: response.metadata,
        })
    }

    /// Object flags come back as a struct; a missing value is treated as
    /// an empty one.
    pub async fn resolve_object(
        &self,
        flag_key: &str,
        context: Struct,
    ) -> Result<WireResolution<Struct>, Error> {
        let request = self.request(ResolveObjectRequest {
            flag_key: flag_key.to_owned(),
            context: Some(context),
        });
        let response = self.inner.clone().resolve_object(request).await?.into_inner();

        Ok(WireResolution {
            value: response.value.unwrap_or_default(),
            variant: response.variant,
            reason: response.reason,
            metadata: response.metadata,
        })
    }

    /// Open the server-push event stream.
    pub async fn event_stream(&self) -> Result<tonic::Streaming<EventStreamResponse>, Error> {
        let response = self
            .inner
            .clone()
            .event_stream(tonic::Request::new(EventStreamRequest {}))
            .await?;
        Ok(response.into_inner())
    }
}
