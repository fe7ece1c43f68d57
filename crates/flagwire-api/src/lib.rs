// flagwire-api: gRPC transport for the flagd evaluation protocol

pub mod client;
pub mod error;
pub mod transport;

/// Generated protobuf messages and the tonic client for
/// `flagd.evaluation.v1.Service`.
#[allow(clippy::all, clippy::pedantic)]
pub mod proto {
    tonic::include_proto!("flagd.evaluation.v1");
}

pub use client::{FlagdClient, WireResolution};
pub use error::Error;
pub use transport::{EndpointConfig, TransportKind, build_channel};
