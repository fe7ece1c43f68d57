// Shared fixtures: an in-process `FlagService` with scripted answers.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use prost_types::value::Kind;
use prost_types::{Struct, Value as WireValue};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;

use flagwire_api::proto::EventStreamResponse;
use flagwire_core::{
    CacheConfig, EventStream, FlagKind, FlagService, ProviderEvent, RawFlagValue, Resolver,
    ResolverConfig, StreamConfig, WireResolution,
};

pub type Feed = mpsc::UnboundedSender<Result<EventStreamResponse, tonic::Status>>;

/// One scripted `event_stream` call.
pub enum Session {
    /// Opening the stream fails with `Unavailable`.
    Refuse,
    /// Stream yields these messages, then ends.
    Finite(Vec<EventStreamResponse>),
    /// Stream stays open until the paired [`Feed`] is dropped.
    Live(mpsc::UnboundedReceiver<Result<EventStreamResponse, tonic::Status>>),
}

enum Answer {
    Resolved(WireResolution<RawFlagValue>),
    Failed(tonic::Code, String),
}

#[derive(Default)]
pub struct FakeService {
    answers: Mutex<HashMap<String, Answer>>,
    resolve_calls: Mutex<Vec<(FlagKind, String, Struct)>>,
    sessions: Mutex<VecDeque<Session>>,
    opens: Mutex<Vec<Instant>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self, flag_key: &str, value: RawFlagValue, variant: &str, reason: &str) {
        self.answers.lock().unwrap().insert(
            flag_key.to_owned(),
            Answer::Resolved(WireResolution {
                value,
                variant: variant.to_owned(),
                reason: reason.to_owned(),
                metadata: None,
            }),
        );
    }

    pub fn answer_with_metadata(
        &self,
        flag_key: &str,
        value: RawFlagValue,
        reason: &str,
        metadata: Struct,
    ) {
        self.answers.lock().unwrap().insert(
            flag_key.to_owned(),
            Answer::Resolved(WireResolution {
                value,
                variant: String::new(),
                reason: reason.to_owned(),
                metadata: Some(metadata),
            }),
        );
    }

    pub fn fail(&self, flag_key: &str, code: tonic::Code, message: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(flag_key.to_owned(), Answer::Failed(code, message.to_owned()));
    }

    pub fn push_session(&self, session: Session) {
        self.sessions.lock().unwrap().push_back(session);
    }

    /// Queue a live session and return the handle that feeds it.
    pub fn push_live(&self) -> Feed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push_session(Session::Live(rx));
        tx
    }

    pub fn resolve_count(&self, flag_key: &str) -> usize {
        self.resolve_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, key, _)| key == flag_key)
            .count()
    }

    pub fn last_context(&self) -> Option<Struct> {
        self.resolve_calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, _, context)| context.clone())
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    /// Time between consecutive `event_stream` calls.
    pub fn open_gaps(&self) -> Vec<Duration> {
        let opens = self.opens.lock().unwrap();
        opens.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl FlagService for FakeService {
    async fn resolve(
        &self,
        kind: FlagKind,
        flag_key: &str,
        context: Struct,
    ) -> Result<WireResolution<RawFlagValue>, flagwire_api::Error> {
        self.resolve_calls
            .lock()
            .unwrap()
            .push((kind, flag_key.to_owned(), context));

        match self.answers.lock().unwrap().get(flag_key) {
            Some(Answer::Resolved(resolution)) => Ok(resolution.clone()),
            Some(Answer::Failed(code, message)) => {
                Err(tonic::Status::new(*code, message.clone()).into())
            }
            None => Err(tonic::Status::not_found(format!("flag '{flag_key}' not found")).into()),
        }
    }

    async fn event_stream(&self) -> Result<EventStream, flagwire_api::Error> {
        self.opens.lock().unwrap().push(Instant::now());

        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(Session::Finite(messages)) => {
                Ok(futures_util::stream::iter(messages.into_iter().map(Ok)).boxed())
            }
            Some(Session::Live(rx)) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            Some(Session::Refuse) | None => {
                Err(tonic::Status::unavailable("connection refused").into())
            }
        }
    }
}

// ── Message builders ────────────────────────────────────────────────

pub fn ready() -> EventStreamResponse {
    EventStreamResponse {
        r#type: "provider_ready".into(),
        data: None,
    }
}

pub fn changed(flags: &[&str]) -> EventStreamResponse {
    let flags = Struct {
        fields: flags
            .iter()
            .map(|key| {
                (
                    (*key).to_owned(),
                    WireValue {
                        kind: Some(Kind::StructValue(Struct::default())),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>(),
    };
    changed_with_data(Struct {
        fields: [(
            "flags".to_owned(),
            WireValue {
                kind: Some(Kind::StructValue(flags)),
            },
        )]
        .into(),
    })
}

pub fn changed_with_data(data: Struct) -> EventStreamResponse {
    EventStreamResponse {
        r#type: "configuration_changed".into(),
        data: Some(data),
    }
}

// ── Resolver setup ──────────────────────────────────────────────────

pub fn config(max_retries: u32) -> ResolverConfig {
    ResolverConfig {
        cache: CacheConfig {
            enabled: true,
            max_size: 100,
        },
        stream: StreamConfig {
            max_retries,
            base_backoff: Duration::from_secs(1),
        },
        ..ResolverConfig::default()
    }
}

pub fn resolver_with(
    config: ResolverConfig,
    service: std::sync::Arc<FakeService>,
) -> (Resolver, mpsc::UnboundedReceiver<ProviderEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Resolver::new(config, service, tx), rx)
}

/// Receive the next event, failing the test if none arrives within an
/// hour of (usually paused) time.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<ProviderEvent>) -> ProviderEvent {
    tokio::time::timeout(Duration::from_secs(3600), rx.recv())
        .await
        .expect("timed out waiting for provider event")
        .expect("event channel closed")
}
