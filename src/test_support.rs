//! Test doubles: a scripted negotiation engine and a mock WHEP HTTP server.
//!
//! Both write into one shared event log so tests can check the relative order of engine
//! calls and HTTP requests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinSet;

use crate::engine::{MediaKind, NegotiationEngine, SessionDescription};
use crate::error::EngineError;

pub const MOCK_OFFER: &str = "v=0\r\n\
o=- 1 1 IN IP4 0.0.0.0\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
a=recvonly\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=recvonly\r\n";

pub const MOCK_CANDIDATE: &str = "a=candidate:1 1 udp 2130706431 127.0.0.1 50000 typ host\r\n";

pub const MOCK_ANSWER: &str = "v=0\r\n\
o=- 2 2 IN IP4 0.0.0.0\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
a=sendonly\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=sendonly\r\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    AddTrack(MediaKind),
    CreateOffer,
    GatheringComplete,
    SetRemoteAnswer(String),
    EngineClose,
    Post {
        path: String,
        content_type: Option<String>,
        authorization: Option<String>,
        body: String,
    },
    Delete {
        path: String,
        authorization: Option<String>,
    },
    Get {
        path: String,
    },
    Other {
        method: String,
        path: String,
    },
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn close_count(events: &[Event]) -> usize {
    events.iter().filter(|e| **e == Event::EngineClose).count()
}

/// Scripted engine. Failure switches are set directly on the struct.
pub struct MockEngine {
    events: EventLog,
    pub fail_track: Option<MediaKind>,
    pub fail_offer: bool,
    pub fail_gather: bool,
    /// Report no local description once gathering is done
    pub no_local_description: bool,
    pub reject_answer: bool,
    pub fail_close: bool,
    pub gather_delay: Option<Duration>,
    gathering_armed: bool,
    gathered: bool,
}

impl MockEngine {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            fail_track: None,
            fail_offer: false,
            fail_gather: false,
            no_local_description: false,
            reject_answer: false,
            fail_close: false,
            gather_delay: None,
            gathering_armed: false,
            gathered: false,
        }
    }

    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl NegotiationEngine for MockEngine {
    async fn add_receive_only_track(&mut self, kind: MediaKind) -> Result<(), EngineError> {
        if self.fail_track == Some(kind) {
            return Err(EngineError::Closed);
        }
        self.record(Event::AddTrack(kind));
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<SessionDescription, EngineError> {
        if self.fail_offer {
            return Err(EngineError::InvalidDescription("no transceivers".to_string()));
        }
        self.record(Event::CreateOffer);
        self.gathering_armed = true;
        Ok(SessionDescription::offer(MOCK_OFFER))
    }

    async fn wait_for_gathering_complete(&mut self) -> Result<(), EngineError> {
        if !std::mem::take(&mut self.gathering_armed) {
            return Err(EngineError::GatheringNotStarted);
        }
        if let Some(delay) = self.gather_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_gather {
            return Err(EngineError::Closed);
        }
        self.gathered = true;
        self.record(Event::GatheringComplete);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        if self.no_local_description {
            None
        } else if self.gathered {
            Some(SessionDescription::offer(format!("{}{}", MOCK_OFFER, MOCK_CANDIDATE)))
        } else {
            Some(SessionDescription::offer(MOCK_OFFER))
        }
    }

    async fn set_remote_answer(&mut self, answer: SessionDescription) -> Result<(), EngineError> {
        if self.reject_answer || !answer.sdp.starts_with("v=0") {
            return Err(EngineError::InvalidDescription("unparseable answer".to_string()));
        }
        self.record(Event::SetRemoteAnswer(answer.sdp));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.record(Event::EngineClose);
        if self.fail_close {
            return Err(EngineError::Closed);
        }
        Ok(())
    }
}

/// What the mock server answers.
#[derive(Clone, Debug)]
pub struct MockResponse {
    pub post_status: u16,
    /// `Location` header for the POST response; `None` omits it
    pub location: Option<HeaderValue>,
    /// POST response body, raw so tests can send bytes that are not UTF-8
    pub answer: Bytes,
    pub delete_status: u16,
    pub get_status: u16,
    pub get_body: String,
    /// Delay before every response
    pub delay: Option<Duration>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            post_status: 201,
            location: Some(HeaderValue::from_static("/resource/abc123")),
            answer: Bytes::from_static(MOCK_ANSWER.as_bytes()),
            delete_status: 200,
            get_status: 200,
            get_body: "{}".to_string(),
            delay: None,
        }
    }
}

/// Minimal WHEP server on 127.0.0.1. Stops (and drops open connections) when dropped.
pub struct MockWhepServer {
    addr: SocketAddr,
    events: EventLog,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockWhepServer {
    pub async fn start(response: MockResponse) -> Self {
        Self::start_with_log(response, new_log()).await
    }

    pub async fn start_with_log(response: MockResponse, events: EventLog) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let response = Arc::new(response);
        let log = events.clone();

        tokio::spawn(async move {
            // Dropping the set aborts live connections
            let mut connections = JoinSet::new();
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { continue };
                        let io = TokioIo::new(stream);
                        let response = response.clone();
                        let log = log.clone();

                        connections.spawn(async move {
                            let service = service_fn(move |req| {
                                let response = response.clone();
                                let log = log.clone();
                                async move { handle_request(req, &response, &log).await }
                            });
                            let _ = http1::Builder::new().serve_connection(io, service).await;
                        });
                    }
                }
            }
        });

        Self {
            addr,
            events,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl Drop for MockWhepServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    script: &MockResponse,
    log: &EventLog,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let (content_type, authorization) = {
        let header = |name| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        (header(CONTENT_TYPE), header(AUTHORIZATION))
    };
    let body = req.into_body().collect().await?.to_bytes();

    if let Some(delay) = script.delay {
        tokio::time::sleep(delay).await;
    }

    let mut builder = Response::builder();
    let response = match method {
        Method::POST => {
            log.lock().push(Event::Post {
                path,
                content_type,
                authorization,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
            builder = builder.status(script.post_status);
            if let Some(location) = &script.location {
                builder = builder.header(LOCATION, location.clone());
            }
            builder
                .header(CONTENT_TYPE, "application/sdp")
                .body(Full::new(script.answer.clone()))
        }
        Method::DELETE => {
            log.lock().push(Event::Delete {
                path,
                authorization,
            });
            builder
                .status(script.delete_status)
                .body(Full::new(Bytes::new()))
        }
        Method::GET => {
            log.lock().push(Event::Get { path });
            builder
                .status(script.get_status)
                .header(CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(script.get_body.clone())))
        }
        other => {
            log.lock().push(Event::Other {
                method: other.to_string(),
                path,
            });
            builder
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .body(Full::new(Bytes::new()))
        }
    };

    Ok(response.unwrap())
}
