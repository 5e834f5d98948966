//! WHEP Client - WebRTC-HTTP Egress Protocol client.
//!
//! Pulls a receive-only session from a WHEP server (like MediaMTX).
//! Flow:
//! 1. Add recv-only audio and video transceivers
//! 2. Create SDP offer and wait for ICE gathering to complete (no trickle)
//! 3. POST offer to WHEP endpoint, expect 201 with a Location header
//! 4. Set remote answer from response body
//! 5. On disconnect: close the engine, then DELETE the resource URL

use std::fmt;
use std::time::Duration;

use hyper::header::HeaderValue;
use hyper::StatusCode;
use url::Url;

use crate::engine::{MediaKind, NegotiationEngine, PeerConnectionEngine, SessionDescription};
use crate::error::{
    CleanupFailure, ConnectError, ConstructionError, DisconnectError, EngineError,
};
use crate::ice::{google_stun_servers, IceServerConfig};
use crate::signaling::http::HttpTransport;

/// WHEP client configuration
#[derive(Clone, Debug)]
pub struct WhepConfig {
    /// WHEP endpoint URL, used as-is as the POST target
    pub endpoint_url: String,
    /// ICE servers, used when the client builds its own engine
    pub ice_servers: Vec<IceServerConfig>,
    /// Bearer token sent with the POST and the DELETE
    pub auth_token: Option<String>,
    /// Bound on the whole connect, gathering included
    pub connect_timeout: Option<Duration>,
    /// Bound on each HTTP round trip
    pub request_timeout: Option<Duration>,
}

impl Default for WhepConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            ice_servers: google_stun_servers(),
            auth_token: None,
            connect_timeout: None,
            request_timeout: None,
        }
    }
}

/// Lifecycle state of a [`WhepClient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Negotiating,
    Connected,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Negotiating => "negotiating",
            SessionState::Connected => "connected",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// The resource URL lives inside `Connected`, so it exists exactly while connected.
#[derive(Debug)]
enum Phase {
    Idle,
    Negotiating,
    Connected { resource_url: Url },
    Closed,
}

impl Phase {
    fn state(&self) -> SessionState {
        match self {
            Phase::Idle => SessionState::Idle,
            Phase::Negotiating => SessionState::Negotiating,
            Phase::Connected { .. } => SessionState::Connected,
            Phase::Closed => SessionState::Closed,
        }
    }
}

/// WHEP client driving one session over a negotiation engine.
///
/// A client handles a single session: once closed (after `disconnect` or a failed
/// `connect`) it cannot be reused. Build a new client with a fresh engine instead.
pub struct WhepClient<E: NegotiationEngine> {
    /// WHEP endpoint URL
    endpoint: Url,
    /// Negotiation engine (owned for the client's lifetime)
    engine: E,
    /// HTTP transport
    http: HttpTransport,
    connect_timeout: Option<Duration>,
    phase: Phase,
}

impl<E: NegotiationEngine> WhepClient<E> {
    /// Create a client for `endpoint_url`. No network traffic happens here.
    pub fn new(endpoint_url: &str, engine: E) -> Result<Self, ConstructionError> {
        Self::with_config(
            WhepConfig {
                endpoint_url: endpoint_url.to_string(),
                ..Default::default()
            },
            engine,
        )
    }

    /// Create a client from a full configuration. `config.ice_servers` is ignored since the
    /// engine is already built.
    pub fn with_config(config: WhepConfig, engine: E) -> Result<Self, ConstructionError> {
        let endpoint = parse_endpoint(&config.endpoint_url)?;
        let http = HttpTransport::new()
            .with_auth_token(config.auth_token)
            .with_request_timeout(config.request_timeout);

        Ok(Self {
            endpoint,
            engine,
            http,
            connect_timeout: config.connect_timeout,
            phase: Phase::Idle,
        })
    }

    pub fn state(&self) -> SessionState {
        self.phase.state()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Resource URL assigned by the server, present only while connected.
    pub fn resource_url(&self) -> Option<&Url> {
        match &self.phase {
            Phase::Connected { resource_url } => Some(resource_url),
            _ => None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Negotiate the session.
    ///
    /// Valid only from [`SessionState::Idle`]. On failure the engine is closed and the client
    /// ends up [`SessionState::Closed`]. If the returned future is dropped before it
    /// completes, the client stays [`SessionState::Negotiating`] until
    /// [`disconnect`](Self::disconnect) releases the engine.
    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(ConnectError::InvalidState(self.state()));
        }
        self.phase = Phase::Negotiating;
        log::debug!("Connecting to WHEP endpoint {}", self.endpoint);

        let outcome = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.negotiate())
                .await
                .unwrap_or(Err(ConnectError::TimedOut(limit))),
            None => self.negotiate().await,
        };

        match outcome {
            Ok(resource_url) => {
                log::info!("WHEP session connected, resource {}", resource_url);
                self.phase = Phase::Connected { resource_url };
                Ok(())
            }
            Err(err) => {
                log::debug!("WHEP connect failed: {}", err);
                self.phase = Phase::Closed;
                if let Err(close_err) = self.engine.close().await {
                    log::warn!("Failed to close engine after failed connect: {}", close_err);
                }
                Err(err)
            }
        }
    }

    /// Tear the session down.
    ///
    /// Valid from [`SessionState::Connected`]. The engine is closed first, then the
    /// resource is deleted. The client is [`SessionState::Closed`] afterwards whatever the
    /// outcome.
    ///
    /// A client left in [`SessionState::Negotiating`] had its `connect` future dropped
    /// before completion. No resource was stored, so only the engine is closed and no
    /// request is sent.
    pub async fn disconnect(&mut self) -> Result<(), DisconnectError> {
        let resource_url = match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Connected { resource_url } => resource_url,
            Phase::Negotiating => {
                log::debug!("Releasing engine of an abandoned connect to {}", self.endpoint);
                return self.engine.close().await.map_err(DisconnectError::EngineClose);
            }
            other => {
                let state = other.state();
                self.phase = other;
                return Err(DisconnectError::InvalidState(state));
            }
        };

        let engine_close = self.engine.close().await.err();
        if let Some(err) = &engine_close {
            log::warn!("Failed to close engine, deleting resource anyway: {}", err);
        }

        let cleanup = match self.http.delete(&resource_url).await {
            Ok(response) if response.status == StatusCode::OK => None,
            Ok(response) => Some(CleanupFailure::UnexpectedStatus(response.status)),
            Err(err) => Some(CleanupFailure::Transport(err)),
        };
        log::info!("WHEP session closed, resource {}", resource_url);

        match (cleanup, engine_close) {
            (None, None) => Ok(()),
            (None, Some(err)) => Err(DisconnectError::EngineClose(err)),
            (Some(cause), engine_close) => {
                log::warn!("Server resource {} may linger: {}", resource_url, cause);
                Err(DisconnectError::ResourceCleanupFailed {
                    cause,
                    engine_close,
                })
            }
        }
    }

    /// Offer/answer exchange. Returns the resource URL; never touches `self.phase`.
    async fn negotiate(&mut self) -> Result<Url, ConnectError> {
        for kind in [MediaKind::Audio, MediaKind::Video] {
            self.engine
                .add_receive_only_track(kind)
                .await
                .map_err(|source| ConnectError::EngineSetup { kind, source })?;
        }

        self.engine
            .create_offer()
            .await
            .map_err(ConnectError::OfferCreation)?;

        self.engine
            .wait_for_gathering_complete()
            .await
            .map_err(ConnectError::Gathering)?;

        // Local description now carries the full candidate set
        let offer = self
            .engine
            .local_description()
            .await
            .ok_or(ConnectError::Gathering(EngineError::NoLocalDescription))?;
        log::debug!("ICE gathering complete, offer is {} bytes", offer.sdp.len());

        let response = self.http.post_sdp(&self.endpoint, &offer.sdp).await?;

        if response.status != StatusCode::CREATED {
            return Err(ConnectError::UnexpectedStatus(response.status));
        }

        let location = response
            .location()
            .ok_or(ConnectError::MissingLocationHeader)?;
        let resource_url = resolve_location(&self.endpoint, location)?;

        let answer = String::from_utf8(response.body.to_vec()).map_err(|e| {
            ConnectError::RemoteDescriptionRejected(EngineError::InvalidDescription(format!(
                "answer is not UTF-8: {}",
                e
            )))
        })?;

        self.engine
            .set_remote_answer(SessionDescription::answer(answer))
            .await
            .map_err(ConnectError::RemoteDescriptionRejected)?;

        Ok(resource_url)
    }
}

impl WhepClient<PeerConnectionEngine> {
    /// Create a client with a webrtc-rs engine using default codecs and interceptors.
    ///
    /// The endpoint is validated before the engine is built.
    pub async fn from_config(config: WhepConfig) -> Result<Self, ConstructionError> {
        parse_endpoint(&config.endpoint_url)?;
        let engine = PeerConnectionEngine::new(&config.ice_servers).await?;
        Self::with_config(config, engine)
    }
}

fn parse_endpoint(endpoint_url: &str) -> Result<Url, ConstructionError> {
    let url = Url::parse(endpoint_url)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConstructionError::UnsupportedScheme(other.to_string())),
    }
}

/// Resolve a `Location` header against the endpoint (absolute or relative reference).
///
/// Uses RFC 3986 reference resolution: `/x` is taken from the endpoint's origin while a
/// path-relative `x` is resolved against the endpoint's directory.
fn resolve_location(endpoint: &Url, location: &HeaderValue) -> Result<Url, ConnectError> {
    let raw = location.to_str().map_err(|_| {
        ConnectError::InvalidLocationHeader(String::from_utf8_lossy(location.as_bytes()).into_owned())
    })?;

    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConnectError::MissingLocationHeader);
    }

    endpoint
        .join(raw)
        .map_err(|e| ConnectError::InvalidLocationHeader(format!("{}: {}", raw, e)))
}
