//! Error types for the WHEP client.

use std::time::Duration;

use hyper::StatusCode;
use thiserror::Error;

use crate::engine::MediaKind;
use crate::signaling::SessionState;

/// Errors raised while building a client.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("Failed to create negotiation engine: {0}")]
    Engine(#[from] EngineError),
}

/// Errors reported by a negotiation engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("WebRTC error: {0}")]
    Webrtc(#[from] webrtc::Error),

    #[error("Invalid session description: {0}")]
    InvalidDescription(String),

    #[error("No local description available")]
    NoLocalDescription,

    #[error("ICE gathering has not been started (create an offer first)")]
    GatheringNotStarted,

    #[error("Engine is closed")]
    Closed,
}

/// Failures sending an HTTP request or reading its response.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to build request: {0}")]
    InvalidRequest(#[from] hyper::http::Error),

    #[error("Request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("Failed to read response body: {0}")]
    Body(#[from] hyper::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from [`WhepClient::connect`](crate::WhepClient::connect).
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Cannot connect from state {0}")]
    InvalidState(SessionState),

    #[error("Failed to add receive-only {kind} transceiver: {source}")]
    EngineSetup {
        kind: MediaKind,
        #[source]
        source: EngineError,
    },

    #[error("Failed to create offer: {0}")]
    OfferCreation(#[source] EngineError),

    #[error("ICE gathering failed: {0}")]
    Gathering(#[source] EngineError),

    #[error("WHEP request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("WHEP server returned {0}, expected 201 Created")]
    UnexpectedStatus(StatusCode),

    #[error("No Location header in the WHEP response")]
    MissingLocationHeader,

    #[error("Invalid Location header: {0}")]
    InvalidLocationHeader(String),

    #[error("Answer rejected: {0}")]
    RemoteDescriptionRejected(#[source] EngineError),

    #[error("Connect timed out after {0:?}")]
    TimedOut(Duration),
}

impl ConnectError {
    /// True when the server answered outside the WHEP contract.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ConnectError::UnexpectedStatus(_)
                | ConnectError::MissingLocationHeader
                | ConnectError::InvalidLocationHeader(_)
        )
    }
}

/// Why the server-side resource could not be removed.
#[derive(Error, Debug)]
pub enum CleanupFailure {
    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("server returned {0}, expected 200 OK")]
    UnexpectedStatus(StatusCode),
}

/// Errors from [`WhepClient::disconnect`](crate::WhepClient::disconnect).
///
/// Local resources are released and the client is closed regardless of which error is
/// returned.
#[derive(Error, Debug)]
pub enum DisconnectError {
    #[error("Cannot disconnect from state {0}")]
    InvalidState(SessionState),

    #[error("Failed to remove server resource: {cause}")]
    ResourceCleanupFailed {
        cause: CleanupFailure,
        /// Engine close failure recorded before the DELETE was attempted.
        engine_close: Option<EngineError>,
    },

    #[error("Failed to close negotiation engine: {0}")]
    EngineClose(#[source] EngineError),
}

/// Errors fetching the JSON peer configuration.
#[derive(Error, Debug)]
pub enum PeerConfigError {
    #[error("Invalid peer config URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Peer config request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Peer config request returned {0}")]
    UnexpectedStatus(StatusCode),

    #[error("Failed to decode peer config: {0}")]
    Decode(#[from] serde_json::Error),
}
