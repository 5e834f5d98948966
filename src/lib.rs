//! whep-client: WebRTC-HTTP Egress Protocol client.
//!
//! Pulls a receive-only WebRTC session from a WHEP endpoint and tears it down again.
//! Negotiation is non-trickle: the client waits for ICE gathering to finish, so a whole
//! session costs exactly two HTTP requests (one POST, one DELETE).
//!
//! ## Layout
//!
//! - [`engine`]: the [`NegotiationEngine`] capability trait and its webrtc-rs adapter
//! - [`signaling`]: HTTP transport and the [`WhepClient`] state machine
//! - [`ice`]: ICE server configuration and the JSON peer configuration fetch
//! - [`blocking`]: synchronous wrapper over a shared tokio runtime
//!
//! ## Example
//!
//! ```no_run
//! use whep_client::{PeerConnectionEngine, WhepClient, google_stun_servers};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = PeerConnectionEngine::new(&google_stun_servers()).await?;
//! let mut client = WhepClient::new("http://localhost:8889/mystream/whep", engine)?;
//!
//! client.connect().await?;
//! // ... consume tracks via client.engine().peer_connection() ...
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod engine;
pub mod error;
pub mod ice;
pub mod signaling;

#[cfg(test)]
mod test_support;

pub use engine::{MediaKind, NegotiationEngine, PeerConnectionEngine, SdpType, SessionDescription};
pub use error::{
    CleanupFailure, ConnectError, ConstructionError, DisconnectError, EngineError,
    PeerConfigError, TransportError,
};
pub use ice::{fetch_peer_config, google_stun_servers, IceServerConfig, PeerConfig};
pub use signaling::{HttpTransport, SessionState, WhepClient, WhepConfig};

/// Content type of SDP offer and answer bodies.
pub const WHEP_CONTENT_TYPE: &str = "application/sdp";
