//! Negotiation engine abstraction.
//!
//! The WHEP client only needs a narrow slice of a WebRTC stack: attach receive-only
//! transceivers, produce an offer, wait for ICE gathering, apply an answer and close.
//! [`NegotiationEngine`] captures that slice so the client can be driven by webrtc-rs
//! ([`PeerConnectionEngine`]) or by any other implementation.

use std::fmt;

use async_trait::async_trait;

use crate::error::EngineError;

pub mod peer;

pub use peer::PeerConnectionEngine;

/// Media kind of a receive-only transceiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// Offer or answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
}

/// A session description as exchanged over WHEP: SDP text plus its type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Capabilities the WHEP client drives during negotiation.
///
/// Implementations are owned exclusively by one client for its whole lifetime.
#[async_trait]
pub trait NegotiationEngine: Send + Sync {
    /// Attach a receive-only transceiver. Called for audio and video before the offer.
    async fn add_receive_only_track(&mut self, kind: MediaKind) -> Result<(), EngineError>;

    /// Create an offer and apply it as the local description.
    ///
    /// This also arms the gathering-complete signal consumed by
    /// [`wait_for_gathering_complete`](Self::wait_for_gathering_complete).
    async fn create_offer(&mut self) -> Result<SessionDescription, EngineError>;

    /// Resolve once local ICE candidate gathering has finished.
    ///
    /// One-shot per offer. Fails with [`EngineError::GatheringNotStarted`] if no offer was
    /// created, or if the signal was already consumed.
    async fn wait_for_gathering_complete(&mut self) -> Result<(), EngineError>;

    /// Current local description, including gathered candidates.
    async fn local_description(&self) -> Option<SessionDescription>;

    /// Apply the remote answer.
    async fn set_remote_answer(&mut self, answer: SessionDescription) -> Result<(), EngineError>;

    /// Release all engine resources. Safe to call before any offer and more than once.
    async fn close(&mut self) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_description_constructors() {
        let offer = SessionDescription::offer("v=0");
        assert_eq!(offer.sdp_type, SdpType::Offer);
        assert_eq!(offer.sdp, "v=0");

        let answer = SessionDescription::answer(String::from("v=0"));
        assert_eq!(answer.sdp_type, SdpType::Answer);
    }

    #[test]
    fn test_media_kind_display() {
        assert_eq!(MediaKind::Audio.to_string(), "audio");
        assert_eq!(MediaKind::Video.to_string(), "video");
    }
}
