//! webrtc-rs backed negotiation engine.
//!
//! Wraps an `RTCPeerConnection` and exposes only what the WHEP handshake needs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

use super::{MediaKind, NegotiationEngine, SdpType, SessionDescription};
use crate::error::EngineError;
use crate::ice::IceServerConfig;

impl From<MediaKind> for RTPCodecType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Audio => RTPCodecType::Audio,
            MediaKind::Video => RTPCodecType::Video,
        }
    }
}

/// Negotiation engine over a webrtc-rs peer connection.
pub struct PeerConnectionEngine {
    peer_connection: Arc<RTCPeerConnection>,
    /// Armed by `create_offer`, taken by the first gathering wait
    gather_complete: Option<mpsc::Receiver<()>>,
}

impl PeerConnectionEngine {
    /// Create an engine with default codecs and interceptors.
    ///
    /// # Arguments
    /// * `ice_servers` - STUN/TURN servers for candidate gathering
    pub async fn new(ice_servers: &[IceServerConfig]) -> Result<Self, EngineError> {
        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers.iter().map(|s| s.to_rtc_ice_server()).collect(),
            ..Default::default()
        };

        Self::with_configuration(rtc_config).await
    }

    /// Create an engine with default codecs and interceptors from a full webrtc-rs
    /// configuration.
    pub async fn with_configuration(rtc_config: RTCConfiguration) -> Result<Self, EngineError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let peer_connection = api.new_peer_connection(rtc_config).await?;
        log::debug!("Created peer connection");

        Ok(Self::from_peer_connection(Arc::new(peer_connection)))
    }

    /// Wrap a peer connection built by the caller (custom codecs, interceptors or settings).
    pub fn from_peer_connection(peer_connection: Arc<RTCPeerConnection>) -> Self {
        Self {
            peer_connection,
            gather_complete: None,
        }
    }

    /// The underlying peer connection, e.g. for registering `on_track` handlers.
    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

#[async_trait]
impl NegotiationEngine for PeerConnectionEngine {
    async fn add_receive_only_track(&mut self, kind: MediaKind) -> Result<(), EngineError> {
        self.peer_connection
            .add_transceiver_from_kind(
                kind.into(),
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await?;
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<SessionDescription, EngineError> {
        let offer = self.peer_connection.create_offer(None).await?;

        // Must be armed before the local description starts gathering
        let gather_complete = self.peer_connection.gathering_complete_promise().await;

        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        self.gather_complete = Some(gather_complete);

        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn wait_for_gathering_complete(&mut self) -> Result<(), EngineError> {
        let mut gather_complete = self
            .gather_complete
            .take()
            .ok_or(EngineError::GatheringNotStarted)?;

        // A closed channel also means gathering is over
        let _ = gather_complete.recv().await;
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let desc = self.peer_connection.local_description().await?;
        let sdp_type = match desc.sdp_type {
            RTCSdpType::Answer | RTCSdpType::Pranswer => SdpType::Answer,
            _ => SdpType::Offer,
        };
        Some(SessionDescription {
            sdp_type,
            sdp: desc.sdp,
        })
    }

    async fn set_remote_answer(&mut self, answer: SessionDescription) -> Result<(), EngineError> {
        if answer.sdp_type != SdpType::Answer {
            return Err(EngineError::InvalidDescription(
                "remote description must be an answer".to_string(),
            ));
        }

        let answer = RTCSessionDescription::answer(answer.sdp)?;
        self.peer_connection.set_remote_description(answer).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.gather_complete = None;
        self.peer_connection.close().await?;
        Ok(())
    }
}
