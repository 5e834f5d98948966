//! ICE (Interactive Connectivity Establishment) configuration.
//!
//! Provides helpers for configuring STUN and TURN servers, and for fetching a peer
//! configuration document published next to a WHEP endpoint.

use hyper::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::policy::ice_transport_policy::RTCIceTransportPolicy;

use crate::error::PeerConfigError;
use crate::signaling::HttpTransport;

/// ICE server configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    #[serde(deserialize_with = "one_or_many")]
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    /// Create a STUN-only server config
    pub fn stun(url: &str) -> Self {
        Self {
            urls: vec![url.to_string()],
            username: None,
            credential: None,
        }
    }

    /// Create a TURN server config with credentials
    pub fn turn(url: &str, username: &str, credential: &str) -> Self {
        Self {
            urls: vec![url.to_string()],
            username: Some(username.to_string()),
            credential: Some(credential.to_string()),
        }
    }

    pub(crate) fn to_rtc_ice_server(&self) -> RTCIceServer {
        RTCIceServer {
            urls: self.urls.clone(),
            username: self.username.clone().unwrap_or_default(),
            credential: self.credential.clone().unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Default Google STUN servers
pub fn google_stun_servers() -> Vec<IceServerConfig> {
    vec![
        IceServerConfig::stun("stun:stun.l.google.com:19302"),
        IceServerConfig::stun("stun:stun1.l.google.com:19302"),
    ]
}

/// Create a STUN server config
pub fn stun_server(url: &str) -> IceServerConfig {
    IceServerConfig::stun(url)
}

/// Create a TURN server config with credentials
pub fn turn_server(url: &str, username: &str, credential: &str) -> IceServerConfig {
    IceServerConfig::turn(url, username, credential)
}

/// Which candidates ICE may use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceTransportPolicy {
    #[default]
    All,
    Relay,
}

impl From<IceTransportPolicy> for RTCIceTransportPolicy {
    fn from(policy: IceTransportPolicy) -> Self {
        match policy {
            IceTransportPolicy::All => RTCIceTransportPolicy::All,
            IceTransportPolicy::Relay => RTCIceTransportPolicy::Relay,
        }
    }
}

/// Peer connection settings published by a media server, e.g.
/// `{"iceServers":[{"urls":"turn:host","username":"u","credential":"c"}],"iceTransportPolicy":"relay"}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerConfig {
    #[serde(default, alias = "IceServers")]
    pub ice_servers: Vec<IceServerConfig>,
    #[serde(default, alias = "IceTransportPolicy")]
    pub ice_transport_policy: IceTransportPolicy,
}

impl PeerConfig {
    /// Convert into a webrtc-rs configuration.
    pub fn into_rtc_configuration(self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: self.ice_servers.iter().map(|s| s.to_rtc_ice_server()).collect(),
            ice_transport_policy: self.ice_transport_policy.into(),
            ..Default::default()
        }
    }
}

/// Fetch a [`PeerConfig`] document with a GET request.
///
/// # Arguments
/// * `config_url` - URL of the JSON document (e.g. "http://localhost:4000/api/pc-config")
/// * `http` - transport used for the request
pub async fn fetch_peer_config(
    config_url: &str,
    http: &HttpTransport,
) -> Result<PeerConfig, PeerConfigError> {
    let url = Url::parse(config_url)?;
    let response = http.get(&url).await?;

    if response.status != StatusCode::OK {
        return Err(PeerConfigError::UnexpectedStatus(response.status));
    }

    let config: PeerConfig = serde_json::from_slice(&response.body)?;
    log::debug!(
        "Fetched peer config from {}: {} ICE server(s), policy {:?}",
        url,
        config.ice_servers.len(),
        config.ice_transport_policy
    );
    Ok(config)
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(url) => vec![url],
        OneOrMany::Many(urls) => urls,
    })
}
