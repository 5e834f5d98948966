//! Blocking WHEP client.
//!
//! Runs the async client on a shared tokio runtime so `connect` and `disconnect` can be
//! called from plain threads (CLI tools, FFI hosts). Do not call these from inside an
//! async context; use [`crate::WhepClient`] there.

use std::future::Future;

use lazy_static::lazy_static;
use tokio::runtime::Runtime;
use url::Url;
use webrtc::peer_connection::configuration::RTCConfiguration;

use crate::engine::{NegotiationEngine, PeerConnectionEngine};
use crate::error::{
    ConnectError, ConstructionError, DisconnectError, EngineError, PeerConfigError,
};
use crate::ice::PeerConfig;
use crate::signaling::{HttpTransport, SessionState, WhepConfig};

lazy_static! {
    /// Shared tokio runtime for blocking operations and webrtc-rs background tasks
    static ref RUNTIME: Runtime = Runtime::new().expect("Failed to create tokio runtime");
}

/// Run a future to completion on the shared runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    RUNTIME.block_on(future)
}

/// Build a webrtc-rs engine (default codecs and interceptors) on the shared runtime.
pub fn create_engine(rtc_config: RTCConfiguration) -> Result<PeerConnectionEngine, EngineError> {
    block_on(PeerConnectionEngine::with_configuration(rtc_config))
}

/// Fetch a JSON peer configuration.
pub fn fetch_peer_config(config_url: &str) -> Result<PeerConfig, PeerConfigError> {
    block_on(async {
        let http = HttpTransport::new();
        crate::ice::fetch_peer_config(config_url, &http).await
    })
}

/// Synchronous counterpart of [`crate::WhepClient`].
pub struct WhepClient<E: NegotiationEngine> {
    inner: crate::WhepClient<E>,
}

impl<E: NegotiationEngine> WhepClient<E> {
    pub fn new(endpoint_url: &str, engine: E) -> Result<Self, ConstructionError> {
        Ok(Self {
            inner: crate::WhepClient::new(endpoint_url, engine)?,
        })
    }

    pub fn with_config(config: WhepConfig, engine: E) -> Result<Self, ConstructionError> {
        Ok(Self {
            inner: crate::WhepClient::with_config(config, engine)?,
        })
    }

    /// Negotiate the session, blocking until connected or failed.
    pub fn connect(&mut self) -> Result<(), ConnectError> {
        RUNTIME.block_on(self.inner.connect())
    }

    /// Tear the session down, blocking until the DELETE completes or fails.
    pub fn disconnect(&mut self) -> Result<(), DisconnectError> {
        RUNTIME.block_on(self.inner.disconnect())
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    pub fn endpoint(&self) -> &Url {
        self.inner.endpoint()
    }

    pub fn resource_url(&self) -> Option<&Url> {
        self.inner.resource_url()
    }

    pub fn engine(&self) -> &E {
        self.inner.engine()
    }

    pub fn into_async(self) -> crate::WhepClient<E> {
        self.inner
    }
}

impl WhepClient<PeerConnectionEngine> {
    /// Create a client with a webrtc-rs engine built from `config.ice_servers`.
    pub fn from_config(config: WhepConfig) -> Result<Self, ConstructionError> {
        Ok(Self {
            inner: block_on(crate::WhepClient::from_config(config))?,
        })
    }
}
