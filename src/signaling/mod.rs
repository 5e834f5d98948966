//! Signaling module for WHEP session establishment.
//!
//! - HTTP transport: offer POST, resource DELETE and config GET over hyper
//! - WHEP client: the connect/disconnect state machine

pub mod http;
pub mod whep_client;

pub use http::{HttpResponse, HttpTransport};
pub use whep_client::*;
