//! HTTP transport for WHEP requests.
//!
//! One pooled hyper client (TLS via rustls with webpki roots) shared by the offer POST,
//! the resource DELETE and the peer config GET.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use hyper::{Method, Request, StatusCode};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::error::TransportError;
use crate::WHEP_CONTENT_TYPE;

/// A fully read HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    /// Raw `Location` header, if present.
    pub fn location(&self) -> Option<&HeaderValue> {
        self.headers.get(LOCATION)
    }
}

/// HTTP client used by the WHEP handshake.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    /// Sent as `Authorization: Bearer <token>` on every request
    auth_token: Option<String>,
    /// Bound on each round trip, body included
    request_timeout: Option<Duration>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Create a transport for http and https endpoints.
    pub fn new() -> Self {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        Self {
            client: Client::builder(TokioExecutor::new()).build(https),
            auth_token: None,
            request_timeout: None,
        }
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// POST an SDP document.
    pub async fn post_sdp(&self, url: &Url, sdp: &str) -> Result<HttpResponse, TransportError> {
        let request = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, WHEP_CONTENT_TYPE)
            .body(Full::new(Bytes::from(sdp.to_owned())))?;

        self.send(request).await
    }

    /// DELETE a resource.
    pub async fn delete(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let request = self
            .request(Method::DELETE, url)
            .body(Full::new(Bytes::new()))?;

        self.send(request).await
    }

    /// GET a document.
    pub async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let request = self.request(Method::GET, url).body(Full::new(Bytes::new()))?;

        self.send(request).await
    }

    fn request(&self, method: Method, url: &Url) -> hyper::http::request::Builder {
        let builder = Request::builder().method(method).uri(url.as_str());
        match &self.auth_token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> Result<HttpResponse, TransportError> {
        let method = request.method().clone();
        let uri = request.uri().clone();
        log::debug!("{} {}", method, uri);

        let exchange = async {
            let response = self.client.request(request).await?;
            let (parts, body) = response.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, TransportError>(HttpResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        let response = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| TransportError::Timeout(limit))??,
            None => exchange.await?,
        };

        log::debug!(
            "{} {} -> {} ({} bytes)",
            method,
            uri,
            response.status,
            response.body.len()
        );
        Ok(response)
    }
}
