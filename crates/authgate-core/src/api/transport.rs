//! The wire. A `Transport` sends one already-prepared request and returns
//! the raw status and body, or a transport failure. It applies no policy.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{header, Client};
use thiserror::Error;
use tracing::debug;

use super::pipeline::ApiRequest;

/// Raw HTTP reply before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request went out (or tried to) but nothing came back
    #[error("No response received: {0}")]
    NoResponse(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            TransportError::NoResponse(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

pub trait Transport: Send + Sync {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<HttpReply, TransportError>>;

    /// Base URL requests are resolved against, for diagnostics
    fn base_url(&self) -> &str;
}

/// HTTP transport backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<HttpReply, TransportError>> {
        async move {
            let url = self.url(&request.path);
            debug!(method = %request.method, url = %url, "Sending request");

            let mut builder = self
                .client
                .request(request.method.clone(), &url)
                .headers(request.headers.clone());
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(TransportError::from_reqwest)?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Other(format!("Failed to read response body: {}", e)))?;

            Ok(HttpReply { status, body })
        }
        .boxed()
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let transport =
            ReqwestTransport::new("http://localhost:8081/", Duration::from_secs(15)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8081");
        assert_eq!(transport.url("/login"), "http://localhost:8081/login");
        assert_eq!(transport.url("admins/7"), "http://localhost:8081/admins/7");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_no_response() {
        // Port 9 (discard) on localhost is essentially never listening
        let transport =
            ReqwestTransport::new("http://127.0.0.1:9", Duration::from_secs(5)).unwrap();
        let request = ApiRequest::get("/actuator/health");
        let result = transport.send(&request).await;
        assert!(matches!(result, Err(TransportError::NoResponse(_))));
    }
}
