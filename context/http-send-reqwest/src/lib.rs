//! Reqwest-based HTTP client implementation for awsauth.
//!
//! `ReqwestHttpSend` implements `HttpSend` from `awsauth_core`. It is used
//! both by credential providers talking to metadata services and STS, and
//! by the request executor to dispatch signed requests.
//!
//! ## Example
//!
//! ```no_run
//! use awsauth_core::Context;
//! use awsauth_http_send_reqwest::ReqwestHttpSend;
//! use reqwest::Client;
//! use std::time::Duration;
//!
//! let client = Client::builder()
//!     .connect_timeout(Duration::from_secs(5))
//!     .build()
//!     .unwrap();
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::new(client));
//! ```

use async_trait::async_trait;
use awsauth_core::{Error, HttpSend, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Client, Request};

/// Reqwest-based implementation of the `HttpSend` trait.
///
/// Transport failures are reported as [`awsauth_core::ErrorKind::Network`]
/// and client side timeouts as [`awsauth_core::ErrorKind::Timeout`]. The
/// response is returned as is, whatever its status.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let uri = req.uri().to_string();
        let req = Request::try_from(req).map_err(|e| {
            Error::request_invalid("failed to convert request for reqwest").with_source(e)
        })?;

        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| transport_error(e, &uri))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| transport_error(e, &uri))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

fn transport_error(err: reqwest::Error, uri: &str) -> Error {
    let redacted = awsauth_core::utils::redact_url(uri);
    let base = if err.is_timeout() {
        Error::timeout("http request timed out")
    } else {
        Error::network("failed to send http request")
    };
    base.with_source(err).with_context(format!("uri: {redacted}"))
}
