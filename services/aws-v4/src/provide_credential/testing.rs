//! Test helpers shared by provider tests.

use async_trait::async_trait;
use awsauth_core::{HttpSend, Result};
use bytes::Bytes;
use http::{Method, StatusCode};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves canned responses by method and path, and records what it saw.
#[derive(Debug, Clone, Default)]
pub struct MockHttpSend {
    routes: Arc<Mutex<Vec<(Method, String, StatusCode, String)>>>,
    requests: Arc<Mutex<Vec<http::Request<Bytes>>>>,
    delay: Option<Duration>,
}

impl MockHttpSend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.routes.lock().unwrap().push((
            method,
            path.to_string(),
            StatusCode::from_u16(status).unwrap(),
            body.to_string(),
        ));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<(Method, String, http::HeaderMap)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| (r.method().clone(), r.uri().to_string(), r.headers().clone()))
            .collect()
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let found = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|(m, p, _, _)| m == req.method() && p == req.uri().path())
            .map(|(_, _, status, body)| (*status, body.clone()));
        self.requests.lock().unwrap().push(req);

        let (status, body) = found.unwrap_or((StatusCode::NOT_FOUND, String::new()));
        Ok(http::Response::builder()
            .status(status)
            .body(Bytes::from(body))
            .unwrap())
    }
}
