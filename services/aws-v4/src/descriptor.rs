use awsauth_core::time::DateTime;
use awsauth_core::{Error, Result};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use std::time::Duration;

/// A request signed and ready to be sent.
///
/// For query signing the signature lives in the url and no `authorization`
/// header is set.
pub type SignedRequest = http::Request<Bytes>;

/// RequestDescriptor describes an API call before it is signed.
///
/// The executor signs a fresh copy of the descriptor for every attempt, so
/// a descriptor can be reused freely.
///
/// The query string is re-encoded on signing: pairs go out sorted and in
/// canonical form. `+` is a literal plus and is sent as `%2B`, so spaces
/// must be written as `%20`.
///
/// ```
/// use awsauth_aws_v4::RequestDescriptor;
/// use http::Method;
///
/// let desc = RequestDescriptor::new(Method::POST, "https://sqs.eu-west-1.amazonaws.com/")
///     .unwrap()
///     .with_header("x-amz-target", "AmazonSQS.ListQueues")
///     .unwrap()
///     .with_body("{}");
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    service: Option<String>,
    region: Option<String>,
    sign_query: bool,
    expires_in: Option<Duration>,
    time: Option<DateTime>,
}

impl RequestDescriptor {
    /// Create a new descriptor for `method` on `url`.
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let uri: Uri = url.parse()?;
        if uri.authority().is_none() {
            return Err(Error::request_invalid("url must be absolute")
                .with_context(format!("url: {url}")));
        }

        Ok(Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            service: None,
            region: None,
            sign_query: false,
            expires_in: None,
            time: None,
        })
    }

    /// Add a header, replacing any previous value for the same name.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.headers.insert(
            HeaderName::from_bytes(name.as_bytes())?,
            HeaderValue::from_str(value)?,
        );
        Ok(self)
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the service, skipping detection.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the region, skipping detection.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Carry the signature in the query string instead of headers.
    pub fn with_sign_query(mut self, sign_query: bool) -> Self {
        self.sign_query = sign_query;
        self
    }

    /// Set how long a query signature stays valid.
    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    /// Sign at a fixed time. Only useful for tests.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target url.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Headers set by the caller.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Explicit service, if any.
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// Explicit region, if any.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Whether the signature goes into the query string.
    pub fn sign_query(&self) -> bool {
        self.sign_query
    }

    /// Requested expiry for query signing.
    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }

    /// Fixed signing time, if any.
    pub fn time(&self) -> Option<DateTime> {
        self.time
    }

    /// Build an unsigned request from this descriptor.
    pub fn to_request(&self) -> Result<http::Request<Bytes>> {
        let mut req = http::Request::builder()
            .method(self.method.clone())
            .uri(self.uri.clone())
            .body(self.body.clone())?;
        *req.headers_mut() = self.headers.clone();
        Ok(req)
    }
}
