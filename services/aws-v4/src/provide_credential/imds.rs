use crate::constants::*;
use crate::provide_credential::utils::{load_or_absent, unexpected_status};
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::time::{now, parse_rfc3339, DateTime};
use awsauth_core::{utils::Redact, Context, Error, ProvideCredential, Result};
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::Method;
use log::debug;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
/// 21600s (6h) is recommended by AWS.
const TOKEN_TTL_SECONDS: i64 = 21600;
/// Refresh the token 10 minutes before it expires.
const TOKEN_REFRESH_BEFORE_SECONDS: i64 = 600;

/// IMDSv2CredentialProvider loads the credential of the role attached to
/// the current EC2 instance.
///
/// A session token is fetched with `PUT /latest/api/token` and kept until
/// ten minutes before its expiry. The role name is then listed and its
/// credential fetched.
///
/// Setting `AWS_EC2_METADATA_DISABLED=true` turns the provider off, and
/// `AWS_EC2_METADATA_SERVICE_ENDPOINT` overrides the endpoint. Every
/// request is bounded by a 1s timeout; any failure is reported as absence.
#[derive(Debug, Clone)]
pub struct IMDSv2CredentialProvider {
    endpoint: Option<String>,
    timeout: Duration,
    token: Arc<Mutex<(String, DateTime)>>,
}

impl Default for IMDSv2CredentialProvider {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
            token: Arc::new(Mutex::new((String::new(), DateTime::default()))),
        }
    }
}

impl IMDSv2CredentialProvider {
    /// Create a new `IMDSv2CredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint for the metadata service.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the timeout for each metadata request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, ctx: &Context) -> String {
        self.endpoint
            .clone()
            .or_else(|| {
                ctx.env_value(AWS_EC2_METADATA_SERVICE_ENDPOINT)
            })
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    async fn send(&self, ctx: &Context, req: http::Request<Bytes>) -> Result<String> {
        let url = req.uri().to_string();
        let resp = tokio::time::timeout(self.timeout, ctx.http_send_as_string(req))
            .await
            .map_err(|_| {
                Error::timeout("request to instance metadata service timed out")
                    .with_context(format!("url: {url}"))
            })??;

        if resp.status() != http::StatusCode::OK {
            return Err(unexpected_status("imds", resp.status(), resp.body())
                .with_context(format!("url: {url}")));
        }
        Ok(resp.into_body())
    }

    async fn load_token(&self, ctx: &Context, endpoint: &str) -> Result<String> {
        {
            let (token, expires_in) = self.token.lock().expect("lock poisoned").clone();
            if expires_in > now() {
                return Ok(token);
            }
        }

        let req = http::Request::builder()
            .method(Method::PUT)
            .uri(format!("{endpoint}/latest/api/token"))
            .header(CONTENT_LENGTH, "0")
            .header(
                "x-aws-ec2-metadata-token-ttl-seconds",
                TOKEN_TTL_SECONDS.to_string(),
            )
            .body(Bytes::new())?;
        let token = self.send(ctx, req).await?;

        let expires_in = now()
            + chrono::TimeDelta::seconds(TOKEN_TTL_SECONDS - TOKEN_REFRESH_BEFORE_SECONDS);
        *self.token.lock().expect("lock poisoned") = (token.clone(), expires_in);

        Ok(token)
    }

    async fn load(&self, ctx: &Context) -> Result<Option<Credential>> {
        let endpoint = self.endpoint(ctx);
        let token = self.load_token(ctx, &endpoint).await?;

        // List the role attached to this instance.
        let req = http::Request::builder()
            .method(Method::GET)
            .uri(format!("{endpoint}/latest/meta-data/iam/security-credentials/"))
            .header("x-aws-ec2-metadata-token", &token)
            .body(Bytes::new())?;
        let roles = self.send(ctx, req).await?;
        let Some(role) = roles.lines().map(str::trim).find(|v| !v.is_empty()) else {
            debug!("no IAM role attached to this instance");
            return Ok(None);
        };

        let req = http::Request::builder()
            .method(Method::GET)
            .uri(format!(
                "{endpoint}/latest/meta-data/iam/security-credentials/{role}"
            ))
            .header("x-aws-ec2-metadata-token", &token)
            .body(Bytes::new())?;
        let content = self.send(ctx, req).await?;

        let resp: Ec2MetadataIamSecurityCredentials =
            serde_json::from_str(&content).map_err(|e| {
                Error::unexpected("failed to parse IMDS credentials response")
                    .with_source(e)
                    .with_context(format!("role: {role}"))
            })?;
        if resp.code != "Success" {
            return Err(Error::credential_invalid(format!(
                "IMDS returned error: [{}] {}",
                resp.code, resp.message
            ))
            .with_context(format!("role: {role}")));
        }

        let expires_in = parse_rfc3339(&resp.expiration)?;
        Ok(Some(
            Credential::new(resp.access_key_id, resp.secret_access_key)
                .with_session_token(resp.token)
                .with_expires_in(expires_in),
        ))
    }
}

#[async_trait]
impl ProvideCredential for IMDSv2CredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if ctx.env_flag(AWS_EC2_METADATA_DISABLED) {
            debug!("instance metadata service is disabled by {AWS_EC2_METADATA_DISABLED}");
            return Ok(None);
        }

        // Three requests at most, each bounded by its own timeout.
        load_or_absent("imds", self.timeout.saturating_mul(3), self.load(ctx)).await
    }
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Ec2MetadataIamSecurityCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
    message: String,
}

impl Debug for Ec2MetadataIamSecurityCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ec2MetadataIamSecurityCredentials")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("token", &Redact::from(&self.token))
            .field("expiration", &self.expiration)
            .field("code", &self.code)
            .field("message", &self.message)
            .finish()
    }
}
