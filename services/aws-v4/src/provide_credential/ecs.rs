use crate::constants::*;
use crate::provide_credential::utils::{load_or_absent, unexpected_status};
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::time::parse_rfc3339;
use awsauth_core::{utils::Redact, Context, Error, ProvideCredential, Result};
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::Method;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "http://169.254.170.2";
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// EcsCredentialProvider will load credential from ECS task metadata endpoint.
///
/// The endpoint is taken from `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`
/// (resolved against `169.254.170.2`) or else from
/// `AWS_CONTAINER_CREDENTIALS_FULL_URI`. The `Authorization` header is read
/// from the file named by `AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE` or else
/// from `AWS_CONTAINER_AUTHORIZATION_TOKEN`.
///
/// Without either uri the provider reports no credential. Any failure,
/// including the 1s timeout, is reported as absence too.
///
/// References:
/// - [IAM roles for tasks](https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-iam-roles.html)
#[derive(Debug, Clone)]
pub struct EcsCredentialProvider {
    endpoint: Option<String>,
    timeout: Duration,
}

impl Default for EcsCredentialProvider {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl EcsCredentialProvider {
    /// Create a new `EcsCredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host a relative uri is resolved against.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the timeout of the metadata request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn authorization(&self, ctx: &Context) -> Result<Option<String>> {
        if let Some(path) = ctx.env_value(AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE) {
            let token = ctx.file_read_as_string(&path).await.map_err(|e| {
                Error::config_invalid("failed to read container authorization token file")
                    .with_source(e)
                    .with_context(format!("file: {path}"))
            })?;
            return Ok(Some(token.trim().to_string()));
        }

        Ok(ctx.env_value(AWS_CONTAINER_AUTHORIZATION_TOKEN))
    }

    async fn load(&self, ctx: &Context, url: &str) -> Result<Option<Credential>> {
        let mut req = http::Request::builder().method(Method::GET).uri(url);
        if let Some(token) = self.authorization(ctx).await? {
            req = req.header(AUTHORIZATION, token);
        }
        let req = req.body(Bytes::new())?;

        let resp = ctx
            .http_send_as_string(req)
            .await
            .map_err(|e| e.with_context(format!("url: {url}")))?;
        if resp.status() != http::StatusCode::OK {
            return Err(unexpected_status("ecs task metadata", resp.status(), resp.body()));
        }

        let content = resp.into_body();
        let cred: EcsTaskCredentials = serde_json::from_str(&content).map_err(|e| {
            Error::unexpected("failed to parse ECS task credentials").with_source(e)
        })?;

        let expires_in = parse_rfc3339(&cred.expiration)?;
        Ok(Some(
            Credential::new(cred.access_key_id, cred.secret_access_key)
                .with_session_token(cred.token)
                .with_expires_in(expires_in),
        ))
    }
}

#[async_trait]
impl ProvideCredential for EcsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let relative_uri = ctx.env_value(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI);
        let full_uri = ctx.env_value(AWS_CONTAINER_CREDENTIALS_FULL_URI);

        let url = match (relative_uri, full_uri) {
            (Some(relative), _) => {
                let endpoint = self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
                format!("{}{relative}", endpoint.trim_end_matches('/'))
            }
            (None, Some(full)) => full,
            (None, None) => return Ok(None),
        };

        load_or_absent("ecs task metadata", self.timeout, self.load(ctx, &url)).await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EcsTaskCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,
}

impl Debug for EcsTaskCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcsTaskCredentials")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("token", &Redact::from(&self.token))
            .field("expiration", &self.expiration)
            .finish()
    }
}
