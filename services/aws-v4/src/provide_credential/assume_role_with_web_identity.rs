use crate::constants::*;
use crate::provide_credential::utils::{load_or_absent, sts_endpoint, unexpected_status};
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::time::parse_rfc3339;
use awsauth_core::{utils::Redact, Context, Error, ProvideCredential, Result};
use bytes::Bytes;
use quick_xml::de;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

const DEFAULT_SESSION_NAME: &str = "awsauth";
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// AssumeRoleWithWebIdentityCredentialProvider exchanges a web identity
/// token for temporary credentials through STS.
///
/// This provider reads configuration from:
/// 1. Builder methods (if provided)
/// 2. `AWS_ROLE_ARN`, `AWS_WEB_IDENTITY_TOKEN_FILE`, `AWS_ROLE_SESSION_NAME`,
///    `AWS_REGION` and `AWS_STS_REGIONAL_ENDPOINTS`
///
/// Both a role ARN and a token file are required, otherwise the provider
/// reports no credential. Any failure while talking to STS, including the
/// 5s timeout, is reported as absence too.
#[derive(Debug, Clone)]
pub struct AssumeRoleWithWebIdentityCredentialProvider {
    role_arn: Option<String>,
    role_session_name: Option<String>,
    web_identity_token_file: Option<String>,

    region: Option<String>,
    use_regional_sts_endpoint: Option<bool>,
    endpoint: Option<String>,
    timeout: Duration,
}

impl Default for AssumeRoleWithWebIdentityCredentialProvider {
    fn default() -> Self {
        Self {
            role_arn: None,
            role_session_name: None,
            web_identity_token_file: None,
            region: None,
            use_regional_sts_endpoint: None,
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl AssumeRoleWithWebIdentityCredentialProvider {
    /// Create a new provider that reads its configuration from environment variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role ARN.
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Set the web identity token file path.
    pub fn with_web_identity_token_file(mut self, token_file: impl Into<String>) -> Self {
        self.web_identity_token_file = Some(token_file.into());
        self
    }

    /// Set the role session name.
    pub fn with_role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = Some(name.into());
        self
    }

    /// Set the region used to pick the STS endpoint.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Use regional STS endpoint.
    pub fn with_regional_sts_endpoint(mut self) -> Self {
        self.use_regional_sts_endpoint = Some(true);
        self
    }

    /// Send the exchange to `endpoint` (e.g. `http://127.0.0.1:8080`) instead of STS.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the timeout of the whole exchange.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn load(
        &self,
        ctx: &Context,
        role_arn: &str,
        token_file: &str,
    ) -> Result<Option<Credential>> {
        let token = ctx.file_read_as_string(token_file).await.map_err(|e| {
            Error::config_invalid("failed to read web identity token file")
                .with_source(e)
                .with_context(format!("file: {token_file}"))
        })?;

        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => {
                let region = self.region.clone().or_else(|| ctx.env_value(AWS_REGION));
                let use_regional = self.use_regional_sts_endpoint.unwrap_or_else(|| {
                    ctx.env_value(AWS_STS_REGIONAL_ENDPOINTS).as_deref() == Some("regional")
                });
                format!("https://{}", sts_endpoint(region.as_deref(), use_regional)?)
            }
        };

        let session_name = self
            .role_session_name
            .clone()
            .or_else(|| ctx.env_value(AWS_ROLE_SESSION_NAME))
            .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string());

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "AssumeRoleWithWebIdentity")
            .append_pair("RoleArn", role_arn)
            .append_pair("WebIdentityToken", token.trim())
            .append_pair("Version", "2011-06-15")
            .append_pair("RoleSessionName", &session_name)
            .finish();

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(format!("{endpoint}/?{query}"))
            .header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Bytes::new())?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            e.with_context(format!("role_arn: {role_arn}"))
                .with_context(format!("endpoint: {endpoint}"))
        })?;
        if resp.status() != http::StatusCode::OK {
            return Err(unexpected_status("sts", resp.status(), resp.body())
                .with_context(format!("role_arn: {role_arn}")));
        }

        let body = resp.into_body();
        let resp: AssumeRoleWithWebIdentityResponse = de::from_str(&body).map_err(|e| {
            Error::unexpected("failed to parse STS AssumeRoleWithWebIdentity response")
                .with_source(e)
                .with_context(format!("role_arn: {role_arn}"))
        })?;
        let resp_cred = resp.result.credentials;

        let expires_in = parse_rfc3339(&resp_cred.expiration)?;
        Ok(Some(
            Credential::new(resp_cred.access_key_id, resp_cred.secret_access_key)
                .with_session_token(resp_cred.session_token)
                .with_expires_in(expires_in),
        ))
    }
}

#[async_trait]
impl ProvideCredential for AssumeRoleWithWebIdentityCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let role_arn = self.role_arn.clone().or_else(|| ctx.env_value(AWS_ROLE_ARN));
        let token_file = self
            .web_identity_token_file
            .clone()
            .or_else(|| ctx.env_value(AWS_WEB_IDENTITY_TOKEN_FILE));

        let (Some(role_arn), Some(token_file)) = (role_arn, token_file) else {
            return Ok(None);
        };

        load_or_absent(
            "AssumeRoleWithWebIdentity",
            self.timeout,
            self.load(ctx, &role_arn, &token_file),
        )
        .await
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityResponse {
    #[serde(rename = "AssumeRoleWithWebIdentityResult")]
    result: AssumeRoleWithWebIdentityResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityResult {
    credentials: AssumeRoleWithWebIdentityCredentials,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}

impl Debug for AssumeRoleWithWebIdentityCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssumeRoleWithWebIdentityCredentials")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expiration", &self.expiration)
            .finish()
    }
}
