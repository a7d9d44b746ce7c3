use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::{Context, Error, ProvideCredential, Result};
use ini::{Ini, Properties};
use log::debug;

const DEFAULT_PROFILE: &str = "default";
const DEFAULT_CREDENTIALS_FILE: &str = "~/.aws/credentials";

/// ProfileCredentialProvider loads AWS credentials from the shared
/// credentials file.
///
/// The file is resolved in order from:
/// 1. The path set via `with_credentials_file()`
/// 2. The `AWS_SHARED_CREDENTIALS_FILE` environment variable
/// 3. `~/.aws/credentials`
///
/// The profile is resolved in order from:
/// 1. The profile set via `with_profile()`
/// 2. The `AWS_PROFILE` environment variable
/// 3. `default`
///
/// Section names and the `aws_access_key_id`, `aws_secret_access_key` and
/// `aws_session_token` keys are matched case-insensitively.
#[derive(Debug, Default, Clone)]
pub struct ProfileCredentialProvider {
    profile: Option<String>,
    credentials_file: Option<String>,
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    fn profile(&self, ctx: &Context) -> String {
        self.profile
            .clone()
            .or_else(|| ctx.env_value(AWS_PROFILE))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    fn credentials_file(&self, ctx: &Context) -> String {
        self.credentials_file
            .clone()
            .or_else(|| ctx.env_value(AWS_SHARED_CREDENTIALS_FILE))
            .unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string())
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let path = self.credentials_file(ctx);
        let Some(expanded_path) = ctx.expand_home_dir(&path) else {
            debug!("failed to expand homedir for path: {path}");
            return Ok(None);
        };

        let content = match ctx.file_read_as_string(&expanded_path).await {
            Ok(content) => content,
            Err(err) => {
                debug!("failed to read credentials file {expanded_path}: {err:?}");
                return Ok(None);
            }
        };

        let conf = Ini::load_from_str(&content).map_err(|e| {
            Error::config_invalid("failed to parse credentials file")
                .with_source(e)
                .with_context(format!("file: {expanded_path}"))
        })?;

        let profile = self.profile(ctx);
        let Some(props) = conf
            .iter()
            .find(|(name, _)| name.is_some_and(|n| n.eq_ignore_ascii_case(&profile)))
            .map(|(_, props)| props)
        else {
            debug!("profile {profile} not found in credentials file {expanded_path}");
            return Ok(None);
        };

        match (
            property(props, "aws_access_key_id"),
            property(props, "aws_secret_access_key"),
        ) {
            (Some(ak), Some(sk)) => {
                let mut cred = Credential::new(ak, sk);
                cred.session_token = property(props, "aws_session_token").map(|v| v.to_string());
                Ok(Some(cred))
            }
            _ => {
                debug!("profile {profile} has no complete access key pair");
                Ok(None)
            }
        }
    }
}

fn property<'a>(props: &'a Properties, key: &str) -> Option<&'a str> {
    props
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}
