// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::{Error, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything credential loading and request dispatch need from outside the
/// process: a file reader, an HTTP transport and an environment.
///
/// Nothing is wired by default. An unset file reader or transport fails on
/// use and an unset environment is empty, so a bare `Context::new()` can
/// still sign with explicit credentials.
///
/// ```
/// use awsauth_core::{Context, OsEnv};
///
/// let ctx = Context::new().with_env(OsEnv);
/// assert!(ctx.env_value("AWSAUTH_SURELY_UNSET").is_none());
/// ```
#[derive(Clone)]
pub struct Context {
    fs: Arc<dyn FileRead>,
    http: Arc<dyn HttpSend>,
    env: Arc<dyn Env>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("fs", &self.fs)
            .field("http", &self.http)
            .field("env", &self.env)
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context with nothing wired.
    pub fn new() -> Self {
        Self {
            fs: Arc::new(NoopFileRead),
            http: Arc::new(NoopHttpSend),
            env: Arc::new(NoopEnv),
        }
    }

    /// Use `fs` to read credential and token files.
    pub fn with_file_read(mut self, fs: impl FileRead) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    /// Use `http` for metadata, STS and signed requests.
    pub fn with_http_send(mut self, http: impl HttpSend) -> Self {
        self.http = Arc::new(http);
        self
    }

    /// Use `env` for environment variables and the home directory.
    pub fn with_env(mut self, env: impl Env) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Read a whole file.
    #[inline]
    pub async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        self.fs.file_read(path).await
    }

    /// Read a whole file that must be valid UTF-8.
    pub async fn file_read_as_string(&self, path: &str) -> Result<String> {
        let bytes = self.file_read(path).await?;
        String::from_utf8(bytes).map_err(|e| Error::from(e).with_context(format!("path: {path}")))
    }

    /// Send `req` through the configured transport.
    #[inline]
    pub async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.http.http_send(req).await
    }

    /// Send `req` and decode the body lossily, for the small text and JSON
    /// documents served by credential endpoints.
    pub async fn http_send_as_string(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<String>> {
        let (parts, body) = self.http.http_send(req).await?.into_parts();
        let body = String::from_utf8_lossy(&body).into_owned();
        Ok(http::Response::from_parts(parts, body))
    }

    /// Home directory of the current user, if known.
    #[inline]
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.env.home_dir()
    }

    /// Expand a leading `~/` (or `~\`) to the home directory.
    ///
    /// Returns `None` only when expansion is needed and no home directory
    /// is known.
    pub fn expand_home_dir(&self, path: &str) -> Option<String> {
        match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
            None => Some(path.to_string()),
            Some(rest) => {
                let home = self.home_dir()?;
                Some(home.join(rest).to_string_lossy().into_owned())
            }
        }
    }

    /// Raw environment lookup, empty values included.
    #[inline]
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env.var(key)
    }

    /// Every environment variable.
    #[inline]
    pub fn env_vars(&self) -> HashMap<String, String> {
        self.env.vars()
    }

    /// Environment lookup where an empty value counts as unset.
    pub fn env_value(&self, key: &str) -> Option<String> {
        self.env.var(key).filter(|v| !v.is_empty())
    }

    /// First non-empty value among `keys`, in order.
    pub fn env_value_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.env_value(key))
    }

    /// Whether `key` is set to `true`, ignoring case.
    pub fn env_flag(&self, key: &str) -> bool {
        self.env_value(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

/// Reads whole files: the shared credentials file, web identity tokens and
/// container authorization tokens.
#[async_trait::async_trait]
pub trait FileRead: Debug + Send + Sync + 'static {
    /// Read `path` entirely.
    async fn file_read(&self, path: &str) -> Result<Vec<u8>>;
}

/// Sends one HTTP request, for credential endpoints (IMDS, ECS, STS) as
/// well as signed requests.
///
/// Implementations return every response as is whatever its status, and
/// report transport failures as [`crate::ErrorKind::Network`] or
/// [`crate::ErrorKind::Timeout`].
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send `req` and buffer the whole response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}

/// Source of environment variables and the home directory.
pub trait Env: Debug + Send + Sync + 'static {
    /// `None` when unset or not valid UTF-8.
    fn var(&self, key: &str) -> Option<String>;

    /// Every variable, for lookups over many keys.
    fn vars(&self) -> HashMap<String, String>;

    /// `None` when no home directory can be determined.
    fn home_dir(&self) -> Option<PathBuf>;
}

/// The process environment, with the home directory from the `home` crate.
#[derive(Debug, Copy, Clone)]
pub struct OsEnv;

impl Env for OsEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var_os(key)?.into_string().ok()
    }

    fn vars(&self) -> HashMap<String, String> {
        std::env::vars().collect()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        home::home_dir()
    }
}

/// A fixed environment, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    /// Returned by `home_dir`.
    pub home_dir: Option<PathBuf>,
    /// Variables by name.
    pub envs: HashMap<String, String>,
}

impl Env for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.envs.get(key).cloned()
    }

    fn vars(&self) -> HashMap<String, String> {
        self.envs.clone()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir.clone()
    }
}

/// Fails every read.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFileRead;

#[async_trait::async_trait]
impl FileRead for NoopFileRead {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        Err(Error::unexpected("no file reader configured").with_context(format!("path: {path}")))
    }
}

/// Fails every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHttpSend;

#[async_trait::async_trait]
impl HttpSend for NoopHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        Err(Error::unexpected("no http client configured")
            .with_context(format!("uri: {}", crate::utils::redact_url(&req.uri().to_string()))))
    }
}

/// An empty environment without home directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnv;

impl Env for NoopEnv {
    fn var(&self, _key: &str) -> Option<String> {
        None
    }

    fn vars(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home_dir() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: Some(PathBuf::from("/home/alice")),
            envs: HashMap::new(),
        });

        assert_eq!(
            ctx.expand_home_dir("~/.aws/credentials").as_deref(),
            Some("/home/alice/.aws/credentials")
        );
        assert_eq!(
            ctx.expand_home_dir("/etc/credentials").as_deref(),
            Some("/etc/credentials")
        );
        assert_eq!(Context::new().expand_home_dir("~/.aws/credentials"), None);
    }

    #[test]
    fn test_env_value() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([
                ("AWS_REGION".to_string(), "".to_string()),
                ("AWS_DEFAULT_REGION".to_string(), "eu-west-1".to_string()),
                ("AWS_EC2_METADATA_DISABLED".to_string(), "TRUE".to_string()),
                ("AWS_STS_REGIONAL_ENDPOINTS".to_string(), "legacy".to_string()),
            ]),
        });

        assert_eq!(ctx.env_var("AWS_REGION").as_deref(), Some(""));
        assert_eq!(ctx.env_value("AWS_REGION"), None);
        assert_eq!(
            ctx.env_value_of(&["AWS_REGION", "AWS_DEFAULT_REGION"]).as_deref(),
            Some("eu-west-1")
        );
        assert!(ctx.env_flag("AWS_EC2_METADATA_DISABLED"));
        assert!(!ctx.env_flag("AWS_STS_REGIONAL_ENDPOINTS"));
        assert!(!ctx.env_flag("AWS_PROFILE"));
    }

    #[tokio::test]
    async fn test_noop_components_fail() {
        let ctx = Context::new();
        assert!(ctx.file_read("/etc/hosts").await.is_err());
        assert!(ctx
            .http_send(http::Request::new(Bytes::new()))
            .await
            .is_err());
        assert!(ctx.env_var("HOME").is_none());
    }
}
