use awsauth_core::{Error, Result};
use log::debug;
use std::future::Future;
use std::time::Duration;

/// Get the sts endpoint.
///
/// The returning format may look like `sts.{region}.amazonaws.com`
///
/// # Notes
///
/// AWS could have different sts endpoint based on it's region.
/// We can check them by region name.
///
/// ref: https://github.com/awslabs/aws-sdk-rust/blob/31cfae2cf23be0c68a47357070dea1aee9227e3a/sdk/sts/src/aws_endpoint.rs
pub fn sts_endpoint(region: Option<&str>, use_regional: bool) -> Result<String> {
    // use regional sts if use_regional has been set.
    if use_regional {
        let region =
            region.ok_or_else(|| Error::config_invalid("regional STS endpoint requires region"))?;
        if region.starts_with("cn-") {
            Ok(format!("sts.{region}.amazonaws.com.cn"))
        } else {
            Ok(format!("sts.{region}.amazonaws.com"))
        }
    } else {
        let region = region.unwrap_or_default();
        if region.starts_with("cn") {
            Ok("sts.amazonaws.com.cn".to_string())
        } else {
            Ok("sts.amazonaws.com".to_string())
        }
    }
}

/// Run a network backed load under `timeout`.
///
/// Any failure, including the timeout, is reported as absence so that the
/// next provider in the chain gets its turn.
pub async fn load_or_absent<T, F>(name: &str, timeout: Duration, load: F) -> Result<Option<T>>
where
    F: Future<Output = Result<Option<T>>>,
{
    match tokio::time::timeout(timeout, load).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(err)) => {
            debug!("{name} failed to load credential, treat as absent: {err:?}");
            Ok(None)
        }
        Err(_) => {
            debug!("{name} timed out after {timeout:?}, treat as absent");
            Ok(None)
        }
    }
}

/// Build an error for a non-200 response from a credential endpoint.
pub fn unexpected_status(endpoint: &str, status: http::StatusCode, body: &str) -> Error {
    Error::unexpected(format!("{endpoint} responded with status {status}"))
        .with_context(format!("body: {body}"))
}
