use crate::constants::{AWS_DEFAULT_REGION, AWS_REGION};
use crate::{Credential, RequestDescriptor, RequestSigner, SignedRequest};
use awsauth_core::utils::redact_url;
use awsauth_core::{Context, CredentialCache, Error, ErrorKind, ProvideCredential, Result};
use bytes::Bytes;
use http::StatusCode;
use log::{debug, warn};
use rand::Rng;
use std::time::Duration;

/// Expiry used by [`RequestExecutor::presign`] when none is given.
pub const DEFAULT_PRESIGN_EXPIRES: Duration = Duration::from_secs(3600);
/// Longest expiry AWS accepts for a query signature: 7 days.
pub const MAX_PRESIGN_EXPIRES: Duration = Duration::from_secs(604800);

/// RetryPolicy controls how [`RequestExecutor`] retries failed attempts.
///
/// Attempt `n` (starting at 0) that fails with a retryable status or a
/// transport error is followed by a sleep of
/// `min(initial_delay * 2^n + jitter, max_delay)`, where the jitter is up
/// to 30% of the exponential part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, before jitter.
    pub initial_delay: Duration,
    /// Upper bound of any delay.
    pub max_delay: Duration,
    /// Statuses worth another attempt.
    pub retryable_status_codes: Vec<StatusCode>,
    /// Timeout of a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(5000),
            retryable_status_codes: vec![
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::BAD_GATEWAY,
                StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::GATEWAY_TIMEOUT,
            ],
            timeout: Duration::from_millis(30000),
        }
    }
}

impl RetryPolicy {
    /// Set the number of retries, `0` disables retrying.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the upper bound of any delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the statuses worth another attempt.
    pub fn with_retryable_status_codes(
        mut self,
        codes: impl IntoIterator<Item = StatusCode>,
    ) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    /// Set the timeout of a single attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns true if `status` is worth another attempt.
    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// Delay to wait after the failed attempt `attempt`, starting at 0.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        let jitter = exp.mul_f64(rand::thread_rng().gen_range(0.0..0.3));
        exp.saturating_add(jitter).min(self.max_delay)
    }
}

/// RequestExecutor signs and sends requests to AWS.
///
/// Credentials are loaded through a [`CredentialCache`], so concurrent
/// calls share a single refresh. Every attempt is signed again, which keeps
/// `x-amz-date` current across retries.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    ctx: Context,
    credentials: CredentialCache<Credential>,
    signer: RequestSigner,
    policy: RetryPolicy,
}

impl RequestExecutor {
    /// Create an executor loading credentials from `provider`.
    pub fn new(ctx: Context, provider: impl ProvideCredential<Credential = Credential>) -> Self {
        Self {
            credentials: CredentialCache::new(ctx.clone(), provider),
            ctx,
            signer: RequestSigner::new(),
            policy: RetryPolicy::default(),
        }
    }

    /// Use `signer` for every request, e.g. to share a signing key cache or
    /// to pin service and region.
    pub fn with_signer(mut self, signer: RequestSigner) -> Self {
        self.signer = signer;
        self
    }

    /// Set the default retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The default retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The credential cache used by this executor.
    pub fn credentials(&self) -> &CredentialCache<Credential> {
        &self.credentials
    }

    /// The context used to send requests.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Build a signer for this descriptor.
    ///
    /// The region falls back to `AWS_REGION` then `AWS_DEFAULT_REGION` when
    /// it is neither given nor detectable.
    fn signer_for(&self, desc: &RequestDescriptor) -> Result<RequestSigner> {
        let mut signer = self.signer.clone();
        if let Some(service) = desc.service() {
            signer = signer.with_service(service);
        }
        if let Some(region) = desc.region() {
            signer = signer.with_region(region);
        }
        if let Some(time) = desc.time() {
            signer = signer.with_time(time);
        }

        match signer.resolve_scope(desc.uri(), desc.headers()) {
            Ok(_) => Ok(signer),
            Err(err) if err.kind() == ErrorKind::RegionUndetectable => {
                let region = self
                    .ctx
                    .env_value_of(&[AWS_REGION, AWS_DEFAULT_REGION])
                    .ok_or(err)?;
                debug!("region not detectable, use region from env: {region}");
                Ok(signer.with_region(region))
            }
            Err(err) => Err(err),
        }
    }

    async fn sign_with_expires(
        &self,
        desc: &RequestDescriptor,
        expires_in: Option<Duration>,
    ) -> Result<SignedRequest> {
        let signer = self.signer_for(desc)?;
        let cred = self.credentials.credential().await?;

        let mut req = desc.to_request()?;
        signer.sign(&mut req, &cred, expires_in)?;
        Ok(req)
    }

    /// Sign the descriptor without sending it.
    ///
    /// Query signing uses the descriptor's expiry, one hour by default and
    /// seven days at most.
    pub async fn sign(&self, desc: &RequestDescriptor) -> Result<SignedRequest> {
        let expires_in = desc.sign_query().then(|| clamp_expires(desc.expires_in()));
        self.sign_with_expires(desc, expires_in).await
    }

    /// Build a presigned url, without any network call besides loading
    /// credentials.
    ///
    /// `expires_in` overrides the descriptor's expiry. It defaults to one
    /// hour and is clamped to seven days.
    pub async fn presign(
        &self,
        desc: &RequestDescriptor,
        expires_in: Option<Duration>,
    ) -> Result<String> {
        let expires_in = clamp_expires(expires_in.or(desc.expires_in()));
        let req = self.sign_with_expires(desc, Some(expires_in)).await?;
        Ok(req.uri().to_string())
    }

    /// Sign and send the descriptor with the default retry policy.
    pub async fn execute(&self, desc: &RequestDescriptor) -> Result<http::Response<Bytes>> {
        self.execute_with_policy(desc, &self.policy).await
    }

    /// Sign and send the descriptor with `policy`.
    ///
    /// Returns the response for any 2xx status. Other statuses fail with
    /// [`ErrorKind::HttpStatus`] carrying the status and body once they are
    /// not retryable or the retries are used up. Signing errors are never
    /// retried.
    pub async fn execute_with_policy(
        &self,
        desc: &RequestDescriptor,
        policy: &RetryPolicy,
    ) -> Result<http::Response<Bytes>> {
        let mut attempt = 0;
        loop {
            let req = self.sign(desc).await?;
            let method = req.method().clone();
            let uri = req.uri().clone();

            let sent = tokio::time::timeout(policy.timeout, self.ctx.http_send(req)).await;
            let failure = match sent {
                Ok(Ok(resp)) if resp.status().is_success() => return Ok(resp),
                Ok(Ok(resp)) => {
                    let status = resp.status();
                    let err = Error::http_status(status, resp.into_body());
                    if !policy.is_retryable_status(status) {
                        return Err(err);
                    }
                    err
                }
                Ok(Err(err)) => transport_error(err),
                Err(_) => Error::timeout(format!("attempt timed out after {:?}", policy.timeout)),
            };

            let retryable = failure.kind() == ErrorKind::HttpStatus || failure.is_retryable();
            if !retryable || attempt >= policy.max_retries {
                return Err(failure
                    .with_context(format!("method: {method}"))
                    .with_context(format!("uri: {}", redact_url(&uri.to_string())))
                    .with_context(format!("attempts: {}", attempt + 1)));
            }

            let delay = policy.backoff(attempt);
            warn!(
                "{method} {} failed on attempt {}, retry in {delay:?}: {failure}",
                uri.path(),
                attempt + 1
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn clamp_expires(expires_in: Option<Duration>) -> Duration {
    expires_in
        .unwrap_or(DEFAULT_PRESIGN_EXPIRES)
        .min(MAX_PRESIGN_EXPIRES)
}

/// Keep the kinds the executor understands, anything else from the
/// transport counts as a network failure.
fn transport_error(err: Error) -> Error {
    match err.kind() {
        ErrorKind::Timeout | ErrorKind::Network | ErrorKind::RequestInvalid => err,
        _ => Error::network("failed to send request").with_source(err),
    }
}
