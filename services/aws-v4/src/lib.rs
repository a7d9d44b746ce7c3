//! AWS SigV4 signing and request execution.
//!
//! This crate signs requests for AWS services, loads credentials from the
//! usual AWS sources and sends signed requests with retries.
//!
//! ## Overview
//!
//! - [`RequestSigner`]: SigV4 signing in header or query mode
//! - [`SigningKeyCache`]: bounded cache of derived signing keys
//! - [`detect()`]: guess service and region from the url
//! - Credential providers: [`StaticCredentialProvider`], [`EnvCredentialProvider`],
//!   [`ProfileCredentialProvider`], [`AssumeRoleWithWebIdentityCredentialProvider`],
//!   [`EcsCredentialProvider`], [`IMDSv2CredentialProvider`] and the
//!   [`DefaultCredentialProvider`] chain
//! - [`RequestExecutor`]: sign and send with retry, backoff and timeouts, or
//!   build presigned urls
//!
//! ## Example
//!
//! ```no_run
//! use awsauth_aws_v4::{DefaultCredentialProvider, RequestDescriptor, RequestExecutor};
//! use awsauth_core::{Context, Result};
//! use http::Method;
//!
//! # async fn example(ctx: Context) -> Result<()> {
//! let executor = RequestExecutor::new(ctx, DefaultCredentialProvider::new());
//!
//! let desc = RequestDescriptor::new(Method::GET, "https://s3.us-west-2.amazonaws.com/bucket")?;
//! let resp = executor.execute(&desc).await?;
//! println!("status: {}", resp.status());
//!
//! let url = executor.presign(&desc, None).await?;
//! println!("presigned: {url}");
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

mod constants;

mod credential;
pub use credential::Credential;

mod key_cache;
pub use key_cache::{derive_signing_key, SigningKeyCache, DEFAULT_KEY_CACHE_CAPACITY};

mod detect;
pub use detect::{detect, detect_with_headers, ServiceRegion};

mod sign_request;
pub use sign_request::RequestSigner;

mod descriptor;
pub use descriptor::{RequestDescriptor, SignedRequest};

mod executor;
pub use executor::{RequestExecutor, RetryPolicy, DEFAULT_PRESIGN_EXPIRES, MAX_PRESIGN_EXPIRES};

mod provide_credential;
pub use provide_credential::*;
