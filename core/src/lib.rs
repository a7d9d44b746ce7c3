//! Core components for authenticating API requests.
//!
//! This crate provides the foundational types and traits shared by the
//! awsauth crates: capabilities, credential loading, caching and signing.
//!
//! ## Overview
//!
//! - **Context**: A container that holds implementations for file reading, HTTP sending and environment access
//! - **Traits**: Abstract interfaces for credential loading (`ProvideCredential`) and request signing (`SignRequest`)
//! - **CredentialCache**: Caches a provider's credential and refreshes it with at most one refresh in flight
//! - **Signer**: Coordinates credential loading and request signing
//!
//! ## Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use awsauth_core::{Context, ProvideCredential, Result, SignRequest, Signer, SigningCredential};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyLoader;
//!
//! #[async_trait]
//! impl ProvideCredential for MyLoader {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(&self, ctx: &Context) -> Result<Option<MyCredential>> {
//!         Ok(ctx.env_var("MY_KEY").map(|key| MyCredential { key }))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyBuilder;
//!
//! #[async_trait]
//! impl SignRequest for MyBuilder {
//!     type Credential = MyCredential;
//!
//!     async fn sign_request(
//!         &self,
//!         _: &Context,
//!         req: &mut http::Request<Bytes>,
//!         cred: &MyCredential,
//!         _: Option<Duration>,
//!     ) -> Result<()> {
//!         req.headers_mut().insert("x-api-key", cred.key.parse()?);
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let signer = Signer::new(Context::new(), MyLoader, MyBuilder);
//!
//! let mut req = http::Request::get("https://example.com").body(Bytes::new())?;
//! signer.sign(&mut req, None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing with pluggable backends
//! - [`time`]: Time formatting and parsing
//! - [`utils`]: Data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};
mod context;
pub use context::{
    Context, Env, FileRead, HttpSend, NoopEnv, NoopFileRead, NoopHttpSend, OsEnv, StaticEnv,
};
mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod chain;
pub use chain::ProvideCredentialChain;
mod cache;
pub use cache::CredentialCache;
mod request;
pub use request::SigningRequest;
mod signer;
pub use signer::Signer;
