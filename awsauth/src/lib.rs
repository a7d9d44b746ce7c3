//! Sign and send AWS API requests without the SDK.
//!
//! This crate bundles [`awsauth_core`] and [`awsauth_aws_v4`] and, with the
//! `default-context` feature, wires them to tokio file reads, reqwest and the
//! process environment.
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> awsauth::Result<()> {
//! use awsauth::aws::RequestDescriptor;
//!
//! let executor = awsauth::aws::default_executor();
//! let desc = RequestDescriptor::new(
//!     http::Method::GET,
//!     "https://my-bucket.s3.us-west-2.amazonaws.com/?list-type=2",
//! )?;
//! let resp = executor.execute(&desc).await?;
//! println!("{}", resp.status());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use awsauth_core::*;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::default_context;

pub mod aws;
