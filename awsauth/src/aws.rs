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

//! AWS SigV4 support with convenience APIs.

pub use awsauth_aws_v4::*;

#[cfg(feature = "default-context")]
use crate::default_context;

/// Create an executor with the default context and the default credential
/// chain: environment, shared credentials file, web identity, ECS and IMDSv2.
///
/// Service and region are detected from each request's url unless the
/// descriptor names them.
///
/// # Customization
///
/// ```no_run
/// use awsauth::aws::{default_executor, RetryPolicy};
///
/// let executor = default_executor()
///     .with_retry_policy(RetryPolicy::default().with_max_retries(5));
/// ```
#[cfg(feature = "default-context")]
pub fn default_executor() -> RequestExecutor {
    RequestExecutor::new(default_context(), DefaultCredentialProvider::new())
}

/// Create an executor with the default context and fixed credentials.
#[cfg(feature = "default-context")]
pub fn static_executor(access_key_id: &str, secret_access_key: &str) -> RequestExecutor {
    RequestExecutor::new(
        default_context(),
        StaticCredentialProvider::new(access_key_id, secret_access_key),
    )
}
