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

use crate::{constants::*, Credential};
use async_trait::async_trait;
use awsauth_core::time::parse_rfc3339;
use awsauth_core::{Context, ProvideCredential, Result};
use log::debug;

/// Loads credentials from `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`,
/// plus the optional `AWS_SESSION_TOKEN` and `AWS_CREDENTIAL_EXPIRATION`.
///
/// Empty values count as unset. A malformed expiration fails instead of
/// producing a credential that never expires.
#[derive(Debug, Default, Clone)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new EnvCredentialProvider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let (Some(ak), Some(sk)) = (
            ctx.env_value(AWS_ACCESS_KEY_ID),
            ctx.env_value(AWS_SECRET_ACCESS_KEY),
        ) else {
            debug!("{AWS_ACCESS_KEY_ID} or {AWS_SECRET_ACCESS_KEY} is not set");
            return Ok(None);
        };

        let mut cred = Credential::new(ak, sk);
        cred.session_token = ctx.env_value(AWS_SESSION_TOKEN);
        if let Some(expiration) = ctx.env_value(AWS_CREDENTIAL_EXPIRATION) {
            let expires_in = parse_rfc3339(&expiration)
                .map_err(|e| e.with_context(format!("env: {AWS_CREDENTIAL_EXPIRATION}")))?;
            cred = cred.with_expires_in(expires_in);
        }
        Ok(Some(cred))
    }
}
