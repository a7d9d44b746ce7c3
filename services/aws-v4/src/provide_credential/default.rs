use crate::provide_credential::{
    AssumeRoleWithWebIdentityCredentialProvider, EcsCredentialProvider, EnvCredentialProvider,
    IMDSv2CredentialProvider, ProfileCredentialProvider, StaticCredentialProvider,
};
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::{Context, ProvideCredential, ProvideCredentialChain, Result};

/// DefaultCredentialProvider is a loader that will try to load credential via default chains.
///
/// Resolution order:
///
/// 1. Explicit credentials set by [`DefaultCredentialProvider::with_static`]
/// 2. Environment variables
/// 3. Shared credentials file (`~/.aws/credentials`)
/// 4. Web Identity Tokens
/// 5. ECS (IAM Roles for Tasks) & Container credentials
/// 6. EC2 IMDSv2
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` instance.
    pub fn new() -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(ProfileCredentialProvider::new())
            .push(AssumeRoleWithWebIdentityCredentialProvider::new())
            .push(EcsCredentialProvider::new())
            .push(IMDSv2CredentialProvider::new());

        Self { chain }
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain<Credential>) -> Self {
        Self { chain }
    }

    /// Put explicit credentials in front of every other source.
    pub fn with_static(mut self, provider: StaticCredentialProvider) -> Self {
        self.chain = self.chain.push_front(provider);
        self
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}
