use crate::{Context, CredentialCache, ProvideCredential, Result, SignRequest, SigningCredential};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Signer is the main struct used to sign the request.
///
/// It loads credentials through a [`CredentialCache`] and hands them to the
/// request signer.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    credentials: CredentialCache<K>,
    builder: Arc<dyn SignRequest<Credential = K>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            credentials: CredentialCache::new(ctx.clone(), loader),
            ctx,
            builder: Arc::new(builder),
        }
    }

    /// Context used by this signer.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Get a valid credential, loading it if the cached one is missing or stale.
    pub async fn credential(&self) -> Result<K> {
        self.credentials.credential().await
    }

    /// Signing request.
    pub async fn sign(
        &self,
        req: &mut http::Request<Bytes>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let cred = self.credential().await?;

        self.builder
            .sign_request(&self.ctx, req, &cred, expires_in)
            .await
    }
}
