use crate::{Context, Result};
use bytes::Bytes;
use std::fmt::Debug;
use std::time::Duration;

/// SigningCredential is the trait used by signer as the signing credential.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is still fresh enough to be used.
    ///
    /// A credential that is not valid will be refreshed by the credential cache
    /// before the next signing.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential is the trait used by signer to load the credential from
/// one source.
///
/// Implementations return `Ok(None)` when their source is not applicable in
/// the current environment, and only return errors when the source exists
/// but can't be used.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this loader.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load signing credential from current env.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest is the trait used by signer to sign the request.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this builder.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request in place.
    ///
    /// ## Expires In
    ///
    /// The `expires_in` parameter switches the signer to query signing: the
    /// signature and its expiration are carried by the url instead of the
    /// headers.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        credential: &Self::Credential,
        expires_in: Option<Duration>,
    ) -> Result<()>;
}
