use crate::{Context, Error, ProvideCredential, Result, SigningCredential};
use futures::future::{BoxFuture, FutureExt, Shared};
use log::debug;
use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex};

type RefreshFuture<K> = Shared<BoxFuture<'static, Result<K>>>;

/// Refresh state of a [`CredentialCache`].
///
/// `Idle -> Refreshing -> Idle`: at most one refresh is in flight, and
/// callers arriving while it runs attach to the same shared future.
enum Refresh<K: Clone> {
    Idle,
    Refreshing {
        generation: u64,
        future: RefreshFuture<K>,
    },
}

struct CacheState<K: Clone> {
    cached: Option<K>,
    refresh: Refresh<K>,
    generation: u64,
}

/// CredentialCache caches the credential produced by a provider and
/// refreshes it once it is no longer valid.
///
/// - A valid cached credential is returned without calling the provider.
/// - Otherwise exactly one refresh runs, and every concurrent caller
///   receives its result, including its error.
/// - A failed refresh leaves the cache idle so the next call retries.
pub struct CredentialCache<K: SigningCredential> {
    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = K>>,
    state: Arc<Mutex<CacheState<K>>>,
}

impl<K: SigningCredential> Clone for CredentialCache<K> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            provider: self.provider.clone(),
            state: self.state.clone(),
        }
    }
}

impl<K: SigningCredential> Debug for CredentialCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().expect("lock poisoned");
        f.debug_struct("CredentialCache")
            .field("provider", &self.provider)
            .field("cached", &state.cached)
            .field(
                "refreshing",
                &matches!(state.refresh, Refresh::Refreshing { .. }),
            )
            .finish()
    }
}

impl<K: SigningCredential> CredentialCache<K> {
    /// Create a new cache around the given provider.
    pub fn new(ctx: Context, provider: impl ProvideCredential<Credential = K>) -> Self {
        Self {
            ctx,
            provider: Arc::new(provider),
            state: Arc::new(Mutex::new(CacheState {
                cached: None,
                refresh: Refresh::Idle,
                generation: 0,
            })),
        }
    }

    /// Get a valid credential, refreshing it if needed.
    ///
    /// Returns [`crate::ErrorKind::NoCredentialsFound`] if the provider
    /// returns nothing.
    pub async fn credential(&self) -> Result<K> {
        let (generation, future) = {
            let mut state = self.state.lock().expect("lock poisoned");
            if let Some(cred) = state.cached.as_ref().filter(|v| v.is_valid()) {
                return Ok(cred.clone());
            }

            match &state.refresh {
                Refresh::Refreshing { generation, future } => {
                    debug!("credential refresh in flight, joining it");
                    (*generation, future.clone())
                }
                Refresh::Idle => {
                    debug!("credential is missing or about to expire, refreshing");
                    state.generation += 1;
                    let generation = state.generation;
                    let future = self.refresh().shared();
                    state.refresh = Refresh::Refreshing {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        let result = future.await;

        let mut state = self.state.lock().expect("lock poisoned");
        if matches!(&state.refresh, Refresh::Refreshing { generation: g, .. } if *g == generation) {
            state.refresh = Refresh::Idle;
            if let Ok(cred) = &result {
                state.cached = Some(cred.clone());
            }
        }

        result
    }

    /// Drop the cached credential so that the next call refreshes it.
    pub fn clear(&self) {
        self.state.lock().expect("lock poisoned").cached = None;
    }

    fn refresh(&self) -> BoxFuture<'static, Result<K>> {
        let ctx = self.ctx.clone();
        let provider = self.provider.clone();

        async move {
            match provider.provide_credential(&ctx).await? {
                Some(cred) => Ok(cred),
                None => Err(Error::no_credentials_found(
                    "no valid credential found in any provider",
                )),
            }
        }
        .boxed()
    }
}
