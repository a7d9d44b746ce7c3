use async_trait::async_trait;
use awsauth_aws_v4::Credential;
use awsauth_core::time::now;
use awsauth_core::{Context, CredentialCache, Error, ErrorKind, ProvideCredential, Result};
use chrono::TimeDelta;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts loads and hands out credentials expiring after `ttl`.
#[derive(Debug, Clone)]
struct CountingProvider {
    calls: Arc<AtomicUsize>,
    ttl: Option<TimeDelta>,
    fail: bool,
}

impl CountingProvider {
    fn new(ttl: Option<TimeDelta>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            ttl,
            fail: false,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvideCredential for CountingProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Credential>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.fail {
            return Err(Error::unexpected("metadata service unreachable"));
        }

        let mut cred = Credential::new(format!("ACCESSKEY{n}"), "secret");
        if let Some(ttl) = self.ttl {
            cred = cred.with_expires_in(now() + ttl);
        }
        Ok(Some(cred))
    }
}

#[tokio::test]
async fn test_concurrent_callers_share_one_load() -> anyhow::Result<()> {
    let provider = CountingProvider::new(None);
    let cache = CredentialCache::new(Context::new(), provider.clone());

    let results = join_all((0..32).map(|_| {
        let cache = cache.clone();
        async move { cache.credential().await }
    }))
    .await;

    assert_eq!(provider.calls(), 1);
    for cred in results {
        assert_eq!(cred?.access_key_id, "ACCESSKEY0");
    }

    // Cached without expiration: never loaded again.
    cache.credential().await?;
    assert_eq!(provider.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_callers_share_one_error() {
    let provider = CountingProvider {
        fail: true,
        ..CountingProvider::new(None)
    };
    let cache = CredentialCache::new(Context::new(), provider.clone());

    let results = join_all((0..8).map(|_| cache.credential())).await;
    assert_eq!(provider.calls(), 1);
    for result in results {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.to_string(), "metadata service unreachable");
    }

    // The failed refresh is forgotten, the next call tries again.
    let _ = cache.credential().await;
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_refresh_near_expiration() -> anyhow::Result<()> {
    let fresh = CountingProvider::new(Some(TimeDelta::minutes(30)));
    let cache = CredentialCache::new(Context::new(), fresh.clone());
    cache.credential().await?;
    cache.credential().await?;
    assert_eq!(fresh.calls(), 1);

    // Four minutes left is inside the five minute window.
    let stale = CountingProvider::new(Some(TimeDelta::minutes(4)));
    let cache = CredentialCache::new(Context::new(), stale.clone());
    let first = cache.credential().await?;
    let second = cache.credential().await?;
    assert_eq!(stale.calls(), 2);
    assert_ne!(first.access_key_id, second.access_key_id);
    Ok(())
}
