use awsauth_core::hash::SigningHash;
use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Debug};
use std::sync::Mutex;

/// Default number of signing keys kept by [`SigningKeyCache`].
pub const DEFAULT_KEY_CACHE_CAPACITY: usize = 100;

/// SigningKeyCache keeps derived SigV4 signing keys.
///
/// Keys are indexed by `(secret_access_key, date, region, service)`. When the
/// cache is full the oldest inserted key is evicted first, reading a key does
/// not refresh its position.
///
/// Entries are never invalidated because of secret rotation: a rotated
/// secret simply produces a different cache key. Call [`SigningKeyCache::clear`]
/// to drop everything.
pub struct SigningKeyCache {
    capacity: usize,
    inner: Mutex<KeyCacheInner>,
}

#[derive(Default)]
struct KeyCacheInner {
    keys: HashMap<String, [u8; 32]>,
    order: VecDeque<String>,
}

impl Default for SigningKeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SigningKeyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl SigningKeyCache {
    /// Create a cache holding up to [`DEFAULT_KEY_CACHE_CAPACITY`] keys.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_KEY_CACHE_CAPACITY)
    }

    /// Create a cache holding up to `capacity` keys, at least one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(KeyCacheInner::default()),
        }
    }

    /// Maximum number of keys kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of keys currently cached.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("lock poisoned").keys.len()
    }

    /// Returns true if no key is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all cached keys.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.keys.clear();
        inner.order.clear();
    }

    /// Get the cached key for the given scope.
    pub fn get(&self, secret: &str, date: &str, region: &str, service: &str) -> Option<[u8; 32]> {
        let id = cache_key(secret, date, region, service);
        self.inner
            .lock()
            .expect("lock poisoned")
            .keys
            .get(&id)
            .copied()
    }

    /// Insert a key, evicting the oldest entry if the cache is full.
    ///
    /// An existing entry for the same scope is kept as is: derivation is
    /// deterministic so both values are equal.
    pub fn insert(&self, secret: &str, date: &str, region: &str, service: &str, key: [u8; 32]) {
        let id = cache_key(secret, date, region, service);
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.keys.contains_key(&id) {
            return;
        }

        while inner.keys.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.keys.remove(&oldest);
        }

        inner.order.push_back(id.clone());
        inner.keys.insert(id, key);
    }

    /// Get the cached key for the given scope, deriving and caching it if absent.
    ///
    /// Derivation happens outside the lock; concurrent callers may derive the
    /// same key twice, which is harmless.
    pub fn get_or_derive(
        &self,
        hash: &dyn SigningHash,
        secret: &str,
        date: &str,
        region: &str,
        service: &str,
    ) -> [u8; 32] {
        if let Some(key) = self.get(secret, date, region, service) {
            return key;
        }

        let key = derive_signing_key(hash, secret, date, region, service);
        self.insert(secret, date, region, service, key);
        key
    }
}

fn cache_key(secret: &str, date: &str, region: &str, service: &str) -> String {
    [secret, date, region, service].join("\n")
}

/// Derive the SigV4 signing key:
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, date)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
pub fn derive_signing_key(
    hash: &dyn SigningHash,
    secret: &str,
    date: &str,
    region: &str,
    service: &str,
) -> [u8; 32] {
    let secret = format!("AWS4{secret}");
    let sign_date = hash.hmac_sha256(secret.as_bytes(), date.as_bytes());
    let sign_region = hash.hmac_sha256(&sign_date, region.as_bytes());
    let sign_service = hash.hmac_sha256(&sign_region, service.as_bytes());
    hash.hmac_sha256(&sign_service, b"aws4_request")
}
