//! Signing-key cache backed by a published JSON Web Key Set.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::AuthError;

/// One entry of a key-set document. Only RSA members are modelled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: String,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwkSet {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

/// Where the key set comes from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches the key set over HTTP GET.
pub struct HttpKeySetSource {
    client: Client,
    url: String,
}

impl HttpKeySetSource {
    pub fn new(url: impl Into<String>) -> Result<Self, AuthError> {
        let client = Client::builder()
            .connect_timeout(FETCH_TIMEOUT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::KeyFetch(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        debug!(url = %self.url, "Fetching signing keys");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyFetch(format!("Invalid key set document: {}", e)))
    }
}

#[derive(Default)]
struct KeyCache {
    keys: HashMap<String, DecodingKey>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Decodes every usable RSA key in `set`. Entries without a key id, of
/// another key type, or with broken components are skipped.
fn decode_keys(set: &JwkSet) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::new();
    for jwk in &set.keys {
        let Some(kid) = jwk.kid.as_deref().filter(|kid| !kid.is_empty()) else {
            debug!("Skipping key without kid");
            continue;
        };
        if jwk.kty != "RSA" {
            debug!(kid = %kid, kty = %jwk.kty, "Skipping non-RSA key");
            continue;
        }
        let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
            warn!(kid = %kid, "RSA key is missing its modulus or exponent");
            continue;
        };
        match DecodingKey::from_rsa_components(n, e) {
            Ok(key) => {
                keys.insert(kid.to_string(), key);
            }
            Err(err) => warn!(kid = %kid, error = %err, "Skipping undecodable RSA key"),
        }
    }
    keys
}

/// Key id → verification key. Refreshed only when a lookup misses.
pub struct JwksCache {
    source: Arc<dyn KeySetSource>,
    state: RwLock<KeyCache>,
}

impl JwksCache {
    pub fn new(source: Arc<dyn KeySetSource>) -> Self {
        Self {
            source,
            state: RwLock::new(KeyCache::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, KeyCache> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Key cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, KeyCache> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Key cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn lookup(&self, kid: &str) -> Option<DecodingKey> {
        self.read().keys.get(kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().keys.is_empty()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.read().refreshed_at
    }

    /// Replaces the whole key map with a freshly fetched set. On failure the
    /// previous keys stay in place.
    pub async fn refresh(&self) -> Result<usize, AuthError> {
        let set = self.source.fetch().await?;
        let keys = decode_keys(&set);
        let count = keys.len();

        {
            let mut state = self.write();
            state.keys = keys;
            state.refreshed_at = Some(Utc::now());
        }

        info!(keys = count, "Signing keys refreshed");
        Ok(count)
    }

    /// Cached key for `kid`; a miss refreshes once and looks again.
    pub async fn resolve(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.lookup(kid) {
            return Ok(key);
        }

        debug!(kid = %kid, "Signing key not cached, refreshing");
        self.refresh().await?;

        self.lookup(kid)
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_N: &str = "zTh6s5lnrdyKdFEjgpzrh8aK-LvEg1Gyu7nM9ndyfUDOZzSQFdUuwgt7bKz4cOcYBcSdwDD8NxVQSxdk44HR8R54ipjEoYIN5QABrbuXhR6tOckXEnbSjd8OlHfSqwa1qBXa1zp-KrTKqdQ7TDVjXR9VL-ahwhUsi9qEUaxCOMpw_RW6rHSRQ660G1H5cb1ph_bk6jnMfUXSi2m7VYiwWWvR5NhIRxDc9KAhgbaVoPTgCMHVJH-I0v8KidXMLujYHcYKu8YuStJFEs4doPbJkvlzHKIo44202DBelpRaR2y1CPVI7XtEOXiNyPdOLmcL2i4Fnlb_RSy2Q98Tdh12qw";
    const TEST_E: &str = "AQAB";

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kid: Some(kid.to_string()),
            kty: "RSA".to_string(),
            n: Some(TEST_N.to_string()),
            e: Some(TEST_E.to_string()),
        }
    }

    struct CountingSource {
        set: JwkSet,
        fetches: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(keys: Vec<Jwk>) -> Self {
            Self {
                set: JwkSet { keys },
                fetches: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl KeySetSource for CountingSource {
        async fn fetch(&self) -> Result<JwkSet, AuthError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AuthError::KeyFetch("unreachable".to_string()));
            }
            Ok(self.set.clone())
        }
    }

    #[test]
    fn test_parse_key_set_document() {
        let set: JwkSet = serde_json::from_str(include_str!("../../tests/fixtures/jwks.json")).unwrap();
        assert_eq!(set.keys.len(), 2);

        let keys = decode_keys(&set);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains_key("test-key-1"));
    }

    #[test]
    fn test_decode_skips_unusable_entries() {
        let set = JwkSet {
            keys: vec![
                rsa_jwk("good"),
                Jwk {
                    kid: None,
                    ..rsa_jwk("ignored")
                },
                Jwk {
                    n: None,
                    ..rsa_jwk("no-modulus")
                },
                Jwk {
                    kty: "oct".to_string(),
                    ..rsa_jwk("symmetric")
                },
            ],
        };
        let keys = decode_keys(&set);
        assert_eq!(keys.keys().collect::<Vec<_>>(), vec!["good"]);
    }

    #[tokio::test]
    async fn test_hit_does_not_refresh() {
        let source = Arc::new(CountingSource::new(vec![rsa_jwk("a")]));
        let cache = JwksCache::new(source.clone());

        cache.refresh().await.unwrap();
        cache.resolve("a").await.unwrap();
        cache.resolve("a").await.unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_miss_refreshes_once_then_finds_key() {
        let source = Arc::new(CountingSource::new(vec![rsa_jwk("a")]));
        let cache = JwksCache::new(source.clone());
        assert!(cache.refreshed_at().is_none());

        cache.resolve("a").await.unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.refreshed_at().is_some());
    }

    #[tokio::test]
    async fn test_second_miss_is_unknown_key() {
        let source = Arc::new(CountingSource::new(vec![rsa_jwk("a")]));
        let cache = JwksCache::new(source.clone());

        let err = match cache.resolve("b").await {
            Err(e) => e,
            Ok(_) => panic!("kid 'b' should not resolve"),
        };

        assert_eq!(err, AuthError::UnknownKey("b".to_string()));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_keys() {
        let good = Arc::new(CountingSource::new(vec![rsa_jwk("a")]));
        let cache = JwksCache::new(good);
        cache.refresh().await.unwrap();

        let failing = Arc::new(CountingSource {
            fail: true,
            ..CountingSource::new(Vec::new())
        });
        let cache = JwksCache {
            source: failing,
            state: cache.state,
        };

        assert!(matches!(cache.resolve("b").await, Err(AuthError::KeyFetch(_))));
        assert!(cache.lookup("a").is_some());
    }
}
