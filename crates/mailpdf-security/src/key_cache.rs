// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signing-key cache. One JWKS snapshot for the whole process, replaced
// wholesale on refresh and trusted for a fixed time after it was fetched.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::error::AuthError;
use crate::jwks::{JwkSet, RsaPublicKey};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Where signing keys come from.
pub trait KeySource: Send + Sync {
    fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the JWKS document over HTTP(S).
pub struct HttpKeySource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpKeySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("mailpdf/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::KeySourceUnavailable(err.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl KeySource for HttpKeySource {
    #[instrument(skip(self), fields(url = %self.url))]
    fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|err| AuthError::KeySourceUnavailable(format!("GET {}: {err}", self.url)))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySourceUnavailable(format!(
                "HTTP {} for {}",
                response.status(),
                self.url
            )));
        }

        let body = response
            .text()
            .map_err(|err| AuthError::KeySourceUnavailable(err.to_string()))?;
        JwkSet::from_json(&body).map_err(|err| AuthError::KeySourceUnavailable(err.to_string()))
    }
}

/// A fixed, in-memory key set.
pub struct StaticKeySource {
    keys: JwkSet,
}

impl StaticKeySource {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        Ok(Self::new(JwkSet::from_json(json)?))
    }
}

impl KeySource for StaticKeySource {
    fn fetch(&self) -> Result<JwkSet, AuthError> {
        Ok(self.keys.clone())
    }
}

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Snapshot {
    keys: JwkSet,
    expires_at: Instant,
}

/// Resolves key ids to RSA public keys, fetching from a [`KeySource`] when
/// the cached set is missing or stale.
///
/// - No usable snapshot and the fetch fails: `KeySourceUnavailable`.
/// - Snapshot still valid but the key id is unknown: one refresh is tried.
///   If that refresh fails the valid snapshot keeps serving.
pub struct SigningKeyCache {
    source: Box<dyn KeySource>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    snapshot: Mutex<Option<Snapshot>>,
}

impl SigningKeyCache {
    pub fn new(source: impl KeySource + 'static, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(source: impl KeySource + 'static, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source: Box::new(source),
            ttl,
            clock,
            snapshot: Mutex::new(None),
        }
    }

    /// Public key for `kid`.
    #[instrument(skip(self))]
    pub fn signing_key(&self, kid: &str) -> Result<RsaPublicKey, AuthError> {
        let mut slot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();

        let valid = slot.as_ref().is_some_and(|snapshot| now < snapshot.expires_at);
        if !valid {
            debug!("Signing key cache cold or expired");
            self.refresh(&mut slot, now)?;
        } else if slot.as_ref().is_some_and(|snapshot| snapshot.keys.find(kid).is_none()) {
            debug!("Key id not cached, refreshing once");
            if let Err(err) = self.refresh(&mut slot, now) {
                warn!(%err, "Key refresh failed, keeping current keys");
            }
        } else {
            debug!("Signing key cache hit");
        }

        let jwk = slot
            .as_ref()
            .and_then(|snapshot| snapshot.keys.find(kid))
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))?;
        RsaPublicKey::try_from(jwk)
    }

    /// Forget the cached key set.
    pub fn invalidate(&self) {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn refresh(&self, slot: &mut Option<Snapshot>, now: Instant) -> Result<(), AuthError> {
        let keys = self.source.fetch()?;
        info!(keys = keys.keys.len(), ttl_secs = self.ttl.as_secs(), "Signing keys refreshed");
        *slot = Some(Snapshot {
            keys,
            expires_at: now + self.ttl,
        });
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    pub(crate) const FIXTURE: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/jwks.json"));

    /// Counts fetches and can be switched off.
    #[derive(Clone)]
    struct FlakySource {
        keys: Arc<Mutex<Option<JwkSet>>>,
        fetches: Arc<AtomicUsize>,
    }

    impl FlakySource {
        fn up() -> Self {
            Self {
                keys: Arc::new(Mutex::new(Some(JwkSet::from_json(FIXTURE).unwrap()))),
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn down() -> Self {
            let source = Self::up();
            source.go_down();
            source
        }

        fn go_down(&self) {
            *self.keys.lock().unwrap() = None;
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl KeySource for FlakySource {
        fn fetch(&self) -> Result<JwkSet, AuthError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.keys
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AuthError::KeySourceUnavailable("connection refused".into()))
        }
    }

    pub(crate) struct ManualClock(Mutex<Instant>);

    impl ManualClock {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Instant::now())))
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    fn cache(source: &FlakySource, clock: &Arc<ManualClock>) -> SigningKeyCache {
        let clock: Arc<dyn Clock> = clock.clone();
        SigningKeyCache::with_clock(source.clone(), DEFAULT_TTL, clock)
    }

    #[test]
    fn cold_cache_with_dead_source_fails() {
        let source = FlakySource::down();
        let err = cache(&source, &ManualClock::new()).signing_key("test-key-1").unwrap_err();
        assert!(matches!(err, AuthError::KeySourceUnavailable(_)));
    }

    #[test]
    fn keys_are_reused_within_ttl() {
        let source = FlakySource::up();
        let clock = ManualClock::new();
        let cache = cache(&source, &clock);

        cache.signing_key("test-key-1").unwrap();
        clock.advance(Duration::from_secs(3599));
        cache.signing_key("test-key-1").unwrap();
        assert_eq!(source.fetches(), 1);
    }

    #[test]
    fn expired_snapshot_is_refetched() {
        let source = FlakySource::up();
        let clock = ManualClock::new();
        let cache = cache(&source, &clock);

        cache.signing_key("test-key-1").unwrap();
        clock.advance(DEFAULT_TTL);
        cache.signing_key("test-key-1").unwrap();
        assert_eq!(source.fetches(), 2);
    }

    #[test]
    fn expired_snapshot_with_dead_source_fails() {
        let source = FlakySource::up();
        let clock = ManualClock::new();
        let cache = cache(&source, &clock);

        cache.signing_key("test-key-1").unwrap();
        source.go_down();
        clock.advance(DEFAULT_TTL + Duration::from_secs(1));
        let err = cache.signing_key("test-key-1").unwrap_err();
        assert!(matches!(err, AuthError::KeySourceUnavailable(_)));
    }

    #[test]
    fn unknown_kid_triggers_one_refresh() {
        let source = FlakySource::up();
        let cache = cache(&source, &ManualClock::new());

        cache.signing_key("test-key-1").unwrap();
        let err = cache.signing_key("rotated-key").unwrap_err();
        assert_eq!(err, AuthError::UnknownKeyId("rotated-key".into()));
        assert_eq!(source.fetches(), 2);
    }

    #[test]
    fn valid_snapshot_survives_failed_refresh() {
        let source = FlakySource::up();
        let cache = cache(&source, &ManualClock::new());

        cache.signing_key("test-key-1").unwrap();
        source.go_down();
        assert_eq!(
            cache.signing_key("rotated-key").unwrap_err(),
            AuthError::UnknownKeyId("rotated-key".into())
        );
        assert!(cache.signing_key("test-key-1").is_ok());
    }

    #[test]
    fn invalidate_forces_fetch() {
        let source = FlakySource::up();
        let cache = cache(&source, &ManualClock::new());
        cache.signing_key("test-key-1").unwrap();
        cache.invalidate();
        cache.signing_key("test-key-1").unwrap();
        assert_eq!(source.fetches(), 2);
    }
}
