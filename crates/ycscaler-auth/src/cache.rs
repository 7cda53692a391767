//! Cached bearer credential with double-checked refresh.
//!
//! The cache is the only shared mutable state in the scaler. Readers take
//! the read lock; a stale entry is refreshed under the write lock after a
//! second freshness check, so a burst of callers observing the same stale
//! entry produces exactly one exchange.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::exchange::{IamExchange, TokenExchange};
use crate::key::SigningKey;

/// Upper bound on how long a token is kept locally.
const MAX_CACHE_LIFETIME_HOURS: i64 = 6;

/// Margin kept before the server-declared expiry.
const EXPIRY_MARGIN_MINUTES: i64 = 5;

/// Source of bearer tokens for the monitoring API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, AuthError>;
}

#[derive(Debug, Clone)]
struct CachedCredential {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedCredential {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Local expiry for a token issued at `now` with server expiry `server_expiry`.
///
/// `min(now + 6h, server_expiry - 5m)`.
pub fn cache_expiry(now: DateTime<Utc>, server_expiry: DateTime<Utc>) -> DateTime<Utc> {
    let cap = now + TimeDelta::hours(MAX_CACHE_LIFETIME_HOURS);
    let margin = server_expiry - TimeDelta::minutes(EXPIRY_MARGIN_MINUTES);
    cap.min(margin)
}

/// Owns the signing key and the single cached credential.
pub struct CredentialCache<E = IamExchange> {
    key: SigningKey,
    exchange: E,
    cached: RwLock<Option<CachedCredential>>,
}

impl<E: TokenExchange> CredentialCache<E> {
    /// Create an empty cache. The first `get_token()` performs an exchange.
    pub fn new(key: SigningKey, exchange: E) -> Self {
        Self {
            key,
            exchange,
            cached: RwLock::new(None),
        }
    }

    /// Return a fresh bearer token, refreshing it if needed.
    pub async fn get_token(&self) -> Result<String, AuthError> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref()
                && entry.is_fresh(Utc::now())
            {
                return Ok(entry.token.clone());
            }
        }

        let mut cached = self.cached.write().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(entry) = cached.as_ref()
            && entry.is_fresh(Utc::now())
        {
            debug!("token refreshed by a concurrent caller");
            return Ok(entry.token.clone());
        }

        let fresh = match self.refresh().await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, "IAM token refresh failed");
                return Err(e);
            }
        };

        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Local expiry of the cached token, if any.
    pub async fn cached_expiry(&self) -> Option<DateTime<Utc>> {
        self.cached.read().await.as_ref().map(|c| c.expires_at)
    }

    async fn refresh(&self) -> Result<CachedCredential, AuthError> {
        let assertion = self
            .key
            .sign_assertion(self.exchange.audience(), Utc::now())?;

        let issued = self.exchange.exchange(&assertion).await?;
        let expires_at = cache_expiry(Utc::now(), issued.expires_at);

        info!(
            key_id = %self.key.key_id(),
            server_expires_at = %issued.expires_at,
            cache_expires_at = %expires_at,
            "IAM token refreshed"
        );

        Ok(CachedCredential {
            token: issued.token,
            expires_at,
        })
    }
}

#[async_trait]
impl<E: TokenExchange> TokenProvider for CredentialCache<E> {
    async fn token(&self) -> Result<String, AuthError> {
        self.get_token().await
    }
}
