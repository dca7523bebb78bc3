//! Collaborator traits for `eveapi`.
//!
//! The request pipeline never owns a concrete cache backend or auth flow.
//! Both are injected through the traits defined here.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::Credential;

/// Byte-oriented key/value store with per-entry expiration.
///
/// Values are the raw upstream JSON bodies; keys are built by the callers
/// so that logically identical requests always map to the same key.
///
/// Implementations are responsible for their own synchronisation and may
/// evict entries early (for example when a capacity bound is reached).
/// A read of an unexpired key must return exactly the bytes last written.
pub trait CacheRepository: Send + Sync {
    /// Returns the stored bytes for `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Stores `value` under `key` for `ttl`.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);

    /// Removes `key`. Deleting a missing key is a no-op.
    fn delete(&self, key: &str);
}

/// Exchanges a refresh token for a new [`Credential`].
///
/// The request executor calls this at most once per request, after an
/// upstream 401 or 403.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Refreshes the credential identified by `refresh_token`.
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, CoreError>;
}
