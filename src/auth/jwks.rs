// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - JWKS is fetched via HTTPS only (the Supabase project URL)
//! - Keys are cached by `kid` with a configurable TTL
//! - An unknown `kid` triggers a refetch, so key rotation is picked up
//!   without waiting for the TTL
//!
//! The fetch itself is behind the [`FetchJwks`] trait so tests can provide
//! key material without network access. Concurrent cache misses may fetch
//! the same document twice; entries are idempotent data and the last writer
//! wins, so no lock is held across the fetch.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use tokio::sync::RwLock;

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// HTTP timeout for the JWKS fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Capability to fetch a JWKS document.
pub trait FetchJwks: Send + Sync {
    fn fetch_jwks(&self) -> Pin<Box<dyn Future<Output = Result<JwkSet, AuthError>> + Send + '_>>;
}

/// Fetches the JWKS document over HTTPS.
pub struct HttpJwksFetcher {
    jwks_url: String,
    client: reqwest::Client,
}

impl HttpJwksFetcher {
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL
    ///   (e.g., `https://<project-ref>.supabase.co/auth/v1/.well-known/jwks.json`)
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl FetchJwks for HttpJwksFetcher {
    fn fetch_jwks(&self) -> Pin<Box<dyn Future<Output = Result<JwkSet, AuthError>> + Send + '_>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.jwks_url)
                .send()
                .await
                .map_err(|e| AuthError::KeyUnavailable(format!("Failed to fetch JWKS: {e}")))?;

            if !response.status().is_success() {
                return Err(AuthError::KeyUnavailable(format!(
                    "Failed to fetch JWKS: HTTP {} from JWKS endpoint",
                    response.status()
                )));
            }

            response
                .json::<JwkSet>()
                .await
                .map_err(|e| AuthError::KeyUnavailable(format!("Failed to fetch JWKS: {e}")))
        })
    }
}

/// JWKS cache entry, keyed by `kid`.
struct CacheEntry {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
}

/// JWKS manager with per-`kid` caching.
#[derive(Clone)]
pub struct JwksManager {
    fetcher: Arc<dyn FetchJwks>,
    cache_ttl: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
}

impl std::fmt::Debug for JwksManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksManager")
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl JwksManager {
    /// Create a manager fetching from the given endpoint URL.
    pub fn from_url(jwks_url: impl Into<String>) -> Self {
        Self::with_fetcher(Arc::new(HttpJwksFetcher::new(jwks_url)))
    }

    /// Create a manager with a custom key source.
    pub fn with_fetcher(fetcher: Arc<dyn FetchJwks>) -> Self {
        Self {
            fetcher,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Get the key with the given `kid`, fetching the JWKS on a cache miss.
    ///
    /// A fresh cache entry without the requested `kid` still refetches once,
    /// so newly rotated keys are found immediately.
    pub async fn signing_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    if let Some(jwk) = entry.keys.get(kid) {
                        return Ok(jwk.clone());
                    }
                }
            }
        }

        let keys = self.refresh().await?;
        keys.get(kid).cloned().ok_or_else(|| {
            AuthError::KeyUnavailable(format!("No key matches kid {kid:?} in JWKS"))
        })
    }

    /// Fetch the JWKS and replace the cache entry (last-writer-wins).
    ///
    /// Returns the freshly fetched key map. Keys without a `kid` cannot be
    /// selected by header and are dropped.
    pub async fn refresh(&self) -> Result<HashMap<String, Jwk>, AuthError> {
        let jwks = self.fetcher.fetch_jwks().await?;

        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .filter_map(|jwk| jwk.common.key_id.clone().map(|kid| (kid, jwk)))
            .collect();

        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }

    /// Check if the JWKS is currently cached and fresh.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        if let Some(entry) = &*cache {
            entry.fetched_at.elapsed() < self.cache_ttl
        } else {
            false
        }
    }
}
