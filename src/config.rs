// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup and validated
//! before the server binds; a missing or malformed required value aborts
//! startup with an error naming the variable.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SUPABASE_PROJECT_URL` | Supabase project URL (JWKS endpoint is derived from it) | Required |
//! | `SUPABASE_SECRET_KEY` | Shared secret for HS256 token verification | Required |
//! | `SUPABASE_ES256_PUBLIC_JWK` | ES256 public key as a JWK JSON object | Optional |
//! | `AUTH_IDENTITY_POLICY` | `strict` or `provision` | `provision` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SEED_ADMIN_EMAIL` | Create a staff account at startup | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! With the `dev` cargo feature, missing required variables fall back to
//! dummy values so analysis tooling can run without a real environment.
//! That feature must never be enabled in a running server.

use jsonwebtoken::jwk::Jwk;
use thiserror::Error;
use url::Url;

use crate::auth::IdentityPolicy;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("{0} must contain valid JSON")]
    InvalidJson(&'static str),
    #[error("{name} is invalid: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

/// Process-wide configuration, immutable after startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub seed_admin_email: Option<String>,
    pub auth: AuthSettings,
}

/// Authentication settings passed into the key resolver at construction.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Supabase project URL.
    pub project_url: String,
    /// Shared secret for HS256 verification.
    pub secret_key: String,
    /// ES256 public key, parsed from JSON at load time.
    pub es256_public_jwk: Option<Jwk>,
    /// How verified identities map to local accounts.
    pub identity_policy: IdentityPolicy,
}

impl AuthSettings {
    /// The JWKS endpoint derived from the project URL.
    pub fn jwks_url(&self) -> String {
        format!(
            "{}/auth/v1/.well-known/jwks.json",
            self.project_url.trim_end_matches('/')
        )
    }
}

impl AppConfig {
    /// Load and validate configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_url = required_var("SUPABASE_PROJECT_URL")?;
        Url::parse(&project_url).map_err(|e| ConfigError::InvalidVar {
            name: "SUPABASE_PROJECT_URL",
            reason: e.to_string(),
        })?;

        let secret_key = required_var("SUPABASE_SECRET_KEY")?;

        let es256_public_jwk = match std::env::var("SUPABASE_ES256_PUBLIC_JWK") {
            Ok(raw) if !raw.is_empty() => Some(
                serde_json::from_str::<Jwk>(&raw)
                    .map_err(|_| ConfigError::InvalidJson("SUPABASE_ES256_PUBLIC_JWK"))?,
            ),
            _ => None,
        };

        let identity_policy = match std::env::var("AUTH_IDENTITY_POLICY") {
            Ok(raw) if !raw.is_empty() => {
                IdentityPolicy::from_name(&raw).ok_or(ConfigError::InvalidVar {
                    name: "AUTH_IDENTITY_POLICY",
                    reason: format!("expected 'strict' or 'provision', got {raw:?}"),
                })?
            }
            _ => IdentityPolicy::default(),
        };

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                name: "PORT",
                reason: format!("expected a port number, got {raw:?}"),
            })?,
            Err(_) => 8080,
        };

        let seed_admin_email = std::env::var("SEED_ADMIN_EMAIL").ok().filter(|v| !v.is_empty());

        Ok(Self {
            host,
            port,
            seed_admin_email,
            auth: AuthSettings {
                project_url,
                secret_key,
                es256_public_jwk,
                identity_policy,
            },
        })
    }
}

/// Read a required environment variable.
fn required_var(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => {
            #[cfg(feature = "dev")]
            {
                tracing::warn!(name, "Missing environment variable; using dummy value");
                return Ok(dummy_value(name).to_string());
            }
            #[cfg(not(feature = "dev"))]
            Err(ConfigError::MissingVar(name))
        }
    }
}

/// Dummy stand-ins for analysis-tooling runs. Never used in a real server.
#[cfg(feature = "dev")]
fn dummy_value(name: &str) -> &'static str {
    match name {
        "SUPABASE_PROJECT_URL" => "http://localhost:54321",
        _ => "dummy-value-for-analysis-only",
    }
}
