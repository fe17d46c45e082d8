//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_STOREFRONT_PUBLIC_TOKEN` - Storefront API public access token
//! - `SHOPIFY_STOREFRONT_PRIVATE_TOKEN` - Storefront API private access token
//!
//! ## Optional
//! - `SHOPIFY_API_VERSION` - API version (default: 2025-01)
//! - `STOREFRONT_COUNTRY` - buyer country context (default: US)
//! - `STOREFRONT_LANGUAGE` - buyer language context (default: EN)

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Commerce API configuration.
///
/// Implements `Debug` manually to redact the private token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Store domain (e.g., your-store.myshopify.com).
    pub store: String,
    /// API version (e.g., 2025-01).
    pub api_version: String,
    /// Public access token (safe to expose to browser-context clients).
    pub public_token: String,
    /// Private access token (server-context only).
    pub private_token: SecretString,
    /// ISO country code injected into every query for contextual pricing.
    pub country: String,
    /// ISO language code injected into every query.
    pub language: String,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("public_token", &self.public_token)
            .field("private_token", &"[REDACTED]")
            .field("country", &self.country)
            .field("language", &self.language)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let store = required("SHOPIFY_STORE")?;
        if store.contains('/') {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPIFY_STORE".to_string(),
                "expected a bare domain, not a URL".to_string(),
            ));
        }

        Ok(Self {
            store,
            api_version: optional("SHOPIFY_API_VERSION", "2025-01"),
            public_token: required("SHOPIFY_STOREFRONT_PUBLIC_TOKEN")?,
            private_token: SecretString::from(required("SHOPIFY_STOREFRONT_PRIVATE_TOKEN")?),
            country: optional("STOREFRONT_COUNTRY", "US"),
            language: optional("STOREFRONT_LANGUAGE", "EN"),
        })
    }

    /// GraphQL endpoint URL for this store.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "https://{}/api/{}/graphql.json",
            self.store, self.api_version
        )
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
