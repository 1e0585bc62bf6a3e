//! Named secret lookup.
//!
//! Callers resolve a secret on every use; providers may rotate values at any
//! time and the next lookup must see the new value.

pub mod env;
pub mod fixed;

pub use env::EnvSecretProvider;
pub use fixed::StaticSecretProvider;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Name of the webhook API key secret.
pub const API_KEY_SECRET: &str = "API_KEY";

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret not found: '{name}'")]
    NotFound { name: String },

    #[error("secret provider '{provider}' unavailable: {detail}")]
    ProviderUnavailable { provider: String, detail: String },
}

/// A resolved secret. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue {
    name: String,
    value: String,
}

impl SecretValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretError>;

    /// Short provider identifier for logs.
    fn provider_type(&self) -> &'static str;
}
