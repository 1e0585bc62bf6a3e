use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{SecretError, SecretProvider, SecretValue};

/// In-memory secrets, rotatable at runtime with [`set`](Self::set).
#[derive(Debug, Default)]
pub struct StaticSecretProvider {
    secrets: RwLock<HashMap<String, String>>,
}

impl StaticSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or rotate a secret.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut secrets = self
            .secrets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        secrets.insert(name.into(), value.into());
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretError> {
        let secrets = self
            .secrets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match secrets.get(name) {
            Some(value) if !value.is_empty() => Ok(SecretValue::new(name, value.clone())),
            _ => Err(SecretError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    fn provider_type(&self) -> &'static str {
        "static"
    }
}
