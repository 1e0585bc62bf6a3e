use async_trait::async_trait;
use tracing::debug;

use super::{SecretError, SecretProvider, SecretValue};

/// Reads each secret from the environment variable of the upper-cased name.
///
/// The variable is read on every lookup, so changing it takes effect
/// immediately. Empty values count as missing.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretProvider;

impl EnvSecretProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretError> {
        let env_var = name.to_uppercase();
        match std::env::var(&env_var) {
            Ok(value) if !value.is_empty() => {
                debug!(secret_name = name, env_var = %env_var, "Secret loaded from environment");
                Ok(SecretValue::new(name, value))
            }
            _ => Err(SecretError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    fn provider_type(&self) -> &'static str {
        "env"
    }
}
