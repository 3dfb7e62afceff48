//! API key loading.
//!
//! The generator never reads the environment itself. It receives an
//! [`ApiKey`] from a [`CredentialSource`]; swap the source to read the key
//! from somewhere else (a secrets manager, a file, a prompt).
//!
//! ```no_run
//! use texref::{ApiKey, FnCredentials, GenerateConfig, ReferenceGenerator};
//!
//! # fn main() -> anyhow::Result<()> {
//! let source = FnCredentials::new(|| {
//!     let key = std::fs::read_to_string("/run/secrets/openai")
//!         .map_err(|e| texref::Error::credential(e.to_string()))?;
//!     ApiKey::new(key)
//! });
//!
//! let generator = ReferenceGenerator::new(GenerateConfig::builder().build()?, &source)?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use std::fmt;

/// Environment variables checked by [`EnvCredentials::default`], in order.
pub const DEFAULT_KEY_VARS: &[&str] = &["CHATGPT_KEY", "OPENAI_API_KEY"];

/// A validated API key. `Debug` output never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Validates and wraps a key. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns a credential error if the key is empty or contains whitespace.
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();

        if value.is_empty() {
            return Err(Error::credential("API key is empty"));
        }

        if value.chars().any(char::is_whitespace) {
            return Err(Error::credential("API key contains whitespace"));
        }

        Ok(Self(value.to_string()))
    }

    /// Returns the raw key for the authorization header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Supplies the API key to the generator.
pub trait CredentialSource {
    /// Loads the key.
    ///
    /// # Errors
    ///
    /// Returns a credential error if no valid key is available.
    fn load(&self) -> Result<ApiKey>;

    /// Human-readable description for log messages.
    fn describe(&self) -> String;
}

/// Reads the key from the first set environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    vars: Vec<String>,
}

impl EnvCredentials {
    /// Checks `vars` in order.
    #[must_use]
    pub fn new<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolves against a custom lookup instead of the process environment.
    fn load_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<ApiKey> {
        for var in &self.vars {
            if let Some(value) = lookup(var) {
                if value.trim().is_empty() {
                    tracing::debug!("{} is set but empty", var);
                    continue;
                }
                return ApiKey::new(value)
                    .map_err(|e| Error::credential(format!("{var}: {e}")));
            }
        }

        Err(Error::credential(format!(
            "no API key found; set one of: {}",
            self.vars.join(", ")
        )))
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_VARS.iter().copied())
    }
}

impl CredentialSource for EnvCredentials {
    fn load(&self) -> Result<ApiKey> {
        self.load_with(|var| std::env::var(var).ok())
    }

    fn describe(&self) -> String {
        format!("environment ({})", self.vars.join(", "))
    }
}

/// A fixed key.
#[derive(Debug, Clone)]
pub struct StaticCredentials(String);

impl StaticCredentials {
    /// Wraps `value`; it is validated on load.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl CredentialSource for StaticCredentials {
    fn load(&self) -> Result<ApiKey> {
        ApiKey::new(&self.0)
    }

    fn describe(&self) -> String {
        "static key".to_string()
    }
}

/// Wraps a loader function.
pub struct FnCredentials<F> {
    loader: F,
}

impl<F> FnCredentials<F>
where
    F: Fn() -> Result<ApiKey>,
{
    /// Uses `loader` to obtain the key.
    pub const fn new(loader: F) -> Self {
        Self { loader }
    }
}

impl<F> CredentialSource for FnCredentials<F>
where
    F: Fn() -> Result<ApiKey>,
{
    fn load(&self) -> Result<ApiKey> {
        (self.loader)()
    }

    fn describe(&self) -> String {
        "custom loader".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_api_key_trims() {
        let key = ApiKey::new("  sk-test\n").unwrap();
        assert_eq!(key.expose(), "sk-test");
    }

    #[test]
    fn test_api_key_rejects_empty() {
        assert!(ApiKey::new("   ").unwrap_err().is_credential());
    }

    #[test]
    fn test_api_key_rejects_inner_whitespace() {
        assert!(ApiKey::new("sk-a b").unwrap_err().is_credential());
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-secret").unwrap();
        assert!(!format!("{key:?}").contains("secret"));
    }

    #[test]
    fn test_env_first_set_variable_wins() {
        let source = EnvCredentials::default();
        let key = source
            .load_with(lookup(&[("CHATGPT_KEY", "sk-one"), ("OPENAI_API_KEY", "sk-two")]))
            .unwrap();
        assert_eq!(key.expose(), "sk-one");
    }

    #[test]
    fn test_env_falls_back() {
        let source = EnvCredentials::default();
        let key = source
            .load_with(lookup(&[("CHATGPT_KEY", ""), ("OPENAI_API_KEY", "sk-two")]))
            .unwrap();
        assert_eq!(key.expose(), "sk-two");
    }

    #[test]
    fn test_env_missing() {
        let source = EnvCredentials::new(["TEXREF_TEST_KEY"]);
        let err = source.load_with(lookup(&[])).unwrap_err();

        assert!(err.is_credential());
        assert!(err.to_string().contains("TEXREF_TEST_KEY"));
    }

    #[test]
    fn test_static_credentials() {
        assert_eq!(StaticCredentials::new("sk-x").load().unwrap().expose(), "sk-x");
        assert!(StaticCredentials::new("").load().is_err());
    }

    #[test]
    fn test_fn_credentials() {
        let source = FnCredentials::new(|| ApiKey::new("sk-from-vault"));
        assert_eq!(source.load().unwrap().expose(), "sk-from-vault");
        assert_eq!(source.describe(), "custom loader");
    }
}
