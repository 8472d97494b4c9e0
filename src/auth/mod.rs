//! API credential lookup: environment first, then the system keyring.

use std::error::Error;
use std::fmt;

use keyring::Entry;
use tracing::debug;

use crate::core::constants::API_KEY_ENV_VARS;

pub const KEYRING_SERVICE: &str = "heartline";
pub const KEYRING_USER: &str = "api-key";

/// Failures when talking to the platform keyring.
///
/// `Unavailable` covers temporary outages (a locked keychain, no secret
/// service running); `Keyring` is everything else.
#[derive(Debug)]
pub enum CredentialError {
    Unavailable(keyring::Error),
    Keyring(keyring::Error),
    EmptyKey,
}

impl CredentialError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CredentialError::Unavailable(_))
    }
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                CredentialError::Unavailable(err)
            }
            other => CredentialError::Keyring(other),
        }
    }
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Unavailable(err) => write!(f, "System keyring unavailable: {err}"),
            CredentialError::Keyring(err) => write!(f, "Keyring error: {err}"),
            CredentialError::EmptyKey => write!(f, "API key must not be empty"),
        }
    }
}

impl Error for CredentialError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CredentialError::Unavailable(err) | CredentialError::Keyring(err) => Some(err),
            CredentialError::EmptyKey => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment(&'static str),
    Keyring,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment(var) => write!(f, "environment ({var})"),
            CredentialSource::Keyring => write!(f, "system keyring"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential {
    pub key: String,
    pub source: CredentialSource,
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

pub struct CredentialStore {
    use_keyring: bool,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self { use_keyring: true }
    }

    /// Environment-only lookup; keyring writes become no-ops.
    pub fn without_keyring() -> Self {
        Self { use_keyring: false }
    }

    pub fn resolve(&self) -> Result<Option<ApiCredential>, CredentialError> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Checks each variable in [`API_KEY_ENV_VARS`] through `lookup`, then
    /// the keyring. Blank values are skipped.
    pub fn resolve_with<F>(&self, lookup: F) -> Result<Option<ApiCredential>, CredentialError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for var in API_KEY_ENV_VARS {
            if let Some(key) = lookup(var).filter(|key| !key.trim().is_empty()) {
                debug!(source = var, "using API key from environment");
                return Ok(Some(ApiCredential {
                    key: key.trim().to_string(),
                    source: CredentialSource::Environment(var),
                }));
            }
        }

        Ok(self.keyring_token()?.map(|key| ApiCredential {
            key,
            source: CredentialSource::Keyring,
        }))
    }

    pub fn store(&self, key: &str) -> Result<(), CredentialError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }
        if !self.use_keyring {
            return Ok(());
        }
        Entry::new(KEYRING_SERVICE, KEYRING_USER)?.set_password(key)?;
        Ok(())
    }

    /// Returns whether a stored key was removed.
    pub fn remove(&self) -> Result<bool, CredentialError> {
        if !self.use_keyring {
            return Ok(false);
        }
        match Entry::new(KEYRING_SERVICE, KEYRING_USER)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn keyring_token(&self) -> Result<Option<String>, CredentialError> {
        if !self.use_keyring {
            return Ok(None);
        }
        match Entry::new(KEYRING_SERVICE, KEYRING_USER)?.get_password() {
            Ok(token) => {
                debug!("using API key from keyring");
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn heartline_variable_wins_over_gemini() {
        let store = CredentialStore::without_keyring();
        let credential = store
            .resolve_with(lookup(&[
                ("HEARTLINE_API_KEY", "primary"),
                ("GEMINI_API_KEY", "secondary"),
            ]))
            .unwrap()
            .unwrap();
        assert_eq!(credential.key, "primary");
        assert_eq!(
            credential.source,
            CredentialSource::Environment("HEARTLINE_API_KEY")
        );
    }

    #[test]
    fn blank_variables_are_skipped() {
        let store = CredentialStore::without_keyring();
        let credential = store
            .resolve_with(lookup(&[("HEARTLINE_API_KEY", "  "), ("GEMINI_API_KEY", " g-key ")]))
            .unwrap()
            .unwrap();
        assert_eq!(credential.key, "g-key");
        assert_eq!(credential.source.to_string(), "environment (GEMINI_API_KEY)");
    }

    #[test]
    fn nothing_configured_resolves_to_none() {
        let store = CredentialStore::without_keyring();
        assert_eq!(store.resolve_with(lookup(&[])).unwrap(), None);
        assert!(!store.remove().unwrap());
    }

    #[test]
    fn empty_keys_are_rejected() {
        let store = CredentialStore::without_keyring();
        assert!(matches!(store.store("   "), Err(CredentialError::EmptyKey)));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let credential = ApiCredential {
            key: "sk-secret".into(),
            source: CredentialSource::Keyring,
        };
        assert!(!format!("{credential:?}").contains("sk-secret"));
    }
}
