//! Capability manager: resolves the typed credentials adapters need
//! (SSH keys, SNMP communities, API tokens, ...) from wherever an
//! operator configured them, and tracks enough metadata about each to
//! answer "what secrets do we have" without ever exposing a value.

pub mod credential;
pub mod error;

use std::collections::BTreeMap;
use std::fs;
use std::sync::RwLock;

use chrono::Utc;
use specularium_core::secret::{SecretSource, SecretStatus, SecretSummary, SecretType};
use tracing::warn;

pub use credential::Credential;
pub use error::CapabilityError;

struct SecretEntry {
    secret_type: SecretType,
    source: SecretSource,
    /// Environment variable name for `EnvVar`, filesystem path for
    /// `File`. Unused (and resolution fails) for `OsKeyring`/`Vault`,
    /// which this build does not implement.
    location: String,
    summary: SecretSummary,
}

/// Registry of known secret references and the logic to resolve each
/// into a usable credential on demand. Resolution is lazy: registering
/// a reference never touches the filesystem or environment until
/// [`CapabilityManager::get_secret`] is called for it.
pub struct CapabilityManager {
    entries: RwLock<BTreeMap<String, SecretEntry>>,
}

impl CapabilityManager {
    pub fn new() -> Self {
        CapabilityManager {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn register(
        &self,
        reference: impl Into<String>,
        secret_type: SecretType,
        source: SecretSource,
        location: impl Into<String>,
    ) {
        let reference = reference.into();
        let summary = SecretSummary::new(reference.clone(), secret_type, source);
        self.entries.write().unwrap().insert(
            reference,
            SecretEntry {
                secret_type,
                source,
                location: location.into(),
                summary,
            },
        );
    }

    pub fn list_secrets(&self) -> Vec<SecretSummary> {
        self.entries
            .read()
            .unwrap()
            .values()
            .map(|e| e.summary.clone())
            .collect()
    }

    /// Resolves a reference to its typed credential, refreshing the
    /// tracked `last_used`/`status` metadata on the way.
    pub fn get_secret(&self, reference: &str) -> Result<Credential, CapabilityError> {
        let (secret_type, source, location) = {
            let entries = self.entries.read().unwrap();
            let entry = entries
                .get(reference)
                .ok_or_else(|| CapabilityError::Unknown(reference.to_string()))?;
            (entry.secret_type, entry.source, entry.location.clone())
        };

        let result = resolve(reference, secret_type, source, &location);

        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get_mut(reference) {
            match &result {
                Ok(_) => entry.summary.mark_used(Utc::now()),
                Err(CapabilityError::EnvVarMissing(_)) | Err(CapabilityError::Unreadable { .. }) => {
                    entry.summary.mark_missing();
                }
                Err(_) => entry.summary.mark_invalid(),
            }
        }

        result
    }

    /// Convenience accessor for the single-string credential kinds
    /// (SNMP community, API token). Returns
    /// [`CapabilityError::UnsupportedSource`] for multi-field kinds.
    pub fn get_secret_value(&self, reference: &str) -> Result<String, CapabilityError> {
        let credential = self.get_secret(reference)?;
        credential
            .as_single_value()
            .map(str::to_string)
            .ok_or_else(|| CapabilityError::UnsupportedSource(reference.to_string()))
    }
}

impl Default for CapabilityManager {
    fn default() -> Self {
        CapabilityManager::new()
    }
}

fn resolve(
    reference: &str,
    secret_type: SecretType,
    source: SecretSource,
    location: &str,
) -> Result<Credential, CapabilityError> {
    match (source, secret_type) {
        (SecretSource::EnvVar, SecretType::SnmpCommunity) => {
            env_value(location).map(Credential::SnmpCommunity)
        }
        (SecretSource::EnvVar, SecretType::ApiToken) => {
            env_value(location).map(Credential::ApiToken)
        }
        (SecretSource::File, SecretType::SshKey) => {
            fs::metadata(location).map_err(|source| CapabilityError::Unreadable {
                reference: reference.to_string(),
                source,
            })?;
            Ok(Credential::SshKey {
                private_key_path: location.to_string(),
                passphrase: None,
            })
        }
        (SecretSource::File, SecretType::Certificate) => {
            let (cert_path, key_path) = location.split_once(';').ok_or_else(|| {
                CapabilityError::Unreadable {
                    reference: reference.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "expected 'cert_path;key_path'",
                    ),
                }
            })?;
            fs::metadata(cert_path).map_err(|source| CapabilityError::Unreadable {
                reference: reference.to_string(),
                source,
            })?;
            fs::metadata(key_path).map_err(|source| CapabilityError::Unreadable {
                reference: reference.to_string(),
                source,
            })?;
            Ok(Credential::Certificate {
                cert_path: cert_path.to_string(),
                key_path: key_path.to_string(),
            })
        }
        (SecretSource::File, SecretType::ApiKeyPair) => {
            let contents = fs::read_to_string(location).map_err(|source| CapabilityError::Unreadable {
                reference: reference.to_string(),
                source,
            })?;
            let (key, secret) = contents.trim().split_once(':').ok_or_else(|| {
                CapabilityError::Unreadable {
                    reference: reference.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "expected 'key:secret'",
                    ),
                }
            })?;
            Ok(Credential::ApiKeyPair {
                key: key.to_string(),
                secret: secret.to_string(),
            })
        }
        (SecretSource::OsKeyring, _) | (SecretSource::Vault, _) => {
            warn!(reference, ?source, "secret source not implemented");
            Err(CapabilityError::UnsupportedSource(reference.to_string()))
        }
        _ => Err(CapabilityError::UnsupportedSource(reference.to_string())),
    }
}

fn env_value(name: &str) -> Result<String, CapabilityError> {
    let value = std::env::var(name).map_err(|_| CapabilityError::EnvVarMissing(name.to_string()))?;
    if value.is_empty() {
        return Err(CapabilityError::Empty(name.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reference_errors() {
        let manager = CapabilityManager::new();
        let result = manager.get_secret("nope");
        assert!(matches!(result, Err(CapabilityError::Unknown(_))));
    }

    #[test]
    fn env_var_resolution_round_trips() {
        std::env::set_var("SPECULARIUM_TEST_SNMP", "public");
        let manager = CapabilityManager::new();
        manager.register(
            "snmp/default",
            SecretType::SnmpCommunity,
            SecretSource::EnvVar,
            "SPECULARIUM_TEST_SNMP",
        );
        let value = manager.get_secret_value("snmp/default").unwrap();
        assert_eq!(value, "public");
        std::env::remove_var("SPECULARIUM_TEST_SNMP");
    }

    #[test]
    fn missing_env_var_marks_secret_missing() {
        let manager = CapabilityManager::new();
        manager.register(
            "token/default",
            SecretType::ApiToken,
            SecretSource::EnvVar,
            "SPECULARIUM_TEST_MISSING_TOKEN",
        );
        assert!(manager.get_secret("token/default").is_err());
        let summaries = manager.list_secrets();
        assert_eq!(summaries[0].status, SecretStatus::Missing);
    }

    #[test]
    fn ssh_key_resolution_checks_file_exists() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let manager = CapabilityManager::new();
        manager.register(
            "ssh/default",
            SecretType::SshKey,
            SecretSource::File,
            file.path().to_str().unwrap(),
        );
        assert!(manager.get_secret("ssh/default").is_ok());
    }

    #[test]
    fn vault_source_is_unsupported() {
        let manager = CapabilityManager::new();
        manager.register(
            "vault/default",
            SecretType::ApiToken,
            SecretSource::Vault,
            "secret/data/specularium",
        );
        assert!(matches!(
            manager.get_secret("vault/default"),
            Err(CapabilityError::UnsupportedSource(_))
        ));
    }
}
