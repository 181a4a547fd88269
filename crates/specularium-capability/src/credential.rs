//! Typed credential values. None of these derive `Debug` or any
//! serialization trait: a credential should never end up in a log line
//! or on the wire by accident.

use specularium_core::secret::SecretType;

#[allow(missing_debug_implementations)]
pub enum Credential {
    SshKey {
        private_key_path: String,
        passphrase: Option<String>,
    },
    SshPassword {
        username: String,
        password: String,
    },
    SnmpCommunity(String),
    ApiToken(String),
    ApiKeyPair {
        key: String,
        secret: String,
    },
    Certificate {
        cert_path: String,
        key_path: String,
    },
}

impl Credential {
    pub fn secret_type(&self) -> SecretType {
        match self {
            Credential::SshKey { .. } => SecretType::SshKey,
            Credential::SshPassword { .. } => SecretType::SshPassword,
            Credential::SnmpCommunity(_) => SecretType::SnmpCommunity,
            Credential::ApiToken(_) => SecretType::ApiToken,
            Credential::ApiKeyPair { .. } => SecretType::ApiKeyPair,
            Credential::Certificate { .. } => SecretType::Certificate,
        }
    }

    /// A single opaque string form, for the credential kinds that are
    /// naturally one value (a community string, a bearer token). Kinds
    /// with more than one field return `None`; callers that need the
    /// individual fields match on the enum directly.
    pub fn as_single_value(&self) -> Option<&str> {
        match self {
            Credential::SnmpCommunity(v) | Credential::ApiToken(v) => Some(v),
            _ => None,
        }
    }
}
