//! Secret metadata: the capability manager resolves credentials by
//! reference, and this module is the shape of that reference plus the
//! summary a caller is allowed to see without the value itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    SshKey,
    SshPassword,
    SnmpCommunity,
    ApiToken,
    ApiKeyPair,
    Certificate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSource {
    EnvVar,
    File,
    OsKeyring,
    Vault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretStatus {
    Available,
    Missing,
    Invalid,
}

/// What a caller sees about a secret without the secret value itself.
/// `Secret` (the typed credential, defined in the capability crate that
/// resolves it) never derives `Debug`/`Serialize` so a stray log line
/// can't leak one; this summary is the safe view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretSummary {
    pub reference: String,
    pub secret_type: SecretType,
    pub source: SecretSource,
    pub status: SecretStatus,
    pub last_used: Option<DateTime<Utc>>,
}

impl SecretSummary {
    pub fn new(reference: impl Into<String>, secret_type: SecretType, source: SecretSource) -> Self {
        SecretSummary {
            reference: reference.into(),
            secret_type,
            source,
            status: SecretStatus::Available,
            last_used: None,
        }
    }

    pub fn mark_used(&mut self, used_at: DateTime<Utc>) {
        self.last_used = Some(used_at);
    }

    pub fn mark_missing(&mut self) {
        self.status = SecretStatus::Missing;
    }

    pub fn mark_invalid(&mut self) {
        self.status = SecretStatus::Invalid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_summary_starts_available() {
        let summary = SecretSummary::new("ssh/default", SecretType::SshKey, SecretSource::File);
        assert_eq!(summary.status, SecretStatus::Available);
        assert!(summary.last_used.is_none());
    }
}
