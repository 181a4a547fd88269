//! Configuration: where it lives on disk, what it defaults to, and how
//! an operator-selected posture interacts with the posture bootstrap
//! recommends.
//!
//! `mode` and `posture` are orthogonal: `mode` is the capability
//! ceiling (how far the engine is allowed to reach at all — passive,
//! monitor, or discovery), `posture` is how aggressively it behaves
//! within whatever mode is in effect (stealth through aggressive).

pub mod error;
pub mod posture;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;
pub use posture::{Posture, PostureProfile};

/// The capability ceiling: how far the engine is allowed to reach into
/// the network, independent of how aggressively (`Posture`) it probes
/// within that ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Passive,
    Monitor,
    Discovery,
}

impl Mode {
    /// Numeric level used by [`Config::mode_exceeds_recommendation`]:
    /// passive=0, monitor=1, discovery=2.
    pub fn level(self) -> u8 {
        match self {
            Mode::Passive => 0,
            Mode::Monitor => 1,
            Mode::Discovery => 2,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Monitor
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Ports the subnet scanner's per-host phase checks. Reachability
    /// (phase one) uses the same set.
    #[serde(default = "default_discovery_ports")]
    pub discovery_ports: Vec<u16>,
}

fn default_discovery_ports() -> Vec<u16> {
    vec![22, 80, 443]
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            subnets: Vec::new(),
            exclude: Vec::new(),
            discovery_ports: default_discovery_ports(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default = "default_true")]
    pub subnet_scanner: bool,
    #[serde(default = "default_true")]
    pub verifier: bool,
    #[serde(default)]
    pub nmap: bool,
    #[serde(default)]
    pub ssh_probe: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            subnet_scanner: true,
            verifier: true,
            nmap: false,
            ssh_probe: false,
        }
    }
}

/// Per-field overrides layered on top of the posture profile the
/// effective mode/posture resolves to. Any field left `None` falls
/// through to the posture table unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorOverrides {
    #[serde(default, with = "option_duration_secs")]
    pub verify_interval: Option<Duration>,
    #[serde(default, with = "option_duration_secs")]
    pub scan_interval: Option<Duration>,
    #[serde(default)]
    pub probe_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_concurrent_probes: Option<u32>,
    #[serde(default)]
    pub max_concurrent_scans: Option<u32>,
}

mod option_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

/// Bootstrap's recommendation as carried in config, trimmed to the two
/// fields the configuration engine actually consults (the full
/// evidence trail lives in the bootstrap report itself, not here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSummary {
    pub mode: Mode,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "./specularium.db".to_string()
}

/// One capability's availability and gating. Core capabilities are
/// always `available`; plugin capabilities (scanner, nmap, ssh_probe,
/// snmp) have their availability set at runtime from installed
/// binaries and configured secrets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityGate {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub min_mode: Mode,
}

impl CapabilityGate {
    pub fn core() -> Self {
        CapabilityGate {
            enabled: true,
            available: true,
            min_mode: Mode::Passive,
        }
    }

    pub fn gated(min_mode: Mode) -> Self {
        CapabilityGate {
            enabled: false,
            available: false,
            min_mode,
        }
    }

    pub fn is_active(&self, current_mode: Mode) -> bool {
        self.enabled && self.available && current_mode.level() >= self.min_mode.level()
    }
}

const CORE_CAPABILITIES: &[&str] = &["http_server", "sse_events", "import_export", "basic_verification"];

fn default_capabilities() -> BTreeMap<String, CapabilityGate> {
    let mut caps = BTreeMap::new();
    for name in CORE_CAPABILITIES {
        caps.insert(name.to_string(), CapabilityGate::core());
    }
    caps.insert("scanner".to_string(), CapabilityGate::gated(Mode::Discovery));
    caps.insert("nmap".to_string(), CapabilityGate::gated(Mode::Discovery));
    caps.insert("ssh_probe".to_string(), CapabilityGate::gated(Mode::Monitor));
    caps.insert("snmp".to_string(), CapabilityGate::gated(Mode::Monitor));
    caps
}

/// Top-level configuration. `mode` is what the operator explicitly set
/// in the file (if anything); `bootstrap` carries what bootstrap
/// computed from the environment it found itself in. Neither alone is
/// authoritative; see [`Config::effective_mode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub bootstrap: Option<BootstrapSummary>,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub posture: Posture,
    #[serde(default)]
    pub behavior: Option<BehaviorOverrides>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default = "default_capabilities")]
    pub capabilities: BTreeMap<String, CapabilityGate>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub adapters: AdapterConfig,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub secrets: Vec<String>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: default_version(),
            bootstrap: None,
            mode: None,
            posture: Posture::default(),
            behavior: None,
            database: DatabaseConfig::default(),
            capabilities: default_capabilities(),
            network: NetworkConfig::default(),
            adapters: AdapterConfig::default(),
            targets: Vec::new(),
            secrets: Vec::new(),
        }
    }
}

impl Config {
    /// `applyDefaults`: stamps version=1, posture=balanced, the default
    /// database path, and forces core capabilities on. Called once
    /// after every load so a partially-specified file still ends up
    /// with a fully-formed configuration.
    pub fn apply_defaults(&mut self) {
        if self.version == 0 {
            self.version = default_version();
        }
        if self.database.path.is_empty() {
            self.database.path = default_database_path();
        }
        for name in CORE_CAPABILITIES {
            self.capabilities.entry(name.to_string()).or_insert_with(CapabilityGate::core);
            let gate = self.capabilities.get_mut(*name).unwrap();
            gate.enabled = true;
            gate.available = true;
        }
    }

    /// The mode actually in effect: the operator's explicit choice if
    /// set, else bootstrap's recommendation, else `monitor`.
    pub fn effective_mode(&self) -> Mode {
        self.mode
            .or_else(|| self.bootstrap.as_ref().map(|b| b.mode))
            .unwrap_or_default()
    }

    /// The posture profile in effect, with any configured per-field
    /// overrides applied on top.
    pub fn effective_behavior(&self) -> PostureProfile {
        let mut profile = self.posture.profile();
        if let Some(overrides) = &self.behavior {
            if let Some(verify_interval) = overrides.verify_interval {
                profile.verify_interval = verify_interval;
            }
            if let Some(scan_interval) = overrides.scan_interval {
                profile.scan_interval = scan_interval;
            }
            if let Some(timeout) = overrides.probe_timeout_secs {
                profile.timeout_secs = timeout;
            }
            if let Some(max_probes) = overrides.max_concurrent_probes {
                profile.max_probes_per_host = max_probes;
            }
            if let Some(max_scans) = overrides.max_concurrent_scans {
                profile.max_concurrent_scans = max_scans;
            }
        }
        profile
    }

    /// True when the operator's explicit mode override reaches further
    /// than bootstrap recommended for this environment. Callers use
    /// this to decide whether to warn before proceeding.
    pub fn mode_exceeds_recommendation(&self) -> bool {
        match (self.mode, self.bootstrap.as_ref().map(|b| b.mode)) {
            (Some(chosen), Some(recommended)) => chosen.level() > recommended.level(),
            _ => false,
        }
    }

    pub fn capability_active(&self, name: &str) -> bool {
        let mode = self.effective_mode();
        self.capabilities.get(name).is_some_and(|gate| gate.is_active(mode))
    }

    /// Search locations, lowest to highest precedence: compiled-in
    /// default, system-wide file, user file, project-local file, and
    /// finally an explicit override path from the environment.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        paths.push(PathBuf::from("/etc/specularium/config.yaml"));
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(Path::new(&home).join(".config/specularium/config.yaml"));
        }
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            paths.push(Path::new(&xdg).join("specularium/config.yaml"));
        }
        paths.push(PathBuf::from("specularium.yaml"));
        if let Ok(over) = std::env::var("SPECULARIUM_CONFIG") {
            paths.push(PathBuf::from(over));
        }
        paths
    }

    /// Loads configuration by applying every location in
    /// [`Config::search_paths`] over the default in order, so a later,
    /// more specific file overrides fields set by an earlier one. A
    /// missing file is skipped; a present-but-unparsable one is an
    /// error. Returns defaults, with defaults applied, if none exist.
    pub fn load() -> Result<Config, ConfigError> {
        let mut config = Config::default();
        for path in Config::search_paths() {
            if !path.exists() {
                continue;
            }
            config = Config::load_from(&path)?;
        }
        config.apply_defaults();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Config = serde_yml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.apply_defaults();
        Ok(config)
    }

    /// Writes configuration to `path`, creating parent directories with
    /// `0755` and the file itself with `0644` so a config directory
    /// shared between an operator and a service account stays readable
    /// without being world-writable.
    #[cfg(unix)]
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        use std::os::unix::fs::PermissionsExt;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                    path: parent.display().to_string(),
                    source,
                })?;
                fs::set_permissions(parent, fs::Permissions::from_mode(0o755)).map_err(|source| {
                    ConfigError::Write {
                        path: parent.display().to_string(),
                        source,
                    }
                })?;
            }
        }

        let text = serde_yml::to_string(self)?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })?;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644)).map_err(|source| {
            ConfigError::Write {
                path: path.display().to_string(),
                source,
            }
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        let text = serde_yml::to_string(self)?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn effective_mode_prefers_explicit_over_recommended() {
        let mut config = Config::default();
        config.mode = Some(Mode::Discovery);
        config.bootstrap = Some(BootstrapSummary { mode: Mode::Passive, warnings: Vec::new() });
        assert_eq!(config.effective_mode(), Mode::Discovery);
    }

    #[test]
    fn effective_mode_falls_back_to_recommended_then_monitor() {
        let mut config = Config::default();
        config.bootstrap = Some(BootstrapSummary { mode: Mode::Discovery, warnings: Vec::new() });
        assert_eq!(config.effective_mode(), Mode::Discovery);

        config.bootstrap = None;
        assert_eq!(config.effective_mode(), Mode::Monitor);
    }

    #[test]
    fn mode_exceeds_recommendation_detects_override() {
        let mut config = Config::default();
        config.mode = Some(Mode::Discovery);
        config.bootstrap = Some(BootstrapSummary { mode: Mode::Monitor, warnings: Vec::new() });
        assert!(config.mode_exceeds_recommendation());

        config.mode = Some(Mode::Passive);
        assert!(!config.mode_exceeds_recommendation());
    }

    #[test]
    fn effective_behavior_applies_overrides() {
        let mut config = Config::default();
        config.posture = Posture::Stealth;
        config.behavior = Some(BehaviorOverrides {
            verify_interval: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let behavior = config.effective_behavior();
        assert_eq!(behavior.verify_interval, Duration::from_secs(60));
        assert_eq!(behavior.scan_interval, Posture::Stealth.profile().scan_interval);
    }

    #[test]
    fn core_capabilities_are_always_active() {
        let config = Config::default();
        assert!(config.capability_active("http_server"));
    }

    #[test]
    fn scanner_capability_needs_discovery_mode() {
        let mut config = Config::default();
        config.capabilities.get_mut("scanner").unwrap().enabled = true;
        config.capabilities.get_mut("scanner").unwrap().available = true;
        config.mode = Some(Mode::Monitor);
        assert!(!config.capability_active("scanner"));

        config.mode = Some(Mode::Discovery);
        assert!(config.capability_active("scanner"));
    }

    #[test]
    fn round_trips_through_yaml_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.mode = Some(Mode::Monitor);
        config.network.subnets.push("10.0.0.0/24".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.mode, Some(Mode::Monitor));
        assert_eq!(loaded.network.subnets, vec!["10.0.0.0/24".to_string()]);
    }
}
