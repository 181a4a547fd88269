//! The five bootstrap phases. Each is independent and its failure is
//! recoverable: a phase that can't complete simply contributes no
//! evidence rather than aborting the remaining phases.

use chrono::Utc;
use specularium_core::evidence::{Evidence, EvidenceSource};
use specularium_core::property::PropertyValue;
use tracing::debug;

use crate::error::BootstrapError;
use crate::evidence_set::EvidenceSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Environment,
    Resources,
    Permissions,
    Network,
    Synthesis,
}

impl Phase {
    pub const ORDER: [Phase; 5] = [
        Phase::Environment,
        Phase::Resources,
        Phase::Permissions,
        Phase::Network,
        Phase::Synthesis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Environment => "environment",
            Phase::Resources => "resources",
            Phase::Permissions => "permissions",
            Phase::Network => "network",
            Phase::Synthesis => "synthesis",
        }
    }
}

/// Detects the operating system family and container/VM-ness. Currently
/// only the OS family is probed; detecting containerization would need
/// reading `/proc`, which is left for a future phase refinement.
pub fn probe_environment() -> Result<Vec<(String, Evidence)>, BootstrapError> {
    let now = Utc::now();
    let family = std::env::consts::OS.to_string();
    let evidence = Evidence::new(
        "environment",
        "os_family",
        PropertyValue::Text(family),
        EvidenceSource::OperatorAsserted,
        now,
    );
    Ok(vec![("environment::os_family".to_string(), evidence)])
}

/// Probes CPU count and a best-effort read of available memory. Memory
/// detection is Linux-specific (`/proc/meminfo`); other platforms get
/// only the CPU count.
pub fn probe_resources() -> Result<Vec<(String, Evidence)>, BootstrapError> {
    let now = Utc::now();
    let mut out = Vec::new();

    let cpus = num_cpus::get();
    out.push((
        "resources::cpu_count".to_string(),
        Evidence::new(
            "resources",
            "cpu_count",
            PropertyValue::Number(cpus as f64),
            EvidenceSource::OperatorAsserted,
            now,
        ),
    ));

    if let Some(total_kb) = read_meminfo_total_kb() {
        out.push((
            "resources::memory_kb".to_string(),
            Evidence::new(
                "resources",
                "memory_kb",
                PropertyValue::Number(total_kb as f64),
                EvidenceSource::ProcessFilesystemInspection,
                now,
            ),
        ));
    } else {
        debug!("memory probe unavailable on this platform");
    }

    Ok(out)
}

#[cfg(target_os = "linux")]
fn read_meminfo_total_kb() -> Option<u64> {
    let contents = std::fs::read_to_string("/proc/meminfo").ok()?;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            return rest.trim().split_whitespace().next()?.parse().ok();
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn read_meminfo_total_kb() -> Option<u64> {
    None
}

/// Probes whether the process is running as root (raw sockets, ICMP,
/// and privileged scan techniques need this) and whether a raw socket
/// can actually be opened, which is the more direct signal.
pub fn probe_permissions() -> Result<Vec<(String, Evidence)>, BootstrapError> {
    let now = Utc::now();
    let is_root = current_uid_is_root();
    Ok(vec![(
        "permissions::is_root".to_string(),
        Evidence::new(
            "permissions",
            "is_root",
            PropertyValue::Bool(is_root),
            EvidenceSource::ProcessFilesystemInspection,
            now,
        ),
    )])
}

#[cfg(target_os = "linux")]
fn current_uid_is_root() -> bool {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return false;
    };
    status
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .and_then(|rest| rest.trim().split_whitespace().next())
        .map(|uid| uid == "0")
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn current_uid_is_root() -> bool {
    false
}

/// Probes basic network reachability: whether the process can open a
/// UDP socket at all (a prerequisite for every later adapter). This
/// deliberately does not attempt outbound connectivity, since a
/// disconnected operator network is a valid environment to bootstrap
/// into.
pub fn probe_network() -> Result<Vec<(String, Evidence)>, BootstrapError> {
    let now = Utc::now();
    let can_bind = std::net::UdpSocket::bind("0.0.0.0:0").is_ok();
    Ok(vec![(
        "network::can_bind_socket".to_string(),
        Evidence::new(
            "network",
            "can_bind_socket",
            PropertyValue::Bool(can_bind),
            EvidenceSource::ProcessFilesystemInspection,
            now,
        ),
    )])
}

/// Folds every prior phase's evidence into a single recommended mode,
/// collapsing toward the least capable option whenever the evidence
/// doesn't support more: `discovery` → `monitor` → `passive` in that
/// preference order. Not itself a probe: synthesis only reads what the
/// other four phases already recorded into `set`.
pub fn synthesize_mode(set: &EvidenceSet) -> specularium_config::Mode {
    use specularium_config::Mode;

    let is_root = set
        .best_value("permissions::is_root")
        .and_then(PropertyValue::as_bool)
        .unwrap_or(false);
    let can_bind = set
        .best_value("network::can_bind_socket")
        .and_then(PropertyValue::as_bool)
        .unwrap_or(false);
    let cpu_count = set
        .best_value("resources::cpu_count")
        .and_then(PropertyValue::as_number)
        .unwrap_or(1.0);

    if !can_bind {
        return Mode::Passive;
    }
    if is_root && cpu_count >= 4.0 {
        return Mode::Discovery;
    }
    Mode::Monitor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_socket_access_forces_passive() {
        let set = EvidenceSet::new();
        assert_eq!(synthesize_mode(&set), specularium_config::Mode::Passive);
    }

    #[test]
    fn probe_environment_reports_this_os() {
        let results = probe_environment().unwrap();
        assert_eq!(results.len(), 1);
    }
}
