//! Bootstrap engine: runs the five phases in order, folding whatever
//! each recovers into one evidence set, then synthesizes a recommended
//! mode from it.

use specularium_config::Mode;
use tracing::{info, instrument, warn};

use crate::error::BootstrapError;
use crate::evidence_set::EvidenceSet;
use crate::phases::{self, Phase};

#[derive(Debug)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct BootstrapReport {
    pub outcomes: Vec<PhaseOutcome>,
    pub evidence: EvidenceSet,
    pub recommended_mode: Mode,
}

pub struct BootstrapEngine;

impl BootstrapEngine {
    pub fn new() -> Self {
        BootstrapEngine
    }

    /// Runs environment, resources, permissions, and network probes
    /// independently, recording each phase's outcome whether or not it
    /// produced evidence, then runs synthesis over whatever was
    /// collected.
    #[instrument(skip(self))]
    pub async fn run(&self) -> BootstrapReport {
        let mut evidence = EvidenceSet::new();
        let mut outcomes = Vec::new();

        for phase in [Phase::Environment, Phase::Resources, Phase::Permissions, Phase::Network] {
            let result = run_probe(phase);
            match result {
                Ok(entries) => {
                    for (key, ev) in entries {
                        evidence.record(key, ev);
                    }
                    outcomes.push(PhaseOutcome { phase, error: None });
                    info!(phase = phase.name(), "bootstrap phase completed");
                }
                Err(error) => {
                    warn!(phase = phase.name(), %error, "bootstrap phase failed, continuing");
                    outcomes.push(PhaseOutcome {
                        phase,
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        let recommended_mode = phases::synthesize_mode(&evidence);
        outcomes.push(PhaseOutcome {
            phase: Phase::Synthesis,
            error: None,
        });
        info!(mode = ?recommended_mode, "bootstrap synthesis complete");

        BootstrapReport {
            outcomes,
            evidence,
            recommended_mode,
        }
    }
}

impl Default for BootstrapEngine {
    fn default() -> Self {
        BootstrapEngine::new()
    }
}

fn run_probe(phase: Phase) -> Result<Vec<(String, specularium_core::evidence::Evidence)>, BootstrapError> {
    match phase {
        Phase::Environment => phases::probe_environment(),
        Phase::Resources => phases::probe_resources(),
        Phase::Permissions => phases::probe_permissions(),
        Phase::Network => phases::probe_network(),
        Phase::Synthesis => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_produces_an_outcome_per_phase() {
        let engine = BootstrapEngine::new();
        let report = engine.run().await;
        assert_eq!(report.outcomes.len(), 5);
    }

    #[tokio::test]
    async fn run_always_recommends_a_mode() {
        let engine = BootstrapEngine::new();
        let report = engine.run().await;
        let _: Mode = report.recommended_mode;
    }
}
