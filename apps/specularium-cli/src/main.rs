//! Command-line entry point: a thin switchboard over the engine crates.
//! `main` only parses arguments, wires the crates together, and hands
//! control to the engine; the engine's actual behavior lives in the
//! library crates so it can be exercised without going through a
//! binary at all.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use specularium_adapter::{Adapter, EventBus, Registry};
use specularium_adapters::{BootstrapAdapter, NmapAdapter, SshProbeAdapter, SubnetScannerAdapter, VerifierAdapter};
use specularium_capability::CapabilityManager;
use specularium_codecs::{AnsibleInventoryCodec, Exporter, JsonCodec, YamlGraphCodec};
use specularium_config::Config;
use specularium_core::secret::{SecretSource, SecretType};
use specularium_observability::{init_tracing, LogFormat};
use specularium_reconcile::{reconcile, GraphStore};

#[derive(Parser)]
#[command(name = "specularium")]
#[command(version, about = "Network topology discovery and reconciliation engine")]
struct Cli {
    /// Path to a config file, bypassing the usual search locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the local environment and report the recommended posture.
    Bootstrap,
    /// Start every configured adapter and reconcile continuously until interrupted.
    Run {
        /// Seconds between sync sweeps.
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
        /// Write the final graph to this path on shutdown.
        #[arg(long)]
        export_path: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        export_format: ExportFormat,
    },
    /// Run a one-shot sweep of a CIDR block and print the resulting graph.
    Scan {
        cidr: String,
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        export_format: ExportFormat,
    },
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as YAML.
    Show,
    /// Print the paths searched for a config file, in precedence order.
    Path,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Yaml,
    Ansible,
}

fn export(format: ExportFormat, store: &GraphStore) -> Result<String> {
    let nodes = store.nodes();
    let edges = store.edges();
    let rendered = match format {
        ExportFormat::Json => JsonCodec.export(&nodes, &edges)?,
        ExportFormat::Yaml => YamlGraphCodec.export(&nodes, &edges)?,
        ExportFormat::Ansible => AnsibleInventoryCodec.export(&nodes, &edges)?,
    };
    Ok(rendered)
}

fn load_config(override_path: Option<&PathBuf>) -> Result<Config> {
    match override_path {
        Some(path) => Config::load_from(path).with_context(|| format!("loading config from {}", path.display())),
        None => Config::load().context("loading config from search locations"),
    }
}

/// Registers every adapter the effective config enables, in the order
/// the registry will run them (priority, not registration order,
/// governs that at sync time).
async fn build_registry(config: &Config, store: Arc<GraphStore>, capabilities: Arc<CapabilityManager>) -> Arc<Registry> {
    let registry = Arc::new(Registry::new(EventBus::new()));
    let behavior = config.effective_behavior();

    registry
        .register(Arc::new(BootstrapAdapter::new()))
        .await
        .expect("bootstrap adapter registers exactly once");

    if config.adapters.subnet_scanner {
        registry
            .register(Arc::new(SubnetScannerAdapter::new(
                config.network.subnets.clone(),
                config.network.discovery_ports.clone(),
                behavior.clone(),
                registry.events().clone(),
            )))
            .await
            .expect("subnet scanner adapter registers exactly once");
    }

    if config.adapters.verifier {
        registry
            .register(Arc::new(VerifierAdapter::new(store.clone(), behavior.clone())))
            .await
            .expect("verifier adapter registers exactly once");
    }

    if config.adapters.nmap {
        registry
            .register(Arc::new(NmapAdapter::new(store.clone(), behavior.clone())))
            .await
            .expect("nmap adapter registers exactly once");
    }

    if config.adapters.ssh_probe {
        capabilities.register(
            "ssh/default",
            SecretType::SshKey,
            SecretSource::File,
            std::env::var("SPECULARIUM_SSH_KEY_PATH").unwrap_or_else(|_| "~/.ssh/id_ed25519".to_string()),
        );
        registry
            .register(Arc::new(SshProbeAdapter::new(
                store,
                capabilities,
                "ssh/default",
                behavior,
            )))
            .await
            .expect("ssh probe adapter registers exactly once");
    }

    registry
}

async fn sync_and_reconcile(registry: &Registry, store: &GraphStore) {
    let fragments = registry.trigger_sync_all().await;
    for (name, priority, fragment) in fragments {
        let outcome = reconcile(store, &name, priority, fragment, chrono::Utc::now());
        if outcome.discrepancies_raised > 0 {
            warn!(count = outcome.discrepancies_raised, "new discrepancies raised this sweep");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("specularium", LogFormat::Auto);
    let cli = Cli::parse();

    match cli.command {
        Command::Bootstrap => {
            let engine = specularium_bootstrap::BootstrapEngine::new();
            let report = engine.run().await;
            info!(mode = ?report.recommended_mode, "bootstrap complete");
            println!("recommended mode: {:?}", report.recommended_mode);
            for (key, value) in report.evidence.summary() {
                println!("  {key}: {value:?}");
            }
        }

        Command::Scan { cidr, export_format } => {
            let store = Arc::new(GraphStore::new());
            let default_config = Config::default();
            let behavior = default_config.effective_behavior();
            let scanner = SubnetScannerAdapter::new(
                vec![cidr],
                default_config.network.discovery_ports.clone(),
                behavior,
                EventBus::new(),
            );
            let fragment = scanner.sync().await.context("subnet sweep failed")?;
            let outcome = reconcile(&store, "subnet_scanner", scanner.priority(), fragment, chrono::Utc::now());
            info!(nodes = outcome.nodes_touched, "scan complete");
            println!("{}", export(export_format, &store)?);
        }

        Command::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_ref())?;
                println!("{}", serde_yml::to_string(&config)?);
            }
            ConfigAction::Path => {
                for path in Config::search_paths() {
                    println!("{}", path.display());
                }
            }
        },

        Command::Run {
            interval_secs,
            export_path,
            export_format,
        } => {
            let config = load_config(cli.config.as_ref())?;
            if config.mode_exceeds_recommendation() {
                warn!(
                    chosen = ?config.mode,
                    recommended = ?config.bootstrap.as_ref().map(|b| b.mode),
                    "operator-selected mode reaches further than bootstrap recommended"
                );
            }

            let store = Arc::new(GraphStore::new());
            let capabilities = Arc::new(CapabilityManager::new());
            let registry = build_registry(&config, store.clone(), capabilities).await;

            registry.start_all().await;
            info!("adapters started, entering sync loop");

            let shutdown = Arc::new(AtomicBool::new(false));
            let shutdown_handle = shutdown.clone();
            ctrlc::set_handler(move || {
                warn!("shutdown requested, finishing current sweep");
                shutdown_handle.store(true, Ordering::SeqCst);
            })
            .context("installing signal handler")?;

            while !shutdown.load(Ordering::SeqCst) {
                sync_and_reconcile(&registry, &store).await;
                info!(nodes = store.node_count(), edges = store.edge_count(), "sweep complete");

                let mut waited = Duration::ZERO;
                let step = Duration::from_millis(250);
                while waited < Duration::from_secs(interval_secs) && !shutdown.load(Ordering::SeqCst) {
                    tokio::time::sleep(step).await;
                    waited += step;
                }
            }

            registry.stop_all().await;

            if let Some(path) = export_path {
                let rendered = export(export_format, &store)?;
                std::fs::write(&path, rendered).with_context(|| format!("writing export to {}", path.display()))?;
                info!(path = %path.display(), "final graph exported");
            }

            info!("shutdown complete");
        }
    }

    Ok(())
}
