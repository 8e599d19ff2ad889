//! snmp-agent - serves a managed-object table over TCP.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use snmp_agent::{AgentConfig, AgentServer, load_store};
use snmp_core::mib::SharedMib;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Simplified SNMP agent.
#[derive(Debug, Parser)]
#[command(name = "snmp-agent", version, about)]
struct Cli {
    /// Port to listen on (shorthand for changing only the port of --bind).
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Address to listen on.
    #[arg(short, long, env = "SNMP_AGENT_ADDR")]
    bind: Option<SocketAddr>,

    /// TOML config file.
    #[arg(short, long, env = "SNMP_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// TOML seed file for the object table.
    #[arg(short, long, env = "SNMP_AGENT_SEED")]
    seed: Option<PathBuf>,

    /// Maximum connections served at once.
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Layer flags over the config file over the defaults.
    fn agent_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => AgentConfig::default(),
        };
        if let Some(bind) = self.bind {
            config = config.with_bind_addr(bind);
        }
        if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        if let Some(seed) = &self.seed {
            config = config.with_seed(seed);
        }
        if let Some(max) = self.max_connections {
            config = config.with_max_connections(max);
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = cli.agent_config()?;
    let store = load_store(config.seed.as_deref()).context("failed to load object table")?;
    info!(
        seed = %config.seed.as_ref().map_or_else(|| "built-in".to_string(), |p| p.display().to_string()),
        objects = store.len(),
        "starting snmp-agent"
    );

    let server = AgentServer::bind(config, SharedMib::new(store))
        .await
        .context("failed to start agent")?;
    info!(
        addr = %server.local_addr().context("failed to read listen address")?,
        "SNMP agent listening"
    );

    tokio::select! {
        () = server.serve() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                error!(error = %err, "failed to listen for shutdown signal");
            }
            info!("shutting down");
        }
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
