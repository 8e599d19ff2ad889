//! snmp-manager - command-line client for snmp-agent.

use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use snmp_core::protocol::{Oid, Value, ValueType, VarBind};
use snmp_manager::display::{bulk_banner, render_bulk, render_get, render_set};
use snmp_manager::{Response, Session};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Simplified SNMP manager.
#[derive(Debug, Parser)]
#[command(name = "snmp-manager", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Connect, read and write timeout in seconds.
    #[arg(long, global = true, default_value_t = 10.0)]
    timeout: f64,

    /// Log filter used when `RUST_LOG` is unset. Logs go to stderr.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read one or more objects.
    Get {
        /// Agent address, `host:port`.
        target: String,
        /// Identifiers to read.
        #[arg(required = true)]
        oids: Vec<Oid>,
    },
    /// Write one object.
    Set {
        /// Agent address, `host:port`.
        target: String,
        /// Identifier to write.
        oid: Oid,
        /// One of integer, string, counter, timeticks.
        value_type: ValueType,
        /// New value.
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Read objects following a starting identifier.
    Bulk {
        /// Agent address, `host:port`.
        target: String,
        /// Walk starts strictly after this identifier.
        start: Oid,
        /// Maximum number of objects to return.
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        max_repetitions: u16,
    },
}

impl Command {
    fn target(&self) -> &str {
        match self {
            Self::Get { target, .. } | Self::Set { target, .. } | Self::Bulk { target, .. } => {
                target
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let timeout = Duration::try_from_secs_f64(cli.timeout).context("invalid --timeout")?;
    let target = cli.command.target();
    let mut session = Session::connect(target, timeout)
        .await
        .with_context(|| format!("cannot reach agent at {target}"))?;

    let response = match &cli.command {
        Command::Get { oids, .. } => {
            let response = session.get(oids).await.context("get failed")?;
            print_lines(&render_get(&response));
            response
        },
        Command::Set {
            oid,
            value_type,
            value,
            ..
        } => {
            let value = Value::parse_as(*value_type, value)?;
            let response = session
                .set(&[VarBind::new(oid.clone(), value)])
                .await
                .context("set failed")?;
            print_lines(&render_set(&response));
            response
        },
        Command::Bulk {
            start,
            max_repetitions,
            ..
        } => {
            println!("{}", bulk_banner(start, *max_repetitions));
            let started = Instant::now();
            let response = session
                .bulk(start, *max_repetitions)
                .await
                .context("bulk failed")?;
            print_lines(&render_bulk(&response, started.elapsed()));
            response
        },
    };

    Ok(exit_code(&response))
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn exit_code(response: &Response) -> ExitCode {
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
