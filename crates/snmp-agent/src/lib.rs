//! Agent for the simplified SNMP protocol.
//!
//! The agent owns a [`SharedMib`](snmp_core::mib::SharedMib) and answers
//! `GetRequest`, `SetRequest` and `GetBulkRequest` messages from managers over
//! TCP.
//!
//! - [`config`]: listen address, limits and timeouts
//! - [`dispatch`]: request to response mapping
//! - [`server`]: listener, connection limit and per-connection loop
//!
//! ```ignore
//! let store = snmp_agent::load_store(None)?;
//! let server = AgentServer::bind(AgentConfig::default(), store.into()).await?;
//! server.serve().await;
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod server;

use std::path::Path;

use snmp_core::mib::{MibStore, SeedError, SeedTable};

pub use config::{AgentConfig, ConfigError};
pub use dispatch::Dispatcher;
pub use error::{AgentError, AgentResult};
pub use server::{AgentServer, ConnectionPermit, serve_connection};

/// Object table served when no seed file is configured.
pub const DEFAULT_SEED: &str = include_str!("../seed/default.toml");

/// Build the initial store from `seed`, or from [`DEFAULT_SEED`] if `None`.
///
/// # Errors
///
/// Returns the [`SeedError`] from reading or validating the table.
pub fn load_store(seed: Option<&Path>) -> Result<MibStore, SeedError> {
    let table = match seed {
        Some(path) => SeedTable::from_file(path)?,
        None => SeedTable::from_toml(DEFAULT_SEED)?,
    };
    table.into_store()
}
