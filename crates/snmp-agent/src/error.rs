//! Agent error types.

use std::io;
use std::net::SocketAddr;

use snmp_core::mib::SeedError;
use snmp_core::protocol::ProtocolError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the agent.
///
/// Only [`AgentError::Protocol`] and [`AgentError::UnexpectedResponse`] occur
/// while serving a connection, and both end that connection. The rest are
/// startup failures.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Framing or codec failure on a connection.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A manager sent a response message where a request was expected.
    #[error("unexpected response message from manager (request_id={request_id})")]
    UnexpectedResponse {
        /// Id carried by the offending message.
        request_id: u32,
    },

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The object table could not be loaded.
    #[error(transparent)]
    Seed(#[from] SeedError),
}

impl AgentError {
    /// Returns `true` if the peer simply went away.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::ConnectionClosed))
    }
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
