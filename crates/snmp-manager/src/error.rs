//! Manager error types.

use std::io;

use snmp_core::protocol::{PduType, ProtocolError};
use thiserror::Error;

/// Errors from a manager session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The agent could not be reached.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        /// Target as given by the caller.
        target: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Framing, codec or transport failure. The session is unusable
    /// afterwards.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The reply carries a different request id than the request.
    #[error("response id {actual} does not match request id {expected}")]
    Correlation {
        /// Id sent.
        expected: u32,
        /// Id received.
        actual: u32,
    },

    /// The agent replied with something other than a response.
    #[error("expected a response, agent sent {op:?}")]
    UnexpectedMessage {
        /// Operation received.
        op: PduType,
    },
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
