//! Protocol error types for the wire and framing layers.
//!
//! This module provides structured error types for protocol-level failures,
//! enabling callers to distinguish between different failure modes.
//!
//! # Error Classification
//!
//! - **Framing errors** ([`ProtocolError::is_framing`]): the byte stream can
//!   no longer be trusted. Fatal to the connection.
//! - **Codec errors** ([`ProtocolError::is_codec`]): a complete frame arrived
//!   but its contents are malformed. Fatal to the message; there is no resync
//!   point in a length-prefixed stream, so the connection is closed as well.
//!
//! Application failures (missing objects, permission denials) are not
//! protocol errors. They travel back to the manager as a response status, see
//! [`crate::mib::MibError`].

use std::io;

use thiserror::Error;

/// Size of the `total_size` length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of a request header: `total_size(4) | request_id(4) | op_tag(1)`.
pub const MIN_MESSAGE_SIZE: usize = 9;

/// Size of a response header, which carries one extra status byte.
pub const RESPONSE_HEADER_SIZE: usize = MIN_MESSAGE_SIZE + 1;

/// Maximum message size in bytes (64 KiB).
///
/// The frame reader rejects a larger length prefix before allocating.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Upper bound on the number of bytes requested from the transport per read.
pub const MAX_READ_CHUNK: usize = 4096;

/// Maximum number of identifiers or bindings in one message (1-byte count).
pub const MAX_BINDINGS: usize = u8::MAX as usize;

/// Protocol errors for the codec and framing layers.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The peer closed the stream between frames.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer closed the stream part way through a frame.
    #[error("connection closed mid-frame after {received} bytes")]
    TruncatedFrame {
        /// Bytes of the frame received before the stream ended.
        received: usize,
    },

    /// The length prefix does not match the number of bytes in the frame.
    #[error("frame length mismatch: header declares {declared} bytes, frame has {actual}")]
    FrameLengthMismatch {
        /// Value of the `total_size` field.
        declared: usize,
        /// Number of bytes actually present.
        actual: usize,
    },

    /// The length prefix is smaller than the smallest valid message.
    #[error("frame too short: {size} bytes, minimum {min} bytes")]
    FrameTooShort {
        /// Declared or actual frame size.
        size: usize,
        /// Minimum valid size.
        min: usize,
    },

    /// The length prefix exceeds the configured maximum.
    ///
    /// Detected before allocation.
    #[error("frame too large: {size} bytes exceeds maximum {max} bytes")]
    FrameTooLarge {
        /// Declared frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// A read or write did not finish within the caller's budget.
    #[error("operation timed out after {duration_ms} ms")]
    Timeout {
        /// Budget that elapsed, in milliseconds.
        duration_ms: u64,
    },

    /// Dotted identifier text could not be parsed.
    #[error("malformed identifier '{input}': {reason}")]
    MalformedIdentifier {
        /// The offending input.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An identifier has more arcs than a 1-byte length can describe.
    #[error("identifier has {arcs} arcs, maximum is {max}")]
    IdentifierTooLong {
        /// Number of arcs.
        arcs: usize,
        /// Maximum number of arcs.
        max: usize,
    },

    /// The value type tag is not one of the known types.
    #[error("unknown value type: 0x{0:02X}")]
    UnknownValueType(u8),

    /// Fewer value bytes are available than the value length declares.
    #[error("truncated value: declared {declared} bytes, {available} available")]
    TruncatedValue {
        /// Declared value length.
        declared: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// A fixed-width value was declared with the wrong length.
    #[error("bad length for {type_name} value: {length} bytes, expected {expected}")]
    BadValueLength {
        /// Name of the value type.
        type_name: &'static str,
        /// Declared length.
        length: usize,
        /// Required length.
        expected: usize,
    },

    /// A text value does not fit the 2-byte length field.
    #[error("value too long: {length} bytes exceeds maximum {max}")]
    ValueTooLong {
        /// Encoded length of the value.
        length: usize,
        /// Maximum encodable length.
        max: usize,
    },

    /// A text value is not valid UTF-8.
    #[error("text value is not valid UTF-8")]
    InvalidText,

    /// The operation tag is not one of the known operations.
    #[error("unknown operation: 0x{0:02X}")]
    UnknownOperation(u8),

    /// The status byte of a response is not one of the known codes.
    #[error("unknown status code: {0}")]
    UnknownStatus(u8),

    /// More identifiers or bindings than a 1-byte count can describe.
    #[error("too many identifiers: {count}, maximum is {max}")]
    TooManyIdentifiers {
        /// Number of identifiers requested.
        count: usize,
        /// Maximum per message.
        max: usize,
    },

    /// The payload ended before its grammar was satisfied.
    #[error("truncated message: needed {needed} more bytes for {field}")]
    TruncatedMessage {
        /// Field being read.
        field: &'static str,
        /// Bytes missing.
        needed: usize,
    },

    /// Bytes remain after the payload grammar was satisfied.
    #[error("{count} trailing bytes after message payload")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },

    /// Underlying I/O error from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Create a malformed identifier error.
    #[must_use]
    pub fn malformed_identifier(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error from the budget that elapsed.
    #[must_use]
    pub fn timeout(budget: std::time::Duration) -> Self {
        Self::Timeout {
            duration_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns `true` if the error means the byte stream itself is unusable.
    #[must_use]
    pub const fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed
                | Self::TruncatedFrame { .. }
                | Self::FrameLengthMismatch { .. }
                | Self::FrameTooShort { .. }
                | Self::FrameTooLarge { .. }
                | Self::Timeout { .. }
                | Self::Io(_)
        )
    }

    /// Returns `true` if the error is about the contents of a complete frame.
    #[must_use]
    pub const fn is_codec(&self) -> bool {
        !self.is_framing()
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
