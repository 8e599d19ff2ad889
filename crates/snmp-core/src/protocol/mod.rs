//! Wire protocol and framing module.
//!
//! This module handles the binary protocol spoken between manager and agent:
//! identifier and value codecs, the message codec, and reassembly of whole
//! messages from a byte stream.
//!
//! # Architecture
//!
//! The protocol stack is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Messages (Get/Set/Bulk/Resp)     │  message.rs
//! ├─────────────────────────────────────────┤
//! │      Identifiers and typed values       │  oid.rs, value.rs
//! ├─────────────────────────────────────────┤
//! │               Framing                   │  Length-prefixed
//! ├─────────────────────────────────────────┤
//! │            TCP Transport                │  Byte stream
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Module Overview
//!
//! - [`error`]: Protocol error types ([`ProtocolError`], [`ProtocolResult`])
//! - [`oid`]: Dotted identifiers ([`Oid`])
//! - [`value`]: Typed values ([`Value`], [`ValueType`])
//! - [`message`]: Message codec ([`Message`], [`Pdu`], [`VarBind`])
//! - [`framing`]: Stream reassembly ([`FrameReader`], [`write_frame`])
//!
//! # Wire Format
//!
//! ```text
//! +----------------+----------------+-----------+--------------------+---------+
//! | total_size (4) | request_id (4) | op_tag(1) | status(1) response | payload |
//! +----------------+----------------+-----------+--------------------+---------+
//! ```
//!
//! - All multi-byte integers are big-endian
//! - `total_size` counts the whole message, including itself
//! - Maximum message size: 64 KiB
//!
//! # Usage Example
//!
//! ```ignore
//! use snmp_core::protocol::{FrameReader, Message, Pdu, write_frame};
//!
//! let request = Message::new(1001, Pdu::GetRequest { oids: vec!["1.3.6.1.2.1.1.1.0".parse()?] });
//! write_frame(&mut writer, &request.encode()?, timeout).await?;
//!
//! let mut frames = FrameReader::new(reader);
//! let response = Message::decode(&frames.read_frame_timeout(timeout).await?)?;
//! ```

pub mod error;
pub mod framing;
pub mod message;
pub mod oid;
pub mod value;

// Re-export commonly used types at module level
pub use error::{
    LENGTH_PREFIX_SIZE, MAX_BINDINGS, MAX_MESSAGE_SIZE, MAX_READ_CHUNK, MIN_MESSAGE_SIZE,
    ProtocolError, ProtocolResult, RESPONSE_HEADER_SIZE,
};
pub use framing::{FrameReader, write_frame};
pub use message::{
    ErrorStatus, Message, Pdu, PduType, VarBind, binding_size, decode, encode_get_bulk_request,
    encode_get_request, encode_response, encode_set_request, response_size,
};
pub use oid::{MAX_OID_ARCS, Oid};
pub use value::{
    MAX_TEXT_LEN, NUMERIC_VALUE_LEN, ParseValueError, Value, ValueType, decode_value, encode_value,
};
