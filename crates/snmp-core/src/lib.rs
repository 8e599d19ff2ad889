//! Core library for the SNMP-style management protocol.
//!
//! This crate holds everything shared between the agent and the manager:
//!
//! - [`protocol`]: wire codec and stream framing
//! - [`mib`]: the ordered object store and its TOML seed loader
//!
//! Neither module performs network I/O of its own beyond the generic
//! [`protocol::FrameReader`] and [`protocol::write_frame`] helpers, which work
//! over any `AsyncRead` / `AsyncWrite`.

pub mod mib;
pub mod protocol;
