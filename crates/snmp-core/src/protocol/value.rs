//! Typed scalar values and their tagged wire encoding.
//!
//! # Wire Format
//!
//! ```text
//! +----------+-------------------+----------------------+
//! | type (1) | length (2, BE)    | data (length bytes)  |
//! +----------+-------------------+----------------------+
//! ```
//!
//! | Type      | Tag  | Data                                |
//! |-----------|------|-------------------------------------|
//! | INTEGER   | 0x02 | 4 bytes, two's-complement BE        |
//! | STRING    | 0x04 | 0..=65535 bytes of UTF-8            |
//! | COUNTER   | 0x41 | 4 bytes, unsigned BE                |
//! | TIMETICKS | 0x43 | 4 bytes, unsigned BE, 1/100 seconds |

use std::fmt;
use std::str::FromStr;

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::{ProtocolError, ProtocolResult};

/// Width of every numeric value on the wire.
pub const NUMERIC_VALUE_LEN: usize = 4;

/// Maximum encoded length of a text value (2-byte length field).
pub const MAX_TEXT_LEN: usize = u16::MAX as usize;

/// Discriminant of a [`Value`], as carried in the 1-byte type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueType {
    /// Signed 32-bit integer.
    #[serde(rename = "integer")]
    Integer = 0x02,
    /// UTF-8 text.
    #[serde(rename = "string")]
    Text = 0x04,
    /// Unsigned 32-bit counter.
    #[serde(rename = "counter")]
    Counter = 0x41,
    /// Unsigned 32-bit time in hundredths of a second.
    #[serde(rename = "timeticks")]
    Ticks = 0x43,
}

impl ValueType {
    /// The wire tag for this type.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Protocol name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "STRING",
            Self::Counter => "COUNTER",
            Self::Ticks => "TIMETICKS",
        }
    }
}

impl TryFrom<u8> for ValueType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x02 => Ok(Self::Integer),
            0x04 => Ok(Self::Text),
            0x41 => Ok(Self::Counter),
            0x43 => Ok(Self::Ticks),
            other => Err(ProtocolError::UnknownValueType(other)),
        }
    }
}

impl FromStr for ValueType {
    type Err = ParseValueError;

    /// Parses the lowercase names used on the command line and in seed files.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "integer" => Ok(Self::Integer),
            "string" => Ok(Self::Text),
            "counter" => Ok(Self::Counter),
            "timeticks" => Ok(Self::Ticks),
            _ => Err(ParseValueError::UnknownType(name.to_string())),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed scalar value held by a managed object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Signed 32-bit integer.
    Integer(i32),
    /// UTF-8 text, at most [`MAX_TEXT_LEN`] bytes when encoded.
    Text(String),
    /// Unsigned 32-bit counter.
    Counter(u32),
    /// Hundredths of a second.
    Ticks(u32),
}

impl Value {
    /// The type discriminant of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Integer(_) => ValueType::Integer,
            Self::Text(_) => ValueType::Text,
            Self::Counter(_) => ValueType::Counter,
            Self::Ticks(_) => ValueType::Ticks,
        }
    }

    /// Number of data bytes this value occupies on the wire.
    #[must_use]
    pub fn data_len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Integer(_) | Self::Counter(_) | Self::Ticks(_) => NUMERIC_VALUE_LEN,
        }
    }

    /// Number of bytes this value occupies on the wire including its
    /// type and length fields.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + 2 + self.data_len()
    }

    /// Build a value of the given type from user-supplied text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseValueError::InvalidNumber`] if a numeric type is
    /// requested and `text` is not a number in range for it.
    pub fn parse_as(value_type: ValueType, text: &str) -> Result<Self, ParseValueError> {
        let invalid = || ParseValueError::InvalidNumber {
            value_type,
            input: text.to_string(),
        };
        match value_type {
            ValueType::Integer => text.trim().parse().map(Self::Integer).map_err(|_| invalid()),
            ValueType::Counter => text.trim().parse().map(Self::Counter).map_err(|_| invalid()),
            ValueType::Ticks => text.trim().parse().map(Self::Ticks).map_err(|_| invalid()),
            ValueType::Text => Ok(Self::Text(text.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Counter(v) | Self::Ticks(v) => write!(f, "{v}"),
        }
    }
}

/// Errors from building a [`Value`] out of user text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseValueError {
    /// The type name is not one of `integer`, `string`, `counter`,
    /// `timeticks`.
    #[error("unknown value type '{0}', expected one of: integer, string, counter, timeticks")]
    UnknownType(String),

    /// The text is not a valid number for the requested type.
    #[error("'{input}' is not a valid {value_type} value")]
    InvalidNumber {
        /// Requested type.
        value_type: ValueType,
        /// Offending text.
        input: String,
    },
}

/// Append `type(1) | length(2) | data` for `value` to `dst`.
///
/// # Errors
///
/// Returns [`ProtocolError::ValueTooLong`] if a text value exceeds
/// [`MAX_TEXT_LEN`] bytes.
pub fn encode_value<B: BufMut>(value: &Value, dst: &mut B) -> ProtocolResult<()> {
    let len = value.data_len();
    let wire_len = u16::try_from(len).map_err(|_| ProtocolError::ValueTooLong {
        length: len,
        max: MAX_TEXT_LEN,
    })?;

    dst.put_u8(value.value_type().tag());
    dst.put_u16(wire_len);
    match value {
        Value::Integer(v) => dst.put_i32(*v),
        Value::Text(v) => dst.put_slice(v.as_bytes()),
        Value::Counter(v) | Value::Ticks(v) => dst.put_u32(*v),
    }
    Ok(())
}

/// Decode the data bytes of a value whose type tag is `tag`.
///
/// `data` is exactly the bytes covered by the value's length field.
///
/// # Errors
///
/// - [`ProtocolError::UnknownValueType`] for an unrecognized tag
/// - [`ProtocolError::TruncatedValue`] if a numeric value has fewer than 4
///   bytes
/// - [`ProtocolError::BadValueLength`] if a numeric value has more than 4
///   bytes
/// - [`ProtocolError::InvalidText`] if text is not valid UTF-8
pub fn decode_value(tag: u8, data: &[u8]) -> ProtocolResult<Value> {
    let value_type = ValueType::try_from(tag)?;
    match value_type {
        ValueType::Text => {
            let text = std::str::from_utf8(data).map_err(|_| ProtocolError::InvalidText)?;
            Ok(Value::Text(text.to_string()))
        },
        ValueType::Integer => Ok(Value::Integer(i32::from_be_bytes(fixed_width(
            value_type, data,
        )?))),
        ValueType::Counter => Ok(Value::Counter(u32::from_be_bytes(fixed_width(
            value_type, data,
        )?))),
        ValueType::Ticks => Ok(Value::Ticks(u32::from_be_bytes(fixed_width(
            value_type, data,
        )?))),
    }
}

fn fixed_width(value_type: ValueType, data: &[u8]) -> ProtocolResult<[u8; NUMERIC_VALUE_LEN]> {
    match <[u8; NUMERIC_VALUE_LEN]>::try_from(data) {
        Ok(raw) => Ok(raw),
        Err(_) if data.len() < NUMERIC_VALUE_LEN => Err(ProtocolError::TruncatedValue {
            declared: NUMERIC_VALUE_LEN,
            available: data.len(),
        }),
        Err(_) => Err(ProtocolError::BadValueLength {
            type_name: value_type.name(),
            length: data.len(),
            expected: NUMERIC_VALUE_LEN,
        }),
    }
}
