//! Message codec.
//!
//! Every message starts with the same header:
//!
//! ```text
//! +----------------+--------------------+-------------+----------------------+
//! | total_size (4) | request_id (4)     | op_tag (1)  | status (1, response) |
//! +----------------+--------------------+-------------+----------------------+
//! ```
//!
//! `total_size` counts every byte of the message including itself. It is
//! written last during encoding (once the payload size is known) and checked
//! first during decoding.
//!
//! Payload grammars per operation:
//!
//! ```text
//! GetRequest:      oid_count(1) [oid_len(1) oid]*
//! SetRequest:      oid_count(1) [oid_len(1) oid type(1) val_len(2) val]*
//! GetBulkRequest:  oid_len(1) oid max_repetitions(2)
//! Response:        binding_count(1) [oid_len(1) oid type(1) val_len(2) val]*
//! ```
//!
//! All functions here are pure: no I/O and no state between calls.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::error::{
    LENGTH_PREFIX_SIZE, MAX_BINDINGS, MIN_MESSAGE_SIZE, ProtocolError, ProtocolResult,
};
use super::oid::Oid;
use super::value::{Value, ValueType, decode_value, encode_value};

/// Operation tag carried in byte 8 of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    /// Point query for one or more identifiers.
    GetRequest = 0xA0,
    /// Reply to any request.
    GetResponse = 0xA1,
    /// Write of one or more bindings.
    SetRequest = 0xA3,
    /// Lexicographic walk from a starting identifier.
    GetBulkRequest = 0xA5,
}

impl PduType {
    /// The wire tag.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PduType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0xA0 => Ok(Self::GetRequest),
            0xA1 => Ok(Self::GetResponse),
            0xA3 => Ok(Self::SetRequest),
            0xA5 => Ok(Self::GetBulkRequest),
            other => Err(ProtocolError::UnknownOperation(other)),
        }
    }
}

/// Response-level status code.
///
/// A response carries exactly one status. On any status other than
/// [`ErrorStatus::Success`] the agent sends zero bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorStatus {
    /// The request was served.
    Success = 0,
    /// An identifier does not name an object.
    NoSuchObject = 1,
    /// A value does not match the object's declared type.
    BadValue = 2,
    /// A write targeted a read-only object.
    ReadOnly = 3,
}

impl ErrorStatus {
    /// The wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns `true` for [`ErrorStatus::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl TryFrom<u8> for ErrorStatus {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Success),
            1 => Ok(Self::NoSuchObject),
            2 => Ok(Self::BadValue),
            3 => Ok(Self::ReadOnly),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::NoSuchObject => "noSuchObject",
            Self::BadValue => "badValue",
            Self::ReadOnly => "readOnly",
        };
        f.write_str(name)
    }
}

/// An identifier paired with a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarBind {
    /// Object identifier.
    pub oid: Oid,
    /// Value of the object.
    pub value: Value,
}

impl VarBind {
    /// Create a new binding.
    #[must_use]
    pub const fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }
}

/// Operation-specific part of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pdu {
    /// Point query.
    GetRequest {
        /// Identifiers to read, in order.
        oids: Vec<Oid>,
    },
    /// Write request.
    SetRequest {
        /// Bindings to apply, in order.
        bindings: Vec<VarBind>,
    },
    /// Bulk walk.
    GetBulkRequest {
        /// Walk starts strictly after this identifier.
        oid: Oid,
        /// Maximum number of bindings wanted.
        max_repetitions: u16,
    },
    /// Reply to any request.
    Response {
        /// Response-level status.
        status: ErrorStatus,
        /// Bindings reported (empty unless `status` is success).
        bindings: Vec<VarBind>,
    },
}

impl Pdu {
    /// The operation tag for this PDU.
    #[must_use]
    pub const fn pdu_type(&self) -> PduType {
        match self {
            Self::GetRequest { .. } => PduType::GetRequest,
            Self::SetRequest { .. } => PduType::SetRequest,
            Self::GetBulkRequest { .. } => PduType::GetBulkRequest,
            Self::Response { .. } => PduType::GetResponse,
        }
    }
}

/// A complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Correlation id, assigned by the manager and echoed by the agent.
    pub request_id: u32,
    /// Operation payload.
    pub pdu: Pdu,
}

impl Message {
    /// Create a new message.
    #[must_use]
    pub const fn new(request_id: u32, pdu: Pdu) -> Self {
        Self { request_id, pdu }
    }

    /// Returns `true` for the three request operations.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        !matches!(self.pdu, Pdu::Response { .. })
    }

    /// Encode this message to its wire form.
    ///
    /// # Errors
    ///
    /// See the individual `encode_*` functions.
    pub fn encode(&self) -> ProtocolResult<Bytes> {
        match &self.pdu {
            Pdu::GetRequest { oids } => encode_get_request(self.request_id, oids),
            Pdu::SetRequest { bindings } => encode_set_request(self.request_id, bindings),
            Pdu::GetBulkRequest {
                oid,
                max_repetitions,
            } => encode_get_bulk_request(self.request_id, oid, *max_repetitions),
            Pdu::Response { status, bindings } => {
                encode_response(self.request_id, *status, bindings)
            },
        }
    }

    /// Decode a complete message. Equivalent to [`decode`].
    ///
    /// # Errors
    ///
    /// See [`decode`].
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        decode(bytes)
    }
}

/// Encode a `GetRequest`.
///
/// # Errors
///
/// Returns [`ProtocolError::TooManyIdentifiers`] for more than 255
/// identifiers.
pub fn encode_get_request(request_id: u32, oids: &[Oid]) -> ProtocolResult<Bytes> {
    let count = binding_count(oids.len())?;
    let mut buf = start_message(request_id, PduType::GetRequest, None);
    buf.put_u8(count);
    for oid in oids {
        put_oid(&mut buf, oid);
    }
    finish_message(buf)
}

/// Encode a `SetRequest`.
///
/// # Errors
///
/// Returns [`ProtocolError::TooManyIdentifiers`] for more than 255 bindings
/// and [`ProtocolError::ValueTooLong`] for an oversized text value.
pub fn encode_set_request(request_id: u32, bindings: &[VarBind]) -> ProtocolResult<Bytes> {
    let count = binding_count(bindings.len())?;
    let mut buf = start_message(request_id, PduType::SetRequest, None);
    buf.put_u8(count);
    put_bindings(&mut buf, bindings)?;
    finish_message(buf)
}

/// Encode a `GetBulkRequest`.
///
/// # Errors
///
/// Infallible for valid identifiers; the `Result` keeps the signature
/// uniform with the other encoders.
pub fn encode_get_bulk_request(
    request_id: u32,
    start: &Oid,
    max_repetitions: u16,
) -> ProtocolResult<Bytes> {
    let mut buf = start_message(request_id, PduType::GetBulkRequest, None);
    put_oid(&mut buf, start);
    buf.put_u16(max_repetitions);
    finish_message(buf)
}

/// Encode a `Response`.
///
/// # Errors
///
/// Returns [`ProtocolError::TooManyIdentifiers`] for more than 255 bindings
/// and [`ProtocolError::ValueTooLong`] for an oversized text value.
pub fn encode_response(
    request_id: u32,
    status: ErrorStatus,
    bindings: &[VarBind],
) -> ProtocolResult<Bytes> {
    let count = binding_count(bindings.len())?;
    let mut buf = start_message(request_id, PduType::GetResponse, Some(status));
    buf.put_u8(count);
    put_bindings(&mut buf, bindings)?;
    finish_message(buf)
}

/// Wire size of a response with the given bindings, without encoding it.
#[must_use]
pub fn response_size(bindings: &[VarBind]) -> usize {
    MIN_MESSAGE_SIZE + 1 + 1 + bindings.iter().map(binding_size).sum::<usize>()
}

/// Wire size of a single binding inside a `SetRequest` or `Response`.
#[must_use]
pub fn binding_size(binding: &VarBind) -> usize {
    1 + binding.oid.len() + binding.value.encoded_len()
}

/// Decode a complete message.
///
/// `bytes` must hold exactly one message, as returned by the frame reader.
///
/// # Errors
///
/// - [`ProtocolError::FrameTooShort`] if shorter than the 9-byte header
/// - [`ProtocolError::FrameLengthMismatch`] if `total_size` differs from
///   `bytes.len()`
/// - [`ProtocolError::UnknownOperation`] for an unrecognized operation tag
/// - [`ProtocolError::UnknownStatus`] for an unrecognized response status
/// - [`ProtocolError::TruncatedMessage`] / [`ProtocolError::TruncatedValue`]
///   if the payload ends early
/// - [`ProtocolError::TrailingBytes`] if bytes remain after the payload
/// - identifier and value errors from the field decoders
pub fn decode(bytes: &[u8]) -> ProtocolResult<Message> {
    if bytes.len() < MIN_MESSAGE_SIZE {
        return Err(ProtocolError::FrameTooShort {
            size: bytes.len(),
            min: MIN_MESSAGE_SIZE,
        });
    }

    let mut reader = Reader::new(bytes);
    let declared = reader.read_u32("total_size")? as usize;
    if declared != bytes.len() {
        return Err(ProtocolError::FrameLengthMismatch {
            declared,
            actual: bytes.len(),
        });
    }
    let request_id = reader.read_u32("request_id")?;
    let pdu_type = PduType::try_from(reader.read_u8("op_tag")?)?;

    let pdu = match pdu_type {
        PduType::GetRequest => {
            let count = reader.read_u8("oid_count")?;
            let oids = (0..count)
                .map(|_| reader.read_oid())
                .collect::<ProtocolResult<Vec<_>>>()?;
            Pdu::GetRequest { oids }
        },
        PduType::SetRequest => {
            let count = reader.read_u8("oid_count")?;
            let bindings = (0..count)
                .map(|_| reader.read_binding())
                .collect::<ProtocolResult<Vec<_>>>()?;
            Pdu::SetRequest { bindings }
        },
        PduType::GetBulkRequest => {
            let oid = reader.read_oid()?;
            let max_repetitions = reader.read_u16("max_repetitions")?;
            Pdu::GetBulkRequest {
                oid,
                max_repetitions,
            }
        },
        PduType::GetResponse => {
            let status = ErrorStatus::try_from(reader.read_u8("status")?)?;
            let count = reader.read_u8("binding_count")?;
            let bindings = (0..count)
                .map(|_| reader.read_binding())
                .collect::<ProtocolResult<Vec<_>>>()?;
            Pdu::Response { status, bindings }
        },
    };

    if reader.remaining() > 0 {
        return Err(ProtocolError::TrailingBytes {
            count: reader.remaining(),
        });
    }

    Ok(Message { request_id, pdu })
}

fn binding_count(count: usize) -> ProtocolResult<u8> {
    if count > MAX_BINDINGS {
        return Err(ProtocolError::TooManyIdentifiers {
            count,
            max: MAX_BINDINGS,
        });
    }
    u8::try_from(count).map_err(|_| ProtocolError::TooManyIdentifiers {
        count,
        max: MAX_BINDINGS,
    })
}

fn start_message(request_id: u32, pdu_type: PduType, status: Option<ErrorStatus>) -> BytesMut {
    let mut buf = BytesMut::with_capacity(64);
    // Placeholder, patched by finish_message once the size is known.
    buf.put_u32(0);
    buf.put_u32(request_id);
    buf.put_u8(pdu_type.tag());
    if let Some(status) = status {
        buf.put_u8(status.code());
    }
    buf
}

fn finish_message(mut buf: BytesMut) -> ProtocolResult<Bytes> {
    let total = u32::try_from(buf.len()).map_err(|_| ProtocolError::FrameTooLarge {
        size: buf.len(),
        max: u32::MAX as usize,
    })?;
    buf[..LENGTH_PREFIX_SIZE].copy_from_slice(&total.to_be_bytes());
    Ok(buf.freeze())
}

fn put_oid(buf: &mut BytesMut, oid: &Oid) {
    buf.put_u8(oid.wire_len());
    buf.put_slice(oid.as_bytes());
}

fn put_bindings(buf: &mut BytesMut, bindings: &[VarBind]) -> ProtocolResult<()> {
    for binding in bindings {
        put_oid(buf, &binding.oid);
        encode_value(&binding.value, buf)?;
    }
    Ok(())
}

/// Bounds-checked cursor over a message buffer.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_slice(&mut self, len: usize, field: &'static str) -> ProtocolResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ProtocolError::TruncatedMessage {
                field,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self, field: &'static str) -> ProtocolResult<u8> {
        Ok(self.read_slice(1, field)?[0])
    }

    fn read_u16(&mut self, field: &'static str) -> ProtocolResult<u16> {
        let bytes = self.read_slice(2, field)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self, field: &'static str) -> ProtocolResult<u32> {
        let bytes = self.read_slice(4, field)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_oid(&mut self) -> ProtocolResult<Oid> {
        let len = self.read_u8("oid_len")?;
        let bytes = self.read_slice(usize::from(len), "oid")?;
        Oid::from_bytes(bytes)
    }

    fn read_binding(&mut self) -> ProtocolResult<VarBind> {
        let oid = self.read_oid()?;
        let value_type = ValueType::try_from(self.read_u8("value_type")?)?;
        let declared = usize::from(self.read_u16("value_length")?);
        if self.remaining() < declared {
            return Err(ProtocolError::TruncatedValue {
                declared,
                available: self.remaining(),
            });
        }
        let data = self.read_slice(declared, "value")?;
        let value = decode_value(value_type.tag(), data)?;
        Ok(VarBind { oid, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(text: &str) -> Oid {
        text.parse().unwrap()
    }

    #[test]
    fn test_get_request_layout() {
        let bytes = encode_get_request(1234, &[oid("1.3.6.1.2.1.1.5.0")]).unwrap();
        let parts: [&[u8]; 5] = [
            &[0, 0, 0, 20],      // total_size
            &[0, 0, 0x04, 0xD2], // request_id
            &[0xA0],             // op_tag
            &[1],                // oid_count
            &[9, 1, 3, 6, 1, 2, 1, 1, 5, 0],
        ];
        let expected = parts.concat();
        assert_eq!(&bytes[..], &expected[..]);
    }

    #[test]
    fn test_set_request_layout() {
        let bindings = [VarBind::new(
            oid("1.3.6.1.2.1.1.5.0"),
            Value::Text("core".into()),
        )];
        let bytes = encode_set_request(7, &bindings).unwrap();
        // header 9 + count 1 + oid 10 + type 1 + len 2 + data 4
        assert_eq!(bytes.len(), 27);
        assert_eq!(&bytes[..4], &[0, 0, 0, 27]);
        assert_eq!(bytes[8], 0xA3);
        assert_eq!(&bytes[20..23], &[0x04, 0x00, 0x04]);
        assert_eq!(&bytes[23..], b"core");
    }

    #[test]
    fn test_bulk_request_layout() {
        let bytes = encode_get_bulk_request(9, &oid("1.3.6.1.2.1.2.2.1.10"), 50).unwrap();
        assert_eq!(bytes.len(), 9 + 1 + 10 + 2);
        assert_eq!(bytes[8], 0xA5);
        assert_eq!(&bytes[bytes.len() - 2..], &[0, 50]);
    }

    #[test]
    fn test_response_carries_status() {
        let bytes = encode_response(55, ErrorStatus::ReadOnly, &[]).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0, 11, 0, 0, 0, 55, 0xA1, 3, 0]);
        assert_eq!(response_size(&[]), bytes.len());
    }

    #[test]
    fn test_response_size_matches_encoding() {
        let bindings = vec![
            VarBind::new(oid("1.3.6.1.2.1.1.1.0"), Value::Text("Router".into())),
            VarBind::new(oid("1.3.6.1.2.1.1.7.0"), Value::Integer(72)),
        ];
        let bytes = encode_response(1, ErrorStatus::Success, &bindings).unwrap();
        assert_eq!(response_size(&bindings), bytes.len());
    }

    #[test]
    fn test_decode_each_operation() {
        let messages = [
            Message::new(
                1,
                Pdu::GetRequest {
                    oids: vec![oid("1.3.6.1.2.1.1.1.0"), oid("1.3.6.1.2.1.1.5.0")],
                },
            ),
            Message::new(
                2,
                Pdu::SetRequest {
                    bindings: vec![VarBind::new(oid("1.3.6.1.2.1.1.7.0"), Value::Integer(-5))],
                },
            ),
            Message::new(
                3,
                Pdu::GetBulkRequest {
                    oid: oid("1.3"),
                    max_repetitions: u16::MAX,
                },
            ),
            Message::new(
                u32::MAX,
                Pdu::Response {
                    status: ErrorStatus::Success,
                    bindings: vec![
                        VarBind::new(oid("1.3.6.1.2.1.1.3.0"), Value::Ticks(360_000)),
                        VarBind::new(oid("1.3.6.1.2.1.2.2.1.10.1"), Value::Counter(7)),
                    ],
                },
            ),
        ];
        for message in messages {
            let bytes = message.encode().unwrap();
            assert_eq!(Message::decode(&bytes).unwrap(), message);
        }
    }

    #[test]
    fn test_empty_get_request() {
        let bytes = encode_get_request(4, &[]).unwrap();
        assert_eq!(bytes.len(), 10);
        assert_eq!(
            decode(&bytes).unwrap().pdu,
            Pdu::GetRequest { oids: Vec::new() }
        );
    }

    #[test]
    fn test_too_many_identifiers() {
        let oids = vec![oid("1.3"); 256];
        let err = encode_get_request(1, &oids).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TooManyIdentifiers { count: 256, .. }
        ));
        assert!(encode_get_request(1, &oids[..255]).is_ok());
    }

    #[test]
    fn test_decode_length_mismatch() {
        let mut bytes = encode_get_request(1, &[oid("1.3.6")]).unwrap().to_vec();
        bytes.push(0);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FrameLengthMismatch {
                declared: 14,
                actual: 15
            }
        ));
    }

    #[test]
    fn test_decode_too_short() {
        let err = decode(&[0, 0, 0, 5, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooShort { size: 5, .. }));
    }

    #[test]
    fn test_decode_unknown_operation() {
        let err = decode(&[0, 0, 0, 10, 0, 0, 0, 1, 0xA2, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownOperation(0xA2)));
    }

    #[test]
    fn test_decode_unknown_status() {
        let err = decode(&[0, 0, 0, 11, 0, 0, 0, 1, 0xA1, 9, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownStatus(9)));
    }

    #[test]
    fn test_decode_unknown_value_type() {
        let bindings = [VarBind::new(oid("1.3"), Value::Integer(1))];
        let mut bytes = encode_set_request(1, &bindings).unwrap().to_vec();
        // type byte follows count(1) + oid_len(1) + oid(2)
        bytes[9 + 4] = 0x05;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownValueType(0x05)));
    }

    #[test]
    fn test_decode_truncated_value() {
        // Declares a 10-byte string but only 3 bytes follow.
        let mut bytes = vec![0, 0, 0, 0, 0, 0, 0, 1, 0xA3, 1, 2, 1, 3, 0x04, 0, 10];
        bytes.extend_from_slice(b"abc");
        let total = u32::try_from(bytes.len()).unwrap();
        bytes[..4].copy_from_slice(&total.to_be_bytes());
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TruncatedValue {
                declared: 10,
                available: 3
            }
        ));
    }

    #[test]
    fn test_decode_truncated_payload() {
        // Claims two OIDs but carries one.
        let mut bytes = encode_get_request(1, &[oid("1.3")]).unwrap().to_vec();
        bytes[9] = 2;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TruncatedMessage {
                field: "oid_len",
                ..
            }
        ));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut bytes = encode_get_request(1, &[]).unwrap().to_vec();
        bytes.extend_from_slice(&[0xFF, 0xFF]);
        let total = u32::try_from(bytes.len()).unwrap();
        bytes[..4].copy_from_slice(&total.to_be_bytes());
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::TrailingBytes { count: 2 }));
    }

    #[test]
    fn test_decode_zero_length_oid() {
        let bytes = [0, 0, 0, 11, 0, 0, 0, 1, 0xA0, 1, 0];
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedIdentifier { .. }));
    }
}
