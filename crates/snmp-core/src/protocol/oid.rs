//! Object identifiers.
//!
//! An [`Oid`] is a path in the global management tree, written in dotted
//! notation (`1.3.6.1.2.1.1.5.0`). On the wire every arc occupies exactly one
//! byte, so arcs are limited to `0..=255` and the encoded form is simply the
//! arc sequence.
//!
//! # Ordering
//!
//! Identifiers compare arc by arc from the left; a prefix sorts before any of
//! its extensions (`1.2 < 1.2.0 < 1.2.3 < 1.3`). This is the order the object
//! store walks for bulk retrieval.

use std::fmt;
use std::str::FromStr;

use super::error::{ProtocolError, ProtocolResult};

/// Maximum number of arcs (the on-wire length field is one byte).
pub const MAX_OID_ARCS: usize = u8::MAX as usize;

/// A hierarchical object identifier with single-byte arcs.
///
/// # Invariants
///
/// - Never empty.
/// - At most [`MAX_OID_ARCS`] arcs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(Vec<u8>);

impl Oid {
    /// Build an identifier from its encoded arc bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedIdentifier`] for an empty slice and
    /// [`ProtocolError::IdentifierTooLong`] for more than [`MAX_OID_ARCS`]
    /// arcs.
    pub fn from_bytes(bytes: &[u8]) -> ProtocolResult<Self> {
        if bytes.is_empty() {
            return Err(ProtocolError::malformed_identifier("", "empty identifier"));
        }
        if bytes.len() > MAX_OID_ARCS {
            return Err(ProtocolError::IdentifierTooLong {
                arcs: bytes.len(),
                max: MAX_OID_ARCS,
            });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// The encoded form: one byte per arc.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The arcs of this identifier.
    #[must_use]
    pub fn arcs(&self) -> &[u8] {
        &self.0
    }

    /// Number of arcs.
    #[must_use]
    #[allow(clippy::len_without_is_empty)] // never empty by construction
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if `prefix` is a leading subsequence of this identifier.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Encoded length as it appears in the 1-byte `oid_len` field.
    #[must_use]
    pub fn wire_len(&self) -> u8 {
        // Bounded by MAX_OID_ARCS at construction.
        u8::try_from(self.0.len()).unwrap_or(u8::MAX)
    }
}

impl FromStr for Oid {
    type Err = ProtocolError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Err(ProtocolError::malformed_identifier(text, "empty identifier"));
        }

        let arcs = text
            .split('.')
            .enumerate()
            .map(|(index, part)| parse_arc(text, index, part))
            .collect::<ProtocolResult<Vec<u8>>>()?;

        if arcs.len() > MAX_OID_ARCS {
            return Err(ProtocolError::IdentifierTooLong {
                arcs: arcs.len(),
                max: MAX_OID_ARCS,
            });
        }
        Ok(Self(arcs))
    }
}

fn parse_arc(text: &str, index: usize, part: &str) -> ProtocolResult<u8> {
    if part.is_empty() {
        return Err(ProtocolError::malformed_identifier(
            text,
            format!("arc {index} is empty"),
        ));
    }
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::malformed_identifier(
            text,
            format!("arc {index} ('{part}') is not a non-negative integer"),
        ));
    }
    part.parse::<u8>().map_err(|_| {
        ProtocolError::malformed_identifier(
            text,
            format!("arc {index} ('{part}') is outside 0..=255"),
        )
    })
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut arcs = self.0.iter();
        if let Some(first) = arcs.next() {
            write!(f, "{first}")?;
        }
        for arc in arcs {
            write!(f, ".{arc}")?;
        }
        Ok(())
    }
}

impl TryFrom<&str> for Oid {
    type Error = ProtocolError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        text.parse()
    }
}
