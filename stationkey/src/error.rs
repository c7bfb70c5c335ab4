use std::ops::RangeInclusive;

use strum::Display;
use thiserror::Error;

use crate::radio::RadioType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures raised by the identifier and MAC codecs.
///
/// All of them concern a single identifier. Callers exploding a report drop
/// only the offending sighting; callers reading stored keys should treat
/// [`Error::MalformedKey`] as corruption of that record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid cell identifier: {0}")]
    InvalidIdentifier(IdentifierFault),
    #[error("malformed key: {0}")]
    MalformedKey(KeyFault),
    #[error("invalid mac address: {0}")]
    InvalidMac(MacFault),
}

/// Identifier component named in a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Mcc,
    Mnc,
    AreaCode,
    CellId,
    Unit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierFault {
    #[error("{0} radios have no cell identifier")]
    NotCellular(RadioType),
    #[error("{radio} {field} missing")]
    Missing { radio: RadioType, field: Field },
    #[error("{radio} {field} {value} outside {}..={}", .range.start(), .range.end())]
    OutOfRange {
        radio: RadioType,
        field: Field,
        value: u64,
        range: RangeInclusive<u64>,
    },
    #[error("{radio} cells carry no {field}")]
    Unexpected { radio: RadioType, field: Field },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyFault {
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("unknown key format version {0}")]
    Version(u8),
    #[error("unknown radio tag {0}")]
    RadioTag(u8),
    #[error("{0}")]
    Field(IdentifierFault),
    #[error("bad base64 text: {0}")]
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacFault {
    #[error("expected 6 octets, got {0} hex digits")]
    Length(usize),
    #[error("non-hex character in {0:?}")]
    NotHex(String),
    #[error("all-zero address")]
    Zero,
    #[error("broadcast address")]
    Broadcast,
    #[error("multicast address not allowed for {0}")]
    Multicast(RadioType),
    #[error("{0} radios have no station address")]
    NotStation(RadioType),
}

impl From<IdentifierFault> for Error {
    fn from(value: IdentifierFault) -> Self {
        Error::InvalidIdentifier(value)
    }
}

impl From<KeyFault> for Error {
    fn from(value: KeyFault) -> Self {
        Error::MalformedKey(value)
    }
}

impl From<MacFault> for Error {
    fn from(value: MacFault) -> Self {
        Error::InvalidMac(value)
    }
}
