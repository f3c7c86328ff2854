//! Error types

use crate::binary::read::ReadEof;
use crate::tag::DisplayTag;
use std::collections::TryReserveError;
use std::fmt;
use std::io;

/// Errors that originate when parsing binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
    BadEof,
    BadValue,
    BadVersion,
    BadOffset,
    BadIndex,
    LimitExceeded,
    MissingValue,
    MissingTable(u32),
    NotImplemented,
}

impl From<ReadEof> for ParseError {
    fn from(_error: ReadEof) -> Self {
        ParseError::BadEof
    }
}

impl From<std::num::TryFromIntError> for ParseError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ParseError::BadValue
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadEof => write!(f, "end of data reached unexpectedly"),
            ParseError::BadValue => write!(f, "invalid value"),
            ParseError::BadVersion => write!(f, "unexpected data version"),
            ParseError::BadOffset => write!(f, "invalid data offset"),
            ParseError::BadIndex => write!(f, "invalid data index"),
            ParseError::LimitExceeded => write!(f, "limit exceeded"),
            ParseError::MissingValue => write!(f, "an expected data value was missing"),
            ParseError::MissingTable(tag) => {
                write!(f, "font is missing '{}' table", DisplayTag(*tag))
            }
            ParseError::NotImplemented => write!(f, "feature not implemented"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors returned from the driver operations
#[derive(Debug)]
pub enum SfntError {
    /// The data is structurally corrupt or of an unrecognised format.
    InvalidFormat(ParseError),
    /// The table with this tag, or a record within it, is not present.
    TableMissing(u32),
    /// A selector, offset, length or index supplied by the caller is out of range.
    InvalidArgument,
    /// The stream failed.
    Io(io::Error),
    AllocationFailure,
}

impl From<ParseError> for SfntError {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::MissingTable(tag) => SfntError::TableMissing(tag),
            error => SfntError::InvalidFormat(error),
        }
    }
}

impl From<ReadEof> for SfntError {
    fn from(_error: ReadEof) -> Self {
        SfntError::InvalidFormat(ParseError::BadEof)
    }
}

impl From<io::Error> for SfntError {
    fn from(error: io::Error) -> Self {
        SfntError::Io(error)
    }
}

impl From<TryReserveError> for SfntError {
    fn from(_error: TryReserveError) -> Self {
        SfntError::AllocationFailure
    }
}

impl From<std::num::TryFromIntError> for SfntError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        SfntError::InvalidFormat(ParseError::BadValue)
    }
}

impl fmt::Display for SfntError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SfntError::InvalidFormat(err) => write!(f, "invalid font format: {}", err),
            SfntError::TableMissing(tag) => write!(f, "'{}' table missing", DisplayTag(*tag)),
            SfntError::InvalidArgument => write!(f, "invalid argument"),
            SfntError::Io(err) => write!(f, "stream error: {}", err),
            SfntError::AllocationFailure => write!(f, "memory allocation failed"),
        }
    }
}

impl std::error::Error for SfntError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SfntError::InvalidFormat(err) => Some(err),
            SfntError::Io(err) => Some(err),
            _ => None,
        }
    }
}
