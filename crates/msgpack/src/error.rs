//! MessagePack codec error type.

use std::fmt;

use thiserror::Error;

/// Length-prefixed item categories, each with its own decode ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthKind {
    Str,
    Bin,
    Array,
    Map,
    Ext,
}

impl fmt::Display for LengthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LengthKind::Str => "str",
            LengthKind::Bin => "bin",
            LengthKind::Array => "array",
            LengthKind::Map => "map",
            LengthKind::Ext => "ext",
        })
    }
}

/// Coarse classification of [`MsgPackError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A decoded length prefix exceeded its configured maximum.
    Range,
    /// Truncated or malformed input.
    Decode,
    /// Encode nesting went past the configured maximum depth.
    Depth,
    /// A value has no wire representation.
    Unsupported,
    /// Extension registration was rejected.
    Registry,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MsgPackError {
    #[error("max {kind} length exceeded: {length} > {max}")]
    LengthExceeded {
        kind: LengthKind,
        length: usize,
        max: usize,
    },
    #[error("insufficient data at offset {offset}")]
    UnexpectedEof { offset: usize },
    #[error("unrecognized format byte 0x{byte:02x} at offset {offset}")]
    InvalidFormat { byte: u8, offset: usize },
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("map key must be a string or an integer, found format byte 0x{byte:02x} at offset {offset}")]
    InvalidMapKey { byte: u8, offset: usize },
    #[error("map keys mismatch at offset {offset}: expected {expected} values, found {actual}")]
    MapKeysMismatch {
        expected: usize,
        actual: usize,
        offset: usize,
    },
    #[error("max depth exceeded: {depth} > {max}")]
    DepthExceeded { depth: usize, max: usize },
    #[error("unrecognized object: {kind}")]
    Unsupported { kind: String },
    #[error("{kind} of {length} elements or bytes is too long to encode")]
    TooLong { kind: LengthKind, length: usize },
    #[error("extension type {0} is outside the application range 0..=127")]
    ReservedExtensionType(i8),
    #[error("extension type {0} is already registered")]
    DuplicateExtensionType(i8),
    #[error("invalid payload for extension type {type_code}: {message}")]
    InvalidExtension { type_code: i8, message: String },
}

impl MsgPackError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MsgPackError::LengthExceeded { .. } => ErrorCategory::Range,
            MsgPackError::UnexpectedEof { .. }
            | MsgPackError::InvalidFormat { .. }
            | MsgPackError::InvalidUtf8 { .. }
            | MsgPackError::InvalidMapKey { .. }
            | MsgPackError::MapKeysMismatch { .. }
            | MsgPackError::InvalidExtension { .. } => ErrorCategory::Decode,
            MsgPackError::DepthExceeded { .. } => ErrorCategory::Depth,
            MsgPackError::Unsupported { .. } | MsgPackError::TooLong { .. } => {
                ErrorCategory::Unsupported
            }
            MsgPackError::ReservedExtensionType(_) | MsgPackError::DuplicateExtensionType(_) => {
                ErrorCategory::Registry
            }
        }
    }

    /// Shorthand for extension codecs rejecting a payload.
    pub fn invalid_extension(type_code: i8, message: impl Into<String>) -> Self {
        MsgPackError::InvalidExtension {
            type_code,
            message: message.into(),
        }
    }
}
