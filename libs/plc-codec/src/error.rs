//! Codec Error Types

use crate::format::RegisterFormat;
use crate::value::Number;
use thiserror::Error;

/// Result type for plc-codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Register codec errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Unrecognized register format name
    #[error("Unsupported register format: {0}")]
    UnsupportedFormat(String),

    /// Unrecognized byte order name
    #[error("Unsupported byte order: {0}")]
    UnsupportedByteOrder(String),

    /// Value does not fit the target numeric width
    #[error("Value {value} out of range for {format}")]
    ValueOutOfRange { value: Number, format: RegisterFormat },

    /// Text that is not a number of the requested format
    #[error("Invalid {format} value: {text:?}")]
    InvalidValue { text: String, format: RegisterFormat },

    /// Register slice length is not a multiple of the format's word count
    #[error("Invalid register count {count} for {format}: expected a multiple of {word_count}")]
    InvalidRegisterCount {
        count: usize,
        format: RegisterFormat,
        word_count: usize,
    },
}
