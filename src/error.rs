use std::fmt;

use crate::expr::Path;

/// The error type produced by every fallible operation in this crate.
///
/// Mirrors the error kinds named in the format-description specification:
/// one variant per failure mode a `Construct` can report, plus a
/// `Validation` aggregate the XML bridge and preprocess engine use to
/// collect more than one path-tagged failure before giving up.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The stream ran out of bytes, a seek went past the end, or bit mode
    /// was left while not byte-aligned.
    Stream(StreamError),

    /// A value was out of the representable range for its declared
    /// width/endianness, or the width/endianness combination itself is
    /// invalid.
    Format(String),

    /// A `Const` field's parsed value did not equal its expected value.
    Const {
        /// The path to the offending field, if known.
        path: Option<Path>,
    },

    /// A count or size expression evaluated to a negative number or a
    /// value exceeding the bounds the combinator can represent.
    Range(String),

    /// A `Switch` had no case matching its key and no default branch.
    Switch(String),

    /// Raised explicitly by a user-supplied lambda or a `Check` construct.
    Explicit(String),

    /// `static_sizeof` could not determine a size without a value or
    /// stream to inspect. Non-fatal when the caller is only probing;
    /// fatal when a consumer demanded a static answer unconditionally.
    UnknownSize,

    /// An expression referenced a path that does not exist in the current
    /// context.
    Context(String),

    /// A missing/unknown XML tag or attribute, or an attribute literal
    /// that failed to parse into the expected type.
    Xml(String),

    /// More than one error accumulated during a single traversal (used by
    /// `preprocess` and by validation-style passes that keep going after
    /// the first failure).
    Many(Vec<Error>),
}

/// Failure modes specific to the byte/bit stream cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// Fewer bytes/bits remained than were requested.
    Underflow { requested: usize, available: usize },

    /// A write would extend past a bounded buffer that does not grow.
    Overflow,

    /// `Bytewise` was entered (or bit mode left) while the bit cursor was
    /// not on a byte boundary.
    Unaligned { bit_offset: usize },

    /// A seek target lay outside `[0, size]`.
    SeekOutOfBounds { offset: i64, size: usize },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StreamError::Underflow { requested, available } => write!(
                f,
                "stream underflow: requested {requested} bytes, {available} available"
            ),
            StreamError::Overflow => write!(f, "stream overflow: write exceeds buffer bounds"),
            StreamError::Unaligned { bit_offset } => write!(
                f,
                "cannot leave bit mode: {bit_offset} bits into the current byte, not aligned"
            ),
            StreamError::SeekOutOfBounds { offset, size } => {
                write!(f, "seek to {offset} out of bounds for stream of size {size}")
            }
        }
    }
}

impl std::error::Error for StreamError {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Stream(e) => write!(f, "{e}"),
            Error::Format(msg) => write!(f, "format error: {msg}"),
            Error::Const { path: Some(p) } => write!(f, "const mismatch at {p}"),
            Error::Const { path: None } => write!(f, "const mismatch"),
            Error::Range(msg) => write!(f, "range error: {msg}"),
            Error::Switch(msg) => write!(f, "switch error: {msg}"),
            Error::Explicit(msg) => write!(f, "{msg}"),
            Error::UnknownSize => write!(f, "size is not statically known"),
            Error::Context(msg) => write!(f, "context error: {msg}"),
            Error::Xml(msg) => write!(f, "xml error: {msg}"),
            Error::Many(errors) => {
                write!(f, "{} errors occurred:", errors.len())?;
                for e in errors {
                    write!(f, "\n  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        Error::Stream(e)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
