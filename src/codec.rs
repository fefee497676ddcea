//! External-collaborator contracts named in the specification's external
//! interfaces: a byte-for-byte codec bijection for `Tunnel`/`Compressed`,
//! a custom numeric formatter, and a custom string encoder. This crate
//! only defines the contracts and one trivial reference implementation
//! of each, for tests — a real codec (zlib, a locale-specific number
//! format, UTF-16) is a collaborator's responsibility, not this crate's.

use crate::error::Result;
use crate::value::Value;

/// A byte-for-byte transform and its inverse, used by `Tunnel`/
/// `Compressed` to decode a region before parsing it and re-encode it
/// before writing it back.
pub trait Codec {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>>;
    fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// The no-op codec: decode/encode both return the input unchanged. Used
/// by tests and as the default when a format doesn't actually compress
/// its tunneled region.
pub struct Identity;

impl Codec for Identity {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
    fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// A custom textual rendering for a numeric `Value`, for combinators
/// that need more control over their XML representation than the
/// default `Display`-based one (e.g. fixed-point, hexadecimal).
pub trait NumericFormatter {
    fn format(&self, value: &Value) -> String;
    fn parse(&self, text: &str) -> Result<Value>;
}

/// The formatter `FormatField`'s default `to_element`/`from_element`
/// implementation is equivalent to: plain decimal via `Value`'s own
/// `Display`/`FromStr`.
pub struct DecimalFormatter;

impl NumericFormatter for DecimalFormatter {
    fn format(&self, value: &Value) -> String {
        value.to_string()
    }

    fn parse(&self, text: &str) -> Result<Value> {
        text.parse::<i128>()
            .map(Value::Int)
            .or_else(|_| text.parse::<u128>().map(Value::UInt))
            .map_err(|_| crate::error::Error::Xml(format!("`{text}` is not a valid integer")))
    }
}

/// A custom text codec for `Bytes`-backed string fields (e.g. UTF-16,
/// Latin-1, a length-prefixed Pascal string).
pub trait StringEncoder {
    fn decode(&self, bytes: &[u8]) -> Result<String>;
    fn encode(&self, text: &str) -> Result<Vec<u8>>;
}

/// Plain UTF-8, the common case and the one every `tests/scenarios.rs`
/// fixture uses.
pub struct Utf8;

impl StringEncoder for Utf8 {
    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| crate::error::Error::Format(format!("invalid utf-8: {e}")))
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}
