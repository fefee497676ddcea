//! `dissect` — a declarative, symmetrical codec library for binary data.
//!
//! A single format description, built out of the combinators in
//! [`atomic`] and [`composite`], drives four directions from one
//! definition: [`Construct::parse`] (bytes → [`Value`]), `build`
//! ([`Value`] → bytes), the [`xml`] bridge ([`Value`] ↔ [`xml::Element`]),
//! and [`preprocess`] (filling in offset/size metadata and resolving
//! `Rebuild` fields before a build).
//!
//! ```
//! use dissect::atomic::FormatField;
//! use dissect::composite::Struct;
//! use dissect::context::Context;
//! use dissect::stream::{Endian, Stream};
//! use dissect::Construct;
//!
//! let format = Struct::new(vec![
//!     ("width", Box::new(FormatField::new(Endian::Big, 1, false))),
//!     ("height", Box::new(FormatField::new(Endian::Big, 1, false))),
//! ]);
//! let root = dissect::context::Container::new();
//! let ctx = Context::new(&root);
//! let mut stream = Stream::from_bytes(vec![4, 3]);
//! let value = format.parse(&mut stream, &ctx).unwrap();
//! assert_eq!(value.as_container().unwrap().get("width"), Some(4u32.into()));
//! ```

pub mod atomic;
pub mod codec;
pub mod composite;
pub mod construct;
pub mod context;
pub mod error;
pub mod expr;
pub mod preprocess;
pub mod stream;
pub mod value;
pub mod xml;

pub use construct::{BoxedConstruct, Construct};
pub use error::{Error, Result};
pub use preprocess::{preprocess, preprocess_size};
pub use value::Value;

#[cfg(feature = "derive")]
pub use atomic::WireField;
#[cfg(feature = "derive")]
pub use dissect_derive::Described;

/// Implemented by `#[derive(Described)]`: returns the `Struct`
/// description matching this Rust struct's fields, each mapped to its
/// default wire representation via [`WireField`] and its wire name via
/// `inflections`' camel-case conversion of the Rust field name.
#[cfg(feature = "derive")]
pub trait Described {
    fn describe() -> composite::Struct;
}

/// Parses a value straight out of a file, as a convenience over opening
/// it and feeding its bytes to a [`Stream`](stream::Stream).
#[cfg(feature = "std")]
pub fn parse_file(
    construct: &dyn Construct,
    path: impl AsRef<std::path::Path>,
) -> Result<Value> {
    let bytes = std::fs::read(path).map_err(|e| Error::Format(e.to_string()))?;
    let mut stream = stream::Stream::from_bytes(bytes);
    let root = context::Container::new();
    let ctx = context::Context::new(&root);
    construct.parse(&mut stream, &ctx)
}

/// Builds a value and writes it straight to a file, as a convenience
/// over building into a [`Stream`](stream::Stream) and writing its bytes.
#[cfg(feature = "std")]
pub fn build_file(
    construct: &dyn Construct,
    value: &Value,
    path: impl AsRef<std::path::Path>,
) -> Result<()> {
    let mut stream = stream::Stream::new();
    let root = context::Container::new();
    let ctx = context::Context::new(&root);
    construct.build(value, &mut stream, &ctx)?;
    std::fs::write(path, stream.into_bytes()).map_err(|e| Error::Format(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::FormatField;
    use crate::composite::Struct;
    use crate::stream::Endian;

    #[test]
    fn doctest_style_struct_roundtrip() {
        let format = Struct::new(vec![
            ("width", Box::new(FormatField::new(Endian::Big, 1, false))),
            ("height", Box::new(FormatField::new(Endian::Big, 1, false))),
        ]);
        let root = context::Container::new();
        let ctx = context::Context::new(&root);
        let mut stream = stream::Stream::from_bytes(vec![4, 3]);
        let value = format.parse(&mut stream, &ctx).unwrap();
        assert_eq!(value.as_container().unwrap().get("width"), Some(4u32.into()));
    }
}
