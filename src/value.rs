use std::fmt;

use crate::context::{Container, ListContainer};

/// The dynamic payload that flows through contexts, containers, and the
/// expression language.
///
/// `spec.md` assumes a "lookup structure supporting attribute access"
/// without naming the value type that structure holds; `Value` is that
/// type. Every atomic and composite combinator parses into one of these
/// variants and builds from one.
#[derive(Debug, Clone)]
pub enum Value {
    /// No value at all — what a zero-byte field like `Padding` parses to,
    /// and what `Computed`'s build step consumes.
    None,
    /// A boolean, as produced by `Flag`.
    Bool(bool),
    /// A signed integer, widened to `i128` for uniform arithmetic in the
    /// expression language regardless of the field's declared width.
    Int(i128),
    /// An unsigned integer, widened to `u128`.
    UInt(u128),
    /// An IEEE 754 double, used for both `f32` and `f64` fields.
    Float(f64),
    /// Raw bytes, as produced by `Bytes` and `Const`.
    Bytes(Vec<u8>),
    /// Decoded text, as produced by string-encoder adapters.
    Str(String),
    /// A homogeneous sequence, as produced by `Array`/`GreedyRange`/
    /// `PrefixedArray`/`Area`.
    List(ListContainer),
    /// An ordered named record, as produced by `Struct`.
    Container(Container),
}

impl Value {
    /// Returns the value as an `i128`, widening `UInt`/`Bool` as needed.
    ///
    /// Used pervasively by the expression language, which is untyped and
    /// treats every scalar as an integer unless a float is explicitly
    /// involved.
    pub fn as_int(&self) -> crate::error::Result<i128> {
        match self {
            Value::Int(v) => Ok(*v),
            Value::UInt(v) => i128::try_from(*v)
                .map_err(|_| crate::error::Error::Range(format!("{v} does not fit in i128"))),
            Value::Bool(v) => Ok(*v as i128),
            other => Err(crate::error::Error::Format(format!(
                "expected an integer, found {}",
                other.kind()
            ))),
        }
    }

    /// Returns the value as an `f64`, accepting integers too (the
    /// expression language does not distinguish `3` from `3.0` until an
    /// arithmetic operator forces a type).
    pub fn as_float(&self) -> crate::error::Result<f64> {
        match self {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            Value::UInt(v) => Ok(*v as f64),
            other => Err(crate::error::Error::Format(format!(
                "expected a number, found {}",
                other.kind()
            ))),
        }
    }

    /// Returns the value as a `usize`, the common case for counts/sizes/
    /// offsets computed by expressions.
    pub fn as_usize(&self) -> crate::error::Result<usize> {
        let n = self.as_int()?;
        usize::try_from(n).map_err(|_| {
            crate::error::Error::Range(format!("expected a non-negative size, found {n}"))
        })
    }

    pub fn as_bool(&self) -> crate::error::Result<bool> {
        match self {
            Value::Bool(v) => Ok(*v),
            Value::Int(v) => Ok(*v != 0),
            Value::UInt(v) => Ok(*v != 0),
            other => Err(crate::error::Error::Format(format!(
                "expected a boolean, found {}",
                other.kind()
            ))),
        }
    }

    pub fn as_bytes(&self) -> crate::error::Result<&[u8]> {
        match self {
            Value::Bytes(b) => Ok(b),
            other => Err(crate::error::Error::Format(format!(
                "expected bytes, found {}",
                other.kind()
            ))),
        }
    }

    pub fn as_container(&self) -> crate::error::Result<&Container> {
        match self {
            Value::Container(c) => Ok(c),
            other => Err(crate::error::Error::Format(format!(
                "expected a struct, found {}",
                other.kind()
            ))),
        }
    }

    pub fn as_container_mut(&mut self) -> crate::error::Result<&mut Container> {
        match self {
            Value::Container(c) => Ok(c),
            other => Err(crate::error::Error::Format(format!(
                "expected a struct, found {}",
                other.kind()
            ))),
        }
    }

    pub fn as_list(&self) -> crate::error::Result<&ListContainer> {
        match self {
            Value::List(l) => Ok(l),
            other => Err(crate::error::Error::Format(format!(
                "expected a list, found {}",
                other.kind()
            ))),
        }
    }

    pub fn as_list_mut(&mut self) -> crate::error::Result<&mut ListContainer> {
        match self {
            Value::List(l) => Ok(l),
            other => Err(crate::error::Error::Format(format!(
                "expected a list, found {}",
                other.kind()
            ))),
        }
    }

    /// A short, human-readable name for the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Container(_) => "struct",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (None, None) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (UInt(a), UInt(b)) => a == b,
            (Int(a), UInt(b)) | (UInt(b), Int(a)) => i128::try_from(*b).map(|b| *a == b).unwrap_or(false),
            (Float(a), Float(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Container(a), Container(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "{v:02x?}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::List(v) => write!(f, "{v:?}"),
            Value::Container(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Int(v as i128)
            }
        })*
    };
}
from_int!(i8, i16, i32, i64, i128, isize);

macro_rules! from_uint {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::UInt(v as u128)
            }
        })*
    };
}
from_uint!(u8, u16, u32, u64, u128, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Container> for Value {
    fn from(v: Container) -> Self {
        Value::Container(v)
    }
}

impl From<ListContainer> for Value {
    fn from(v: ListContainer) -> Self {
        Value::List(v)
    }
}

/// Debug/interop serialization, gated behind the `serde` feature: lets a
/// parsed `Value` be dumped to JSON for snapshot tests or inspection.
/// This is not the XML bridge (`xml::Element`) — just a convenience for
/// looking at what a parse produced.
#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i128(*v),
            Value::UInt(v) => serializer.serialize_u128(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bytes(v) => serializer.collect_seq(v.iter()),
            Value::Str(v) => serializer.serialize_str(v),
            Value::List(v) => serializer.collect_seq(v.iter()),
            Value::Container(v) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(v.len()))?;
                for (key, value) in v.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Renders `value` as a JSON string, for debugging/snapshot tests.
#[cfg(feature = "serde")]
pub fn to_json_string(value: &Value) -> crate::error::Result<String> {
    serde_json::to_string(value).map_err(|e| crate::error::Error::Format(e.to_string()))
}
