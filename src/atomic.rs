//! Atomic combinators: fixed-width fields, raw bytes, constants, padding,
//! computed (no-bytes) fields, and symbolic-name adapters.
//!
//! The exhaustive per-width alias catalogue (`Int8ub`, `Int16ul`, ...) is
//! out of scope; `FormatField`/`FloatField` are the generic primitives a
//! concrete catalogue would be built from.

use crate::construct::{BoxedConstruct, Construct};
use crate::context::{Container, Context};
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::stream::{Endian, Stream};
use crate::value::Value;
use crate::xml::Element;

/// A fixed-size integer: `width` bytes, `endian` byte order, optionally
/// sign-extended.
#[derive(Debug, Clone, Copy)]
pub struct FormatField {
    pub endian: Endian,
    pub width: usize,
    pub signed: bool,
}

impl FormatField {
    pub fn new(endian: Endian, width: usize, signed: bool) -> Self {
        FormatField { endian, width, signed }
    }
}

impl Construct for FormatField {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, _ctx: &Context) -> Result<Value> {
        let raw = stream.read_uint(self.width, self.endian)?;
        Ok(if self.signed {
            Value::Int(sign_extend(raw, self.width))
        } else {
            Value::UInt(raw)
        })
    }

    fn build(&self, value: &Value, stream: &mut Stream, _ctx: &Context) -> Result<()> {
        let bits = self.width * 8;
        let raw = if self.signed {
            let v = value.as_int()?;
            let (lo, hi) = signed_range(bits);
            if v < lo || v > hi {
                return Err(Error::Format(format!(
                    "{v} does not fit in a signed {bits}-bit field"
                )));
            }
            (v as u128) & mask(bits)
        } else {
            let v: u128 = match value {
                Value::UInt(v) => *v,
                Value::Int(v) if *v >= 0 => *v as u128,
                Value::Int(v) => {
                    return Err(Error::Format(format!(
                        "negative value {v} cannot build into an unsigned field"
                    )))
                }
                Value::Bool(b) => *b as u128,
                other => {
                    return Err(Error::Format(format!(
                        "expected an integer, found {}",
                        other.kind()
                    )))
                }
            };
            if bits < 128 && v > mask(bits) {
                return Err(Error::Format(format!(
                    "{v} does not fit in an unsigned {bits}-bit field"
                )));
            }
            v
        };
        stream.write_uint(raw, self.width, self.endian)
    }

    fn static_sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.width as u64)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        parent.set_attribute(name, value.to_string());
        Ok(())
    }

    fn from_element(&self, element: &Element, _ctx: &Context, name: &str) -> Result<Value> {
        let text = element.require_attribute(name)?;
        if self.signed {
            text.parse::<i128>()
                .map(Value::Int)
                .map_err(|e| Error::Xml(format!("attribute `{name}`: {e}")))
        } else {
            text.parse::<u128>()
                .map(Value::UInt)
                .map_err(|e| Error::Xml(format!("attribute `{name}`: {e}")))
        }
    }
}

fn mask(bits: usize) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

fn signed_range(bits: usize) -> (i128, i128) {
    if bits >= 128 {
        (i128::MIN, i128::MAX)
    } else {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    }
}

fn sign_extend(raw: u128, width: usize) -> i128 {
    let bits = width * 8;
    if bits >= 128 {
        return raw as i128;
    }
    let sign_bit = 1u128 << (bits - 1);
    if raw & sign_bit != 0 {
        (raw as i128) - (1i128 << bits)
    } else {
        raw as i128
    }
}

/// A fixed-width integer read/written through the stream's bit cursor
/// rather than its byte cursor — the leaf combinator a `Bitwise` block
/// wraps around (e.g. `Bitwise(Struct(("a", BitsField::new(3, false)),
/// ("b", BitsField::new(5, false))))` over one packed byte).
#[derive(Debug, Clone, Copy)]
pub struct BitsField {
    pub width: usize,
    pub signed: bool,
}

impl BitsField {
    pub fn new(width: usize, signed: bool) -> Self {
        BitsField { width, signed }
    }
}

impl Construct for BitsField {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, _ctx: &Context) -> Result<Value> {
        let raw = stream.read_bits(self.width)? as u128;
        Ok(if self.signed {
            let sign_bit = 1u128 << (self.width - 1);
            let signed = if raw & sign_bit != 0 {
                (raw as i128) - (1i128 << self.width)
            } else {
                raw as i128
            };
            Value::Int(signed)
        } else {
            Value::UInt(raw)
        })
    }

    fn build(&self, value: &Value, stream: &mut Stream, _ctx: &Context) -> Result<()> {
        let raw = if self.signed {
            (value.as_int()? as u128) & mask(self.width)
        } else {
            let v = value.as_int()? as u128;
            if v > mask(self.width) {
                return Err(Error::Format(format!(
                    "{v} does not fit in a {}-bit field",
                    self.width
                )));
            }
            v
        };
        stream.write_bits(raw as u64, self.width)
    }

    fn static_sizeof(&self, _ctx: &Context) -> Result<u64> {
        Err(Error::UnknownSize)
    }
}

/// An IEEE 754 float, `width` 4 (`f32`) or 8 (`f64`) bytes.
#[derive(Debug, Clone, Copy)]
pub struct FloatField {
    pub endian: Endian,
    pub width: usize,
}

impl Construct for FloatField {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, _ctx: &Context) -> Result<Value> {
        match self.width {
            4 => Ok(Value::Float(stream.read_f32(self.endian)? as f64)),
            8 => Ok(Value::Float(stream.read_f64(self.endian)?)),
            w => Err(Error::Format(format!("unsupported float width {w}"))),
        }
    }

    fn build(&self, value: &Value, stream: &mut Stream, _ctx: &Context) -> Result<()> {
        let v = value.as_float()?;
        match self.width {
            4 => stream.write_f32(v as f32, self.endian),
            8 => stream.write_f64(v, self.endian),
            w => Err(Error::Format(format!("unsupported float width {w}"))),
        }
    }

    fn static_sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.width as u64)
    }
}

/// Raw bytes of length `expr(ctx)`.
pub struct Bytes {
    pub len: Expr,
}

impl Bytes {
    pub fn new(len: Expr) -> Self {
        Bytes { len }
    }
}

impl Construct for Bytes {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let n = self.len.eval_usize(ctx)?;
        Ok(Value::Bytes(stream.read(n)?.to_vec()))
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let expected = self.len.eval_usize(ctx)?;
        let bytes = value.as_bytes()?;
        if bytes.len() != expected {
            return Err(Error::Range(format!(
                "Bytes expected {expected} bytes, got {}",
                bytes.len()
            )));
        }
        stream.write(bytes)
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        self.len.eval_usize(ctx).map(|n| n as u64)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        let bytes = value.as_bytes()?;
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        parent.set_attribute(name, hex);
        Ok(())
    }

    fn from_element(&self, element: &Element, _ctx: &Context, name: &str) -> Result<Value> {
        let hex = element.require_attribute(name)?;
        decode_hex(hex)
            .map(Value::Bytes)
            .map_err(|e| Error::Xml(format!("attribute `{name}`: {e}")))
    }
}

fn decode_hex(text: &str) -> std::result::Result<Vec<u8>, String> {
    if text.len() % 2 != 0 {
        return Err(format!("odd-length hex string `{text}`"));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

/// Parses with `subcon` and checks the result equals `expected`; always
/// builds `expected` regardless of the value passed in (a `Const` is a
/// schema assertion, not a field — documented quirk, preserved on
/// purpose).
pub struct Const {
    pub expected: Value,
    pub subcon: BoxedConstruct,
}

impl Const {
    pub fn new(expected: impl Into<Value>, subcon: BoxedConstruct) -> Self {
        Const {
            expected: expected.into(),
            subcon,
        }
    }
}

impl Construct for Const {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let value = self.subcon.parse(stream, ctx)?;
        if value != self.expected {
            return Err(Error::Const { path: None });
        }
        Ok(value)
    }

    fn build(&self, _value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        self.subcon.build(&self.expected, stream, ctx)
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        self.subcon.static_sizeof(ctx)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        self.subcon.to_element(value, parent, name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        let value = self.subcon.from_element(element, ctx, name)?;
        if value != self.expected {
            return Err(Error::Const { path: None });
        }
        Ok(value)
    }
}

/// Zero bytes: parse returns `expr(ctx)`; build is a no-op.
pub struct Computed {
    pub expr: Expr,
}

impl Computed {
    pub fn new(expr: Expr) -> Self {
        Computed { expr }
    }
}

impl Construct for Computed {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, _stream: &mut Stream, ctx: &Context) -> Result<Value> {
        self.expr.eval(ctx)
    }

    fn build(&self, _value: &Value, _stream: &mut Stream, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    fn static_sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }
}

/// `n` zero bytes on build; skipped (and discarded) on parse.
pub struct Padding {
    pub n: usize,
}

impl Padding {
    pub fn new(n: usize) -> Self {
        Padding { n }
    }
}

impl Construct for Padding {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, _ctx: &Context) -> Result<Value> {
        stream.read(self.n)?;
        Ok(Value::None)
    }

    fn build(&self, _value: &Value, stream: &mut Stream, _ctx: &Context) -> Result<()> {
        stream.write(&vec![0u8; self.n])
    }

    fn static_sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.n as u64)
    }
}

/// One byte: `0` parses to `false`, anything else to `true`; build
/// writes `0` or `1`.
pub struct Flag;

impl Construct for Flag {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, _ctx: &Context) -> Result<Value> {
        let byte = stream.read(1)?[0];
        Ok(Value::Bool(byte != 0))
    }

    fn build(&self, value: &Value, stream: &mut Stream, _ctx: &Context) -> Result<()> {
        stream.write(&[value.as_bool()? as u8])
    }

    fn static_sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(1)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        parent.set_attribute(name, value.as_bool()?.to_string());
        Ok(())
    }

    fn from_element(&self, element: &Element, _ctx: &Context, name: &str) -> Result<Value> {
        match element.require_attribute(name)? {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(Error::Xml(format!("attribute `{name}`: invalid flag `{other}`"))),
        }
    }
}

/// Maps an integer `subcon` to/from symbolic names. An integer with no
/// matching name passes through unchanged in both directions (lenient,
/// as the underlying wire format may contain values the caller hasn't
/// named).
pub struct Enum {
    pub subcon: BoxedConstruct,
    pub mapping: Vec<(String, i128)>,
}

impl Enum {
    pub fn new(subcon: BoxedConstruct, mapping: Vec<(&str, i128)>) -> Self {
        Enum {
            subcon,
            mapping: mapping.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    fn name_for(&self, value: i128) -> Option<&str> {
        self.mapping
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(k, _)| k.as_str())
    }

    fn value_for(&self, name: &str) -> Option<i128> {
        self.mapping
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| *v)
    }
}

impl Construct for Enum {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let raw = self.subcon.parse(stream, ctx)?;
        let n = raw.as_int()?;
        Ok(match self.name_for(n) {
            Some(name) => Value::Str(name.to_string()),
            None => raw,
        })
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let raw = match value {
            Value::Str(name) => {
                let n = self.value_for(name).ok_or_else(|| {
                    Error::Format(format!("unknown enum name `{name}`"))
                })?;
                Value::Int(n)
            }
            other => other.clone(),
        };
        self.subcon.build(&raw, stream, ctx)
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        self.subcon.static_sizeof(ctx)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        match value {
            Value::Str(s) => {
                parent.set_attribute(name, s);
                Ok(())
            }
            other => self.subcon.to_element(other, parent, name),
        }
    }

    fn from_element(&self, element: &Element, _ctx: &Context, name: &str) -> Result<Value> {
        let text = element.require_attribute(name)?;
        Ok(match self.value_for(text) {
            Some(_) => Value::Str(text.to_string()),
            None => text
                .parse::<i128>()
                .map(Value::Int)
                .map_err(|e| Error::Xml(format!("attribute `{name}`: {e}")))?,
        })
    }
}

/// A bitmask adapter over an integer `subcon`: parses into a `Container`
/// of `name -> bool` for each declared flag, and rebuilds the raw integer
/// by OR-ing together only the bits of flags present and set.
///
/// Documented quirk: building a container derived from parsing `0xFF`
/// over `{one=1, two=2, four=4, eight=8}` yields `0x0F`, not `0xFF` — the
/// unrecognized upper bits are never represented in the container, so
/// they can't round-trip. This is intentional, not a bug.
pub struct FlagsEnum {
    pub subcon: BoxedConstruct,
    pub flags: Vec<(String, u128)>,
}

impl FlagsEnum {
    pub fn new(subcon: BoxedConstruct, flags: Vec<(&str, u128)>) -> Self {
        FlagsEnum {
            subcon,
            flags: flags.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

impl Construct for FlagsEnum {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let raw = self.subcon.parse(stream, ctx)?.as_int()? as u128;
        let mut container = Container::new();
        for (name, bit) in &self.flags {
            container.insert(name.clone(), raw & bit != 0);
        }
        Ok(Value::Container(container))
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let container = value.as_container()?;
        let mut raw: u128 = 0;
        for (name, bit) in &self.flags {
            if let Some(v) = container.get(name) {
                if v.as_bool()? {
                    raw |= bit;
                }
            }
        }
        self.subcon.build(&Value::UInt(raw), stream, ctx)
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        self.subcon.static_sizeof(ctx)
    }
}

/// Maps a primitive Rust type to the atomic combinator that reads/writes
/// its default big-endian wire representation — the lookup
/// `#[derive(Described)]` uses to build a `Struct` description straight
/// from a plain Rust struct's field types.
#[cfg(feature = "derive")]
pub trait WireField {
    fn wire_format() -> BoxedConstruct;
}

#[cfg(feature = "derive")]
macro_rules! wire_field_int {
    ($($ty:ty => $width:expr, $signed:expr);* $(;)?) => {
        $(impl WireField for $ty {
            fn wire_format() -> BoxedConstruct {
                Box::new(FormatField::new(crate::stream::Endian::Big, $width, $signed))
            }
        })*
    };
}

#[cfg(feature = "derive")]
wire_field_int!(
    u8 => 1, false;
    u16 => 2, false;
    u32 => 4, false;
    u64 => 8, false;
    i8 => 1, true;
    i16 => 2, true;
    i32 => 4, true;
    i64 => 8, true;
);

#[cfg(feature = "derive")]
impl WireField for bool {
    fn wire_format() -> BoxedConstruct {
        Box::new(Flag)
    }
}

#[cfg(feature = "derive")]
impl WireField for f32 {
    fn wire_format() -> BoxedConstruct {
        Box::new(FloatField {
            endian: crate::stream::Endian::Big,
            width: 4,
        })
    }
}

#[cfg(feature = "derive")]
impl WireField for f64 {
    fn wire_format() -> BoxedConstruct {
        Box::new(FloatField {
            endian: crate::stream::Endian::Big,
            width: 8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_fixture() -> Container {
        Container::new()
    }

    #[test]
    fn format_field_signed_roundtrip() {
        let field = FormatField::new(Endian::Big, 2, true);
        let root = ctx_fixture();
        let ctx = Context::new(&root);
        let mut s = Stream::new();
        field.build(&Value::Int(-2), &mut s, &ctx).unwrap();
        s.seek(0).unwrap();
        assert_eq!(field.parse(&mut s, &ctx).unwrap(), Value::Int(-2));
    }

    #[test]
    fn const_always_builds_expected() {
        let inner: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let c = Const::new(7u32, inner);
        let root = ctx_fixture();
        let ctx = Context::new(&root);
        let mut s = Stream::new();
        c.build(&Value::UInt(99), &mut s, &ctx).unwrap();
        assert_eq!(s.as_bytes(), &[7]);
    }

    #[test]
    fn const_rejects_mismatch_on_parse() {
        let inner: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let c = Const::new(7u32, inner);
        let root = ctx_fixture();
        let ctx = Context::new(&root);
        let mut s = Stream::from_bytes(vec![9]);
        assert!(matches!(c.parse(&mut s, &ctx), Err(Error::Const { .. })));
    }

    #[test]
    fn flags_enum_truncates_unrecognized_bits_on_rebuild() {
        let inner: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let flags = FlagsEnum::new(
            inner,
            vec![("one", 1), ("two", 2), ("four", 4), ("eight", 8)],
        );
        let root = ctx_fixture();
        let ctx = Context::new(&root);
        let mut s = Stream::from_bytes(vec![0xFF]);
        let parsed = flags.parse(&mut s, &ctx).unwrap();

        let mut out = Stream::new();
        flags.build(&parsed, &mut out, &ctx).unwrap();
        assert_eq!(out.as_bytes(), &[0x0F]);
    }

    #[test]
    fn padding_writes_zeros() {
        let p = Padding::new(3);
        let root = ctx_fixture();
        let ctx = Context::new(&root);
        let mut s = Stream::new();
        p.build(&Value::None, &mut s, &ctx).unwrap();
        assert_eq!(s.as_bytes(), &[0, 0, 0]);
    }
}
