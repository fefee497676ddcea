//! Single-child wrapper combinators: `Rebuild`, `Default`, `Renamed`,
//! `Aligned`, `Bitwise`/`Bytewise`.

use crate::construct::{BoxedConstruct, Construct};
use crate::context::Context;
use crate::error::Result;
use crate::expr::Expr;
use crate::stream::Stream;
use crate::value::Value;
use crate::xml::Element;

/// Parses plainly via `subcon`. On build, ignores the value it is given
/// and substitutes `expr(ctx)` instead — the combinator a checksum or a
/// derived length field is declared with, so it always reflects its
/// siblings' current state rather than whatever the caller passed in.
///
/// `Struct::preprocess` gives a `Rebuild` field special treatment: its
/// `expr` is evaluated only after every sibling has been preprocessed, in
/// a second sweep that retries whatever hasn't resolved yet, so it can
/// reference a field declared later in the struct — including another
/// `Rebuild`.
pub struct Rebuild {
    pub subcon: BoxedConstruct,
    pub expr: Expr,
}

impl Rebuild {
    pub fn new(subcon: BoxedConstruct, expr: Expr) -> Self {
        Rebuild { subcon, expr }
    }
}

impl Construct for Rebuild {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        self.subcon.parse(stream, ctx)
    }

    fn build(&self, _value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let resolved = self.expr.eval(ctx)?;
        self.subcon.build(&resolved, stream, ctx)
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        self.subcon.static_sizeof(ctx)
    }

    fn sizeof(&self, value: &Value, ctx: &Context) -> Result<u64> {
        self.subcon.sizeof(value, ctx)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        self.subcon.to_element(value, parent, name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        self.subcon.from_element(element, ctx, name)
    }
}

/// Parses plainly via `subcon`. On build, substitutes `default` whenever
/// the value given is `Value::None`, letting a caller omit optional
/// fields it doesn't care to set explicitly.
pub struct Default {
    pub subcon: BoxedConstruct,
    pub default: Value,
}

impl Default {
    pub fn new(subcon: BoxedConstruct, default: impl Into<Value>) -> Self {
        Default {
            subcon,
            default: default.into(),
        }
    }
}

impl Construct for Default {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        self.subcon.parse(stream, ctx)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let actual = if matches!(value, Value::None) {
            &self.default
        } else {
            value
        };
        self.subcon.build(actual, stream, ctx)
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        self.subcon.static_sizeof(ctx)
    }

    fn sizeof(&self, value: &Value, ctx: &Context) -> Result<u64> {
        let actual = if matches!(value, Value::None) {
            &self.default
        } else {
            value
        };
        self.subcon.sizeof(actual, ctx)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        self.subcon.to_element(value, parent, name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        self.subcon.from_element(element, ctx, name)
    }
}

/// Parses/builds exactly as `subcon`, but always presents itself under
/// `name` to the XML bridge regardless of what field name it is nested
/// under — useful when a combinator is reused under several field names
/// but should always show up in interchange under one canonical tag.
pub struct Renamed {
    pub subcon: BoxedConstruct,
    pub name: String,
}

impl Renamed {
    pub fn new(subcon: BoxedConstruct, name: impl Into<String>) -> Self {
        Renamed {
            subcon,
            name: name.into(),
        }
    }
}

impl Construct for Renamed {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        self.subcon.parse(stream, ctx)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        self.subcon.build(value, stream, ctx)
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        self.subcon.static_sizeof(ctx)
    }

    fn sizeof(&self, value: &Value, ctx: &Context) -> Result<u64> {
        self.subcon.sizeof(value, ctx)
    }

    fn full_sizeof(&self, value: &Value, ctx: &Context) -> Result<u64> {
        self.subcon.full_sizeof(value, ctx)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, _name: &str) -> Result<()> {
        self.subcon.to_element(value, parent, &self.name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, _name: &str) -> Result<Value> {
        self.subcon.from_element(element, ctx, &self.name)
    }
}

/// Parses/builds `subcon`, then pads to the next multiple of `modulus`
/// bytes: skips the padding on parse, writes zero bytes on build.
pub struct Aligned {
    pub subcon: BoxedConstruct,
    pub modulus: u64,
}

impl Aligned {
    pub fn new(subcon: BoxedConstruct, modulus: u64) -> Self {
        Aligned { subcon, modulus }
    }

    fn pad_len(&self, pos: u64) -> u64 {
        let rem = pos % self.modulus;
        if rem == 0 {
            0
        } else {
            self.modulus - rem
        }
    }
}

impl Construct for Aligned {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let value = self.subcon.parse(stream, ctx)?;
        let pad = self.pad_len(stream.tell());
        if pad > 0 {
            stream.read(pad as usize)?;
        }
        Ok(value)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        self.subcon.build(value, stream, ctx)?;
        let pad = self.pad_len(stream.tell());
        if pad > 0 {
            stream.write(&vec![0u8; pad as usize])?;
        }
        Ok(())
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        let size = self.subcon.static_sizeof(ctx)?;
        Ok(size + self.pad_len(size))
    }

    fn sizeof(&self, value: &Value, ctx: &Context) -> Result<u64> {
        let size = self.subcon.sizeof(value, ctx)?;
        Ok(size + self.pad_len(size))
    }
}

/// Switches the stream into bit mode for the duration of `subcon`, then
/// leaves bit mode — failing if `subcon` did not end byte-aligned.
pub struct Bitwise {
    pub subcon: BoxedConstruct,
}

impl Bitwise {
    pub fn new(subcon: BoxedConstruct) -> Self {
        Bitwise { subcon }
    }
}

impl Construct for Bitwise {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        stream.enter_bits();
        let value = self.subcon.parse(stream, ctx)?;
        stream.exit_bits()?;
        Ok(value)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        stream.enter_bits();
        self.subcon.build(value, stream, ctx)?;
        stream.exit_bits()
    }
}

/// The inverse of `Bitwise`: temporarily leaves bit mode (failing if not
/// currently byte-aligned) to run `subcon` in byte mode, then resumes bit
/// mode for whatever follows in the enclosing `Bitwise` block.
pub struct Bytewise {
    pub subcon: BoxedConstruct,
}

impl Bytewise {
    pub fn new(subcon: BoxedConstruct) -> Self {
        Bytewise { subcon }
    }
}

impl Construct for Bytewise {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        stream.exit_bits()?;
        let value = self.subcon.parse(stream, ctx)?;
        stream.enter_bits();
        Ok(value)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        stream.exit_bits()?;
        self.subcon.build(value, stream, ctx)?;
        stream.enter_bits();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::{BitsField, FormatField};
    use crate::context::Container;
    use crate::stream::Endian;

    #[test]
    fn rebuild_ignores_supplied_value() {
        let inner: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let rebuild = Rebuild::new(inner, Expr::constant(9u32));
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut s = Stream::new();
        rebuild.build(&Value::UInt(1), &mut s, &ctx).unwrap();
        assert_eq!(s.as_bytes(), &[9]);
    }

    #[test]
    fn default_fills_in_none() {
        let inner: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let d = Default::new(inner, 5u32);
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut s = Stream::new();
        d.build(&Value::None, &mut s, &ctx).unwrap();
        assert_eq!(s.as_bytes(), &[5]);
    }

    #[test]
    fn aligned_pads_to_modulus() {
        let inner: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let a = Aligned::new(inner, 4);
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut s = Stream::new();
        a.build(&Value::UInt(1), &mut s, &ctx).unwrap();
        assert_eq!(s.as_bytes(), &[1, 0, 0, 0]);
    }

    #[test]
    fn bitwise_roundtrips_bits_struct() {
        use crate::composite::struct_::Struct;
        let inner = Struct::new(vec![
            ("a", Box::new(BitsField::new(3, false))),
            ("b", Box::new(BitsField::new(5, false))),
        ]);
        let bw = Bitwise::new(Box::new(inner));
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut s = Stream::from_bytes(vec![0b101_01010]);
        let value = bw.parse(&mut s, &ctx).unwrap();
        let container = value.as_container().unwrap();
        assert_eq!(container.get("a"), Some(Value::UInt(5)));
        assert_eq!(container.get("b"), Some(Value::UInt(10)));

        let mut out = Stream::new();
        bw.build(&value, &mut out, &ctx).unwrap();
        assert_eq!(out.as_bytes(), &[0b101_01010]);
    }

    #[test]
    fn renamed_exports_under_fixed_tag() {
        let inner: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let r = Renamed::new(inner, "canonical");
        let mut element = Element::new("parent");
        r.to_element(&Value::UInt(3), &mut element, "whatever").unwrap();
        assert_eq!(element.get_attribute("canonical"), Some("3"));
    }
}
