//! Region-bounding combinators: `Prefixed` carves out a length-prefixed
//! byte region for `subcon` to parse in isolation; `Tunnel`/`Compressed`
//! additionally runs that region through a [`Codec`] first.

use crate::codec::Codec;
use crate::construct::{BoxedConstruct, Construct};
use crate::context::Context;
use crate::error::Result;
use crate::stream::Stream;
use crate::value::Value;
use crate::xml::Element;

/// Reads a length via `length_subcon`, slices out exactly that many
/// bytes, and parses `subcon` from that slice alone — bytes `subcon`
/// doesn't consume are silently discarded, and `subcon` can never read
/// past the prefix regardless of how it's implemented.
pub struct Prefixed {
    pub length_subcon: BoxedConstruct,
    pub subcon: BoxedConstruct,
}

impl Prefixed {
    pub fn new(length_subcon: BoxedConstruct, subcon: BoxedConstruct) -> Self {
        Prefixed { length_subcon, subcon }
    }
}

impl Construct for Prefixed {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let n = self.length_subcon.parse(stream, ctx)?.as_usize()?;
        let bytes = stream.read(n)?.to_vec();
        let mut inner = Stream::from_bytes(bytes);
        self.subcon.parse(&mut inner, ctx)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let mut inner = Stream::new();
        self.subcon.build(value, &mut inner, ctx)?;
        let bytes = inner.into_bytes();
        self.length_subcon
            .build(&Value::UInt(bytes.len() as u128), stream, ctx)?;
        stream.write(&bytes)
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        let prefix = self.length_subcon.static_sizeof(ctx)?;
        let body = self.subcon.static_sizeof(ctx)?;
        Ok(prefix + body)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        self.subcon.to_element(value, parent, name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        self.subcon.from_element(element, ctx, name)
    }
}

/// Like `Prefixed`, but additionally runs the carved-out region through
/// `codec` before parsing (and through its inverse before writing back).
/// Per the specification's design notes, the XML bridge for a tunneled
/// region is documented as lossy: `to_element`/`from_element` operate on
/// `subcon`'s already-decoded value and have no way to recover the exact
/// original compressed bytes on a re-encode that the codec itself
/// doesn't guarantee deterministically.
pub struct Tunnel {
    pub length_subcon: BoxedConstruct,
    pub codec: Box<dyn Codec>,
    pub subcon: BoxedConstruct,
}

impl Tunnel {
    pub fn new(length_subcon: BoxedConstruct, codec: Box<dyn Codec>, subcon: BoxedConstruct) -> Self {
        Tunnel {
            length_subcon,
            codec,
            subcon,
        }
    }
}

impl Construct for Tunnel {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let n = self.length_subcon.parse(stream, ctx)?.as_usize()?;
        let raw = stream.read(n)?.to_vec();
        let decoded = self.codec.decode(&raw)?;
        let mut inner = Stream::from_bytes(decoded);
        self.subcon.parse(&mut inner, ctx)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let mut inner = Stream::new();
        self.subcon.build(value, &mut inner, ctx)?;
        let encoded = self.codec.encode(&inner.into_bytes())?;
        self.length_subcon
            .build(&Value::UInt(encoded.len() as u128), stream, ctx)?;
        stream.write(&encoded)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        self.subcon.to_element(value, parent, name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        self.subcon.from_element(element, ctx, name)
    }
}

/// `Compressed` is `Tunnel` under the name the specification's source
/// lineage uses when the codec specifically performs compression;
/// behaviorally identical, kept distinct so a format description reads
/// as documentation of intent.
pub type Compressed = Tunnel;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::FormatField;
    use crate::codec::Identity;
    use crate::context::Container;
    use crate::stream::Endian;

    fn u8_field() -> BoxedConstruct {
        Box::new(FormatField::new(Endian::Big, 1, false))
    }

    #[test]
    fn prefixed_discards_trailing_bytes_in_region() {
        let length: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let p = Prefixed::new(length, u8_field());
        let root = Container::new();
        let ctx = Context::new(&root);
        // Region is 3 bytes, subcon (one u8) only consumes the first.
        let mut s = Stream::from_bytes(vec![3, 10, 0xAA, 0xBB, 99]);
        let value = p.parse(&mut s, &ctx).unwrap();
        assert_eq!(value, Value::UInt(10));
        assert_eq!(s.tell(), 4);
    }

    #[test]
    fn tunnel_roundtrips_through_identity_codec() {
        let length: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let t = Tunnel::new(length, Box::new(Identity), u8_field());
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut out = Stream::new();
        t.build(&Value::UInt(5), &mut out, &ctx).unwrap();
        out.seek(0).unwrap();
        assert_eq!(t.parse(&mut out, &ctx).unwrap(), Value::UInt(5));
    }
}
