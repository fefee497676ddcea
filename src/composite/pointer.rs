//! Out-of-line combinators: `Pointer` seeks to a computed absolute
//! offset, parses/builds there, and restores the cursor; `Area` does the
//! same but over a declared, fixed-size region.

use crate::construct::{BoxedConstruct, Construct};
use crate::context::Context;
use crate::error::Result;
use crate::expr::Expr;
use crate::stream::Stream;
use crate::value::Value;
use crate::xml::Element;

/// Seeks to `offset(ctx)`, runs `subcon`, then restores the cursor.
/// Occupies zero bytes at its own declaration site — `full_sizeof`
/// reports the pointed-to region's size so a containing `Struct` can
/// still surface `_<field>_ptrsize`.
pub struct Pointer {
    pub offset: Expr,
    pub subcon: BoxedConstruct,
}

impl Pointer {
    pub fn new(offset: Expr, subcon: BoxedConstruct) -> Self {
        Pointer { offset, subcon }
    }
}

impl Construct for Pointer {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let here = stream.tell();
        let target = self.offset.eval_usize(ctx)? as u64;
        stream.seek(target)?;
        let value = self.subcon.parse(stream, ctx)?;
        stream.seek(here)?;
        Ok(value)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let here = stream.tell();
        let target = self.offset.eval_usize(ctx)? as u64;
        stream.seek(target)?;
        self.subcon.build(value, stream, ctx)?;
        stream.seek(here)?;
        Ok(())
    }

    fn static_sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }

    fn sizeof(&self, _value: &Value, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }

    fn full_sizeof(&self, value: &Value, ctx: &Context) -> Result<u64> {
        self.subcon.sizeof(value, ctx)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        self.subcon.to_element(value, parent, name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        self.subcon.from_element(element, ctx, name)
    }
}

/// Like `Pointer`, but the region's size is declared independently via
/// `size(ctx)` rather than inferred from `subcon` — `full_sizeof`
/// reports the declared size even if `subcon` consumes less of it.
pub struct Area {
    pub offset: Expr,
    pub size: Expr,
    pub subcon: BoxedConstruct,
}

impl Area {
    pub fn new(offset: Expr, size: Expr, subcon: BoxedConstruct) -> Self {
        Area { offset, size, subcon }
    }
}

impl Construct for Area {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let here = stream.tell();
        let target = self.offset.eval_usize(ctx)? as u64;
        stream.seek(target)?;
        let value = self.subcon.parse(stream, ctx)?;
        stream.seek(here)?;
        Ok(value)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let here = stream.tell();
        let target = self.offset.eval_usize(ctx)? as u64;
        stream.seek(target)?;
        self.subcon.build(value, stream, ctx)?;
        stream.seek(here)?;
        Ok(())
    }

    fn static_sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }

    fn sizeof(&self, _value: &Value, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }

    fn full_sizeof(&self, _value: &Value, ctx: &Context) -> Result<u64> {
        self.size.eval_usize(ctx).map(|n| n as u64)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        self.subcon.to_element(value, parent, name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        self.subcon.from_element(element, ctx, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::FormatField;
    use crate::context::Container;
    use crate::stream::Endian;

    #[test]
    fn pointer_seeks_reads_and_restores_cursor() {
        let inner: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let p = Pointer::new(Expr::constant(2u32), inner);
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut s = Stream::from_bytes(vec![0, 0, 42]);
        s.seek(0).unwrap();
        let value = p.parse(&mut s, &ctx).unwrap();
        assert_eq!(value, Value::UInt(42));
        assert_eq!(s.tell(), 0);
    }

    #[test]
    fn area_full_sizeof_is_declared_not_inferred() {
        let inner: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let a = Area::new(Expr::constant(0u32), Expr::constant(16u32), inner);
        let root = Container::new();
        let ctx = Context::new(&root);
        assert_eq!(a.full_sizeof(&Value::UInt(1), &ctx).unwrap(), 16);
    }
}
