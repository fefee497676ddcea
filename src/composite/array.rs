//! Homogeneous sequence combinators: `Array`, `GreedyRange`,
//! `PrefixedArray`.

use crate::construct::{BoxedConstruct, Construct};
use crate::context::{Container, Context, ListContainer, Meta};
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::stream::Stream;
use crate::value::Value;
use crate::xml::{decode_csv_array, encode_csv_array, Element};

/// Renders a homogeneous list as the single CSV-bracketed attribute
/// `spec.md` §4.7/§6 calls for (`b="[1,2,3]"`), by running each element
/// through `subcon.to_element` against a scratch element and lifting back
/// out whatever attribute it set under `name`.
fn list_to_csv_attribute(
    subcon: &BoxedConstruct,
    list: &ListContainer,
    parent: &mut Element,
    name: &str,
) -> Result<()> {
    let mut parts = Vec::with_capacity(list.len());
    for item in list.iter() {
        let mut scratch = Element::new(name);
        subcon.to_element(item, &mut scratch, name)?;
        let part = scratch.get_attribute(name).ok_or_else(|| {
            Error::Xml(format!(
                "array element did not produce attribute `{name}` to CSV-encode"
            ))
        })?;
        parts.push(part.to_string());
    }
    parent.set_attribute(name, encode_csv_array(parts));
    Ok(())
}

/// The inverse of [`list_to_csv_attribute`]: splits the CSV attribute
/// back into per-element strings and feeds each one through
/// `subcon.from_element` via a scratch element carrying just that
/// attribute.
fn list_from_csv_attribute(
    subcon: &BoxedConstruct,
    element: &Element,
    ctx: &Context,
    name: &str,
) -> Result<ListContainer> {
    let csv = element.require_attribute(name)?;
    let parts = decode_csv_array(csv)?;
    let mut list = ListContainer::new();
    for part in parts {
        let mut scratch = Element::new(name);
        scratch.set_attribute(name, part);
        let value = subcon.from_element(&scratch, ctx, name)?;
        list.push(value);
    }
    Ok(list)
}

/// Parses/builds exactly `count(ctx)` elements of `subcon`.
pub struct Array {
    pub subcon: BoxedConstruct,
    pub count: Expr,
}

impl Array {
    pub fn new(subcon: BoxedConstruct, count: Expr) -> Self {
        Array { subcon, count }
    }
}

impl Construct for Array {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let n = self.count.eval_usize(ctx)?;
        let mut list = ListContainer::new();
        let empty = Container::new();
        for _ in 0..n {
            let start = stream.tell();
            let child_ctx = ctx.child(&empty);
            let value = self.subcon.parse(stream, &child_ctx)?;
            let end = stream.tell();
            list.push_with_meta(value, Meta::span(start, end - start));
        }
        Ok(Value::List(list))
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let n = self.count.eval_usize(ctx)?;
        let list = value.as_list()?;
        if list.len() != n {
            return Err(Error::Range(format!(
                "Array expected {n} elements, got {}",
                list.len()
            )));
        }
        let empty = Container::new();
        let child_ctx = ctx.child(&empty);
        for item in list.iter() {
            self.subcon.build(item, stream, &child_ctx)?;
        }
        Ok(())
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        let n = self.count.eval_usize(ctx)? as u64;
        Ok(n * self.subcon.static_sizeof(ctx)?)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        list_to_csv_attribute(&self.subcon, value.as_list()?, parent, name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        list_from_csv_attribute(&self.subcon, element, ctx, name).map(Value::List)
    }
}

/// Parses `subcon` repeatedly until the stream is exhausted or a read
/// fails, discarding the failed attempt and the bytes it consumed so
/// far. The sole combinator that silently swallows a trailing
/// `Error::Stream`/`Error::Format` rather than propagating it.
pub struct GreedyRange {
    pub subcon: BoxedConstruct,
}

impl GreedyRange {
    pub fn new(subcon: BoxedConstruct) -> Self {
        GreedyRange { subcon }
    }
}

impl Construct for GreedyRange {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let mut list = ListContainer::new();
        let empty = Container::new();
        loop {
            if stream.is_eof() {
                break;
            }
            let start = stream.tell();
            let child_ctx = ctx.child(&empty);
            match self.subcon.parse(stream, &child_ctx) {
                Ok(value) => {
                    let end = stream.tell();
                    list.push_with_meta(value, Meta::span(start, end - start));
                }
                Err(Error::Stream(_)) | Err(Error::Format(_)) => {
                    let _ = stream.seek(start);
                    break;
                }
                Err(other) => return Err(other),
            }
        }
        Ok(Value::List(list))
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let list = value.as_list()?;
        let empty = Container::new();
        let child_ctx = ctx.child(&empty);
        for item in list.iter() {
            self.subcon.build(item, stream, &child_ctx)?;
        }
        Ok(())
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        list_to_csv_attribute(&self.subcon, value.as_list()?, parent, name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        list_from_csv_attribute(&self.subcon, element, ctx, name).map(Value::List)
    }
}

/// Parses a count via `count_subcon`, then exactly that many `subcon`
/// elements. On build, `count_subcon` is built from `list.len()`
/// regardless of whatever count the caller's `Container`/`Value` might
/// otherwise imply, the same "derive, don't trust" stance `Rebuild` takes.
pub struct PrefixedArray {
    pub count_subcon: BoxedConstruct,
    pub subcon: BoxedConstruct,
}

impl PrefixedArray {
    pub fn new(count_subcon: BoxedConstruct, subcon: BoxedConstruct) -> Self {
        PrefixedArray { count_subcon, subcon }
    }
}

impl Construct for PrefixedArray {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let empty = Container::new();
        let count_ctx = ctx.child(&empty);
        let n = self.count_subcon.parse(stream, &count_ctx)?.as_usize()?;
        let mut list = ListContainer::new();
        for _ in 0..n {
            let start = stream.tell();
            let child_ctx = ctx.child(&empty);
            let value = self.subcon.parse(stream, &child_ctx)?;
            let end = stream.tell();
            list.push_with_meta(value, Meta::span(start, end - start));
        }
        Ok(Value::List(list))
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let list = value.as_list()?;
        let empty = Container::new();
        let count_ctx = ctx.child(&empty);
        self.count_subcon
            .build(&Value::UInt(list.len() as u128), stream, &count_ctx)?;
        let child_ctx = ctx.child(&empty);
        for item in list.iter() {
            self.subcon.build(item, stream, &child_ctx)?;
        }
        Ok(())
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        list_to_csv_attribute(&self.subcon, value.as_list()?, parent, name)
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        list_from_csv_attribute(&self.subcon, element, ctx, name).map(Value::List)
    }

    /// Reads the count prefix from a cloned cursor position and restores
    /// the stream afterward, so callers probing the total size don't
    /// disturb a subsequent real `parse`.
    fn expected_sizeof(&self, stream: &mut Stream, ctx: &Context) -> Result<u64> {
        let start = stream.tell();
        let empty = Container::new();
        let count_ctx = ctx.child(&empty);
        let n = self.count_subcon.parse(stream, &count_ctx)?.as_usize()? as u64;
        let prefix_size = stream.tell() - start;
        stream.seek(start)?;
        let element_size = self.subcon.static_sizeof(ctx)?;
        Ok(prefix_size + n * element_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::FormatField;
    use crate::stream::Endian;

    fn u8_field() -> BoxedConstruct {
        Box::new(FormatField::new(Endian::Big, 1, false))
    }

    #[test]
    fn array_parses_fixed_count() {
        let a = Array::new(u8_field(), Expr::constant(3u32));
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut s = Stream::from_bytes(vec![1, 2, 3, 9]);
        let value = a.parse(&mut s, &ctx).unwrap();
        assert_eq!(value.as_list().unwrap().len(), 3);
        assert_eq!(s.tell(), 3);
    }

    #[test]
    fn array_build_rejects_wrong_length() {
        let a = Array::new(u8_field(), Expr::constant(3u32));
        let root = Container::new();
        let ctx = Context::new(&root);
        let list: ListContainer = vec![Value::UInt(1), Value::UInt(2)].into_iter().collect();
        let mut s = Stream::new();
        assert!(a.build(&Value::List(list), &mut s, &ctx).is_err());
    }

    #[test]
    fn greedy_range_consumes_until_exhausted() {
        let g = GreedyRange::new(u8_field());
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut s = Stream::from_bytes(vec![1, 2, 3]);
        let value = g.parse(&mut s, &ctx).unwrap();
        assert_eq!(value.as_list().unwrap().len(), 3);
        assert!(s.is_eof());
    }

    #[test]
    fn prefixed_array_roundtrip() {
        let p = PrefixedArray::new(u8_field(), u8_field());
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut s = Stream::from_bytes(vec![2, 10, 20]);
        let value = p.parse(&mut s, &ctx).unwrap();
        assert_eq!(value.as_list().unwrap().len(), 2);

        let mut out = Stream::new();
        p.build(&value, &mut out, &ctx).unwrap();
        assert_eq!(out.as_bytes(), &[2, 10, 20]);
    }

    #[test]
    fn array_to_element_csv_encodes_all_elements() {
        let a = Array::new(u8_field(), Expr::constant(3u32));
        let list: ListContainer = vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)]
            .into_iter()
            .collect();
        let mut parent = Element::new("root");
        a.to_element(&Value::List(list), &mut parent, "values").unwrap();
        assert_eq!(parent.get_attribute("values"), Some("[1,2,3]"));
    }

    #[test]
    fn array_from_element_decodes_csv_back_to_a_list() {
        let a = Array::new(u8_field(), Expr::constant(3u32));
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut parent = Element::new("root");
        parent.set_attribute("values", "[1,2,3]");
        let value = a.from_element(&parent, &ctx, "values").unwrap();
        let list = value.as_list().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(1), Some(&Value::UInt(2)));
    }

    #[test]
    fn greedy_range_xml_roundtrips_through_csv() {
        let g = GreedyRange::new(u8_field());
        let root = Container::new();
        let ctx = Context::new(&root);
        let list: ListContainer = vec![Value::UInt(4), Value::UInt(5)].into_iter().collect();
        let mut parent = Element::new("root");
        g.to_element(&Value::List(list), &mut parent, "values").unwrap();
        assert_eq!(parent.get_attribute("values"), Some("[4,5]"));

        let imported = g.from_element(&parent, &ctx, "values").unwrap();
        assert_eq!(imported.as_list().unwrap().len(), 2);
    }

    #[test]
    fn prefixed_array_xml_roundtrips_through_csv() {
        let p = PrefixedArray::new(u8_field(), u8_field());
        let root = Container::new();
        let ctx = Context::new(&root);
        let list: ListContainer = vec![Value::UInt(7), Value::UInt(8)].into_iter().collect();
        let mut parent = Element::new("root");
        p.to_element(&Value::List(list), &mut parent, "values").unwrap();
        assert_eq!(parent.get_attribute("values"), Some("[7,8]"));

        let imported = p.from_element(&parent, &ctx, "values").unwrap();
        assert_eq!(imported.as_list().unwrap().len(), 2);
    }

    #[test]
    fn prefixed_array_expected_sizeof_peeks_without_consuming() {
        let p = PrefixedArray::new(u8_field(), u8_field());
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut s = Stream::from_bytes(vec![2, 10, 20]);
        let size = p.expected_sizeof(&mut s, &ctx).unwrap();
        assert_eq!(size, 3);
        assert_eq!(s.tell(), 0);
    }
}
