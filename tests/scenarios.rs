//! End-to-end scenarios exercising whole format descriptions rather than
//! single combinators in isolation.

use dissect::atomic::{BitsField, FormatField};
use dissect::composite::{Area, Bitwise, GreedyRange, Rebuild, Struct, Switch};
use dissect::context::Container;
use dissect::context::Context;
use dissect::expr::THIS;
use dissect::preprocess::preprocess;
use dissect::stream::{Endian, Stream};
use dissect::value::Value;
use dissect::xml::{switch_id_key, Element};
use dissect::{BoxedConstruct, Construct};

fn u8_field() -> BoxedConstruct {
    Box::new(FormatField::new(Endian::Big, 1, false))
}

/// A BMP-like header: a magic byte, width/height, and a pixel array whose
/// length is derived from `width * height` rather than stored explicitly.
#[test]
fn bitmap_like_struct_with_derived_pixel_count() {
    let format = Struct::new(vec![
        (
            "magic",
            Box::new(dissect::atomic::Const::new(0x42u32, u8_field())),
        ),
        ("width", u8_field()),
        ("height", u8_field()),
        (
            "pixels",
            Box::new(dissect::composite::Array::new(
                u8_field(),
                THIS.field("width").mul(THIS.field("height")),
            )),
        ),
    ]);

    let root = Container::new();
    let ctx = Context::new(&root);
    let mut stream = Stream::from_bytes(vec![0x42, 2, 2, 1, 2, 3, 4]);
    let value = format.parse(&mut stream, &ctx).unwrap();
    let container = value.as_container().unwrap();
    assert_eq!(container.get("width"), Some(Value::UInt(2)));
    assert_eq!(container.get("pixels").unwrap().as_list().unwrap().len(), 4);

    let mut out = Stream::new();
    format.build(&value, &mut out, &ctx).unwrap();
    assert_eq!(out.as_bytes(), &[0x42, 2, 2, 1, 2, 3, 4]);
}

/// Two `Rebuild` fields chained together: `doubled` references `base`,
/// itself a `Rebuild` declared earlier in the struct. This exercises the
/// case where the dependency is already resolved by declaration order;
/// see `forward_referencing_rebuild_chain_resolves_out_of_order` for a
/// `Rebuild` that depends on one declared *after* it.
#[test]
fn nested_rebuilds_chain_through_the_deferred_sweep() {
    let format = Struct::new(vec![
        (
            "base",
            Box::new(Rebuild::new(u8_field(), THIS.field("raw").add(1i32.into()))),
        ),
        (
            "doubled",
            Box::new(Rebuild::new(u8_field(), THIS.field("base").mul(2i32.into()))),
        ),
        ("raw", u8_field()),
    ]);

    let mut obj = Container::new();
    obj.insert("base", 0u32);
    obj.insert("doubled", 0u32);
    obj.insert("raw", 5u32);

    let root = Container::new();
    let ctx = Context::new(&root);
    let prepared = preprocess(&format, Value::Container(obj), &ctx).unwrap();
    let container = prepared.as_container().unwrap();
    assert_eq!(container.get("base"), Some(Value::Int(6)));
    assert_eq!(container.get("doubled"), Some(Value::Int(12)));

    let mut stream = Stream::new();
    format.build(&prepared, &mut stream, &ctx).unwrap();
    assert_eq!(stream.as_bytes(), &[6, 12, 5]);
}

/// `a = Rebuild(this.b)` declared before `b = Rebuild(this.c)`, with `c` a
/// plain field: `a`'s dependency is a `Rebuild` that hasn't resolved yet
/// when the deferred sweep reaches it in declaration order, so the sweep
/// must retry rather than resolve strictly left-to-right.
#[test]
fn forward_referencing_rebuild_chain_resolves_out_of_order() {
    let u32le_field = || -> BoxedConstruct { Box::new(FormatField::new(Endian::Little, 4, false)) };
    let format = Struct::new(vec![
        ("a", Box::new(Rebuild::new(u32le_field(), THIS.field("b")))),
        ("b", Box::new(Rebuild::new(u32le_field(), THIS.field("c")))),
        ("c", u32le_field()),
    ]);

    let mut obj = Container::new();
    obj.insert("a", 0u32);
    obj.insert("b", 0u32);
    obj.insert("c", 7u32);

    let root = Container::new();
    let ctx = Context::new(&root);
    let prepared = preprocess(&format, Value::Container(obj), &ctx).unwrap();
    let container = prepared.as_container().unwrap();
    assert_eq!(container.get("a"), Some(Value::UInt(7)));
    assert_eq!(container.get("b"), Some(Value::UInt(7)));
    assert_eq!(container.get("c"), Some(Value::UInt(7)));

    let mut stream = Stream::new();
    format.build(&prepared, &mut stream, &ctx).unwrap();
    assert_eq!(
        stream.as_bytes(),
        &[7, 0, 0, 0, 7, 0, 0, 0, 7, 0, 0, 0]
    );
}

/// An `Area` whose region lies at an offset and size declared by earlier
/// sibling fields, entirely disjoint from the struct's own sequential
/// cursor — the cross-dependency an index/table-of-contents format needs.
#[test]
fn area_region_located_by_sibling_fields() {
    let format = Struct::new(vec![
        ("data_offset", u8_field()),
        ("data_size", u8_field()),
        (
            "data",
            Box::new(Area::new(
                THIS.field("data_offset"),
                THIS.field("data_size"),
                Box::new(dissect::atomic::Bytes::new(THIS.field("data_size"))),
            )),
        ),
    ]);

    let root = Container::new();
    let ctx = Context::new(&root);
    let mut stream = Stream::from_bytes(vec![3, 2, 0, 0xAA, 0xBB]);
    let value = format.parse(&mut stream, &ctx).unwrap();
    let container = value.as_container().unwrap();
    assert_eq!(container.get("data_offset"), Some(Value::UInt(3)));
    assert_eq!(container.get("data"), Some(Value::Bytes(vec![0xAA, 0xBB])));

    let mut out = Stream::new();
    format.build(&value, &mut out, &ctx).unwrap();
    assert_eq!(out.as_bytes(), &[3, 2, 0, 0xAA, 0xBB]);
}

/// A `Switch` over two struct-shaped cases, exported to an XML tree and
/// re-imported: the case's own key never appears as an attribute, so
/// `from_element` records it under `_switchid_<name>` for a sibling
/// `Rebuild` to recover.
#[test]
fn switch_round_trips_through_the_xml_bridge() {
    let case_a: BoxedConstruct = Box::new(Struct::new(vec![("x", u8_field())]));
    let case_b: BoxedConstruct = Box::new(Struct::new(vec![("y", u8_field())]));
    let switch = Switch::new(
        THIS.field("kind"),
        vec![(Value::from(1u32), case_a), (Value::from(2u32), case_b)],
        None,
    );

    let mut root = Container::new();
    root.insert("kind", 1u32);
    let ctx = Context::new(&root);

    let mut payload = Container::new();
    payload.insert("x", 5u32);
    let value = Value::Container(payload);

    let mut parent = Element::new("root");
    switch.to_element(&value, &mut parent, "payload").unwrap();
    assert!(parent.child("1").is_some());

    let imported = switch.from_element(&parent, &ctx, "payload").unwrap();
    let container = imported.as_container().unwrap();
    assert_eq!(container.get("x"), Some(Value::UInt(5)));
    assert_eq!(container.get(&switch_id_key("payload")), Some(Value::UInt(1)));
}

/// A `Bitwise` block packing a signed nibble and an unsigned nibble into
/// one byte, round-tripped end to end through `parse`/`build`.
#[test]
fn bitwise_block_packs_signed_and_unsigned_nibbles() {
    let inner = Struct::new(vec![
        ("high", Box::new(BitsField::new(4, true))),
        ("low", Box::new(BitsField::new(4, false))),
    ]);
    let bw = Bitwise::new(Box::new(inner));

    let root = Container::new();
    let ctx = Context::new(&root);
    let mut stream = Stream::from_bytes(vec![0xD5]);
    let value = bw.parse(&mut stream, &ctx).unwrap();
    let container = value.as_container().unwrap();
    assert_eq!(container.get("high"), Some(Value::Int(-3)));
    assert_eq!(container.get("low"), Some(Value::UInt(5)));

    let mut out = Stream::new();
    bw.build(&value, &mut out, &ctx).unwrap();
    assert_eq!(out.as_bytes(), &[0xD5]);
}

/// `GreedyRange` over fixed-width elements stops cleanly on a trailing
/// partial element, leaving the stream cursor just before it rather than
/// consuming or erroring on the dangling byte.
#[test]
fn greedy_range_stops_cleanly_before_a_trailing_partial_element() {
    let g = GreedyRange::new(Box::new(FormatField::new(Endian::Big, 2, false)));
    let root = Container::new();
    let ctx = Context::new(&root);
    let mut stream = Stream::from_bytes(vec![0, 1, 0, 2, 0, 3, 9]);
    let value = g.parse(&mut stream, &ctx).unwrap();
    let list = value.as_list().unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list.get(0), Some(&Value::UInt(1)));
    assert_eq!(list.get(2), Some(&Value::UInt(3)));
    assert_eq!(stream.tell(), 6);
    assert!(!stream.is_eof());
}

/// A mixed struct of an integer and a float field, round-tripped through
/// parse/build; float comparison tolerates the usual `f32`-widening error.
#[test]
fn struct_with_float_field_round_trips_within_tolerance() {
    let format = Struct::new(vec![
        ("count", u8_field()),
        (
            "average",
            Box::new(dissect::atomic::FloatField {
                endian: Endian::Big,
                width: 4,
            }),
        ),
    ]);

    let root = Container::new();
    let ctx = Context::new(&root);
    let mut stream = Stream::new();
    let mut obj = Container::new();
    obj.insert("count", 3u32);
    obj.insert("average", 2.5f64);
    format.build(&Value::Container(obj), &mut stream, &ctx).unwrap();

    stream.seek(0).unwrap();
    let value = format.parse(&mut stream, &ctx).unwrap();
    let container = value.as_container().unwrap();
    approx::assert_relative_eq!(container.get("average").unwrap().as_float().unwrap(), 2.5f64);
}
