//! The polymorphic contract every combinator implements.

use std::any::Any;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::stream::Stream;
use crate::value::Value;
use crate::xml::Element;

/// A boxed, type-erased combinator. Composite combinators (`Struct`,
/// `Array`, ...) hold their children behind this alias so a description
/// tree can mix arbitrarily many concrete combinator types.
pub type BoxedConstruct = Box<dyn Construct>;

/// The contract every combinator in a format description implements:
/// parse, build, preprocess, four size views, and the XML bridge.
///
/// Four distinct size views exist because: `static_sizeof` answers
/// without a value (fixed-format use), `sizeof` answers for an actual
/// value post-parse, `full_sizeof` includes pointed-to regions, and
/// `expected_sizeof` peeks a length prefix without consuming the body.
/// Each has a sensible default in terms of the others (the "falls back
/// to" rule from the specification's rationale), so a new combinator
/// only needs to override the views where its behavior actually differs.
///
/// `Construct: Any` lets `Struct::preprocess` recognize a `Rebuild` child
/// by downcasting `&dyn Construct`, which is how it defers that field's
/// evaluation to the second, sibling-aware sweep described in §4.6
/// without `Rebuild` needing any bespoke trait of its own.
pub trait Construct: Any {
    /// Parses a value from `stream`, consuming as many bytes/bits as the
    /// combinator needs, and evaluating any dynamic parameters against
    /// `ctx`.
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value>;

    /// Builds `value` onto the end of `stream`.
    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()>;

    /// Preprocesses `value` for building: computes its size, optionally
    /// rewrites it (e.g. a `Struct` filling in its children's meta), and
    /// returns the rewritten value alongside its size. `offset` is the
    /// stream position this value would occupy once built.
    ///
    /// The default falls back to `sizeof` and returns `value` unchanged —
    /// correct for every combinator that neither carries nested meta nor
    /// resolves deferred expressions.
    fn preprocess(&self, value: Value, ctx: &Context, offset: u64) -> Result<(Value, u64)> {
        let size = self.sizeof(&value, ctx)?;
        Ok((value, size))
    }

    /// Like `preprocess`, but only the size is needed; skips rewriting
    /// the value. The default simply discards the rewritten value from
    /// `preprocess` — combinators for which computing the size is
    /// materially cheaper than a full rewrite should override this.
    fn preprocess_size(&self, value: &Value, ctx: &Context, offset: u64) -> Result<u64> {
        let (_, size) = self.preprocess(value.clone(), ctx, offset)?;
        Ok(size)
    }

    /// The size in bytes this combinator occupies independent of any
    /// particular value, or `Error::UnknownSize` if that's not knowable
    /// (e.g. a `GreedyRange` or a `Rebuild` over a variable-width field).
    /// `Error::UnknownSize` is a non-fatal signal when the caller is only
    /// probing; it becomes fatal only if a consumer insists on a static
    /// answer.
    fn static_sizeof(&self, _ctx: &Context) -> Result<u64> {
        Err(Error::UnknownSize)
    }

    /// The size in bytes `value` would occupy when built. Defaults to
    /// `static_sizeof`, correct for every fixed-size combinator.
    fn sizeof(&self, _value: &Value, ctx: &Context) -> Result<u64> {
        self.static_sizeof(ctx)
    }

    /// The size in bytes including any regions reached via pointers.
    /// Defaults to `sizeof`, correct for every combinator that doesn't
    /// itself own a `Pointer`/`Area`.
    fn full_sizeof(&self, value: &Value, ctx: &Context) -> Result<u64> {
        self.sizeof(value, ctx)
    }

    /// The size consumed by a non-destructive, length-prefix-only
    /// inspection of `stream` (used by lazily-sized readers). Defaults to
    /// `static_sizeof`, correct for every combinator without a prefix.
    fn expected_sizeof(&self, _stream: &mut Stream, ctx: &Context) -> Result<u64> {
        self.static_sizeof(ctx)
    }

    /// Appends this value as a fragment of `parent` named `name` (an
    /// attribute for atomic values, a child element for composites).
    /// Unsupported by default; overridden by every combinator the XML
    /// bridge (§4.7) names.
    fn to_element(&self, _value: &Value, _parent: &mut Element, _name: &str) -> Result<()> {
        Err(Error::Xml(format!(
            "construct does not support XML export for field `{_name}`"
        )))
    }

    /// Reads a value for field `name` out of `element`. Unsupported by
    /// default; overridden by every combinator the XML bridge names.
    fn from_element(&self, _element: &Element, _ctx: &Context, _name: &str) -> Result<Value> {
        Err(Error::Xml(format!(
            "construct does not support XML import for field `{_name}`"
        )))
    }

    /// Type-erased downcast hook, used by `Struct::preprocess` to
    /// recognize a `Rebuild` child without a bespoke marker trait.
    fn as_any(&self) -> &dyn Any;
}

impl Construct for BoxedConstruct {
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        (**self).parse(stream, ctx)
    }
    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        (**self).build(value, stream, ctx)
    }
    fn preprocess(&self, value: Value, ctx: &Context, offset: u64) -> Result<(Value, u64)> {
        (**self).preprocess(value, ctx, offset)
    }
    fn preprocess_size(&self, value: &Value, ctx: &Context, offset: u64) -> Result<u64> {
        (**self).preprocess_size(value, ctx, offset)
    }
    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        (**self).static_sizeof(ctx)
    }
    fn sizeof(&self, value: &Value, ctx: &Context) -> Result<u64> {
        (**self).sizeof(value, ctx)
    }
    fn full_sizeof(&self, value: &Value, ctx: &Context) -> Result<u64> {
        (**self).full_sizeof(value, ctx)
    }
    fn expected_sizeof(&self, stream: &mut Stream, ctx: &Context) -> Result<u64> {
        (**self).expected_sizeof(stream, ctx)
    }
    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        (**self).to_element(value, parent, name)
    }
    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        (**self).from_element(element, ctx, name)
    }
    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }
}
