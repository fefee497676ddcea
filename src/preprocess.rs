//! The preprocess engine's top-level entry point.
//!
//! Per-combinator preprocessing logic lives on `Construct::preprocess`
//! itself (each combinator knows how to size and rewrite its own value);
//! `Struct` is the one combinator that implements the full five-step
//! algorithm — recursing into each field, writing offset/size meta, and
//! resolving `Rebuild` fields in a second sibling-aware sweep — since
//! that algorithm only makes sense for an ordered set of named fields.
//! This module is the convenience wrapper most callers actually use:
//! preprocess a value before building it, starting at stream offset 0.

use crate::construct::Construct;
use crate::context::Context;
use crate::error::Result;
use crate::value::Value;

/// Preprocesses `value` against `construct`, starting at offset 0, and
/// returns the rewritten value ready to hand to `Construct::build`.
///
/// This is the normal way to build a value that contains `Rebuild`
/// fields or nested `Pointer`/`Area` targets: preprocess first so every
/// size, offset, and deferred expression is resolved, then build.
pub fn preprocess(construct: &dyn Construct, value: Value, ctx: &Context) -> Result<Value> {
    let (rewritten, _size) = construct.preprocess(value, ctx, 0)?;
    Ok(rewritten)
}

/// Like [`preprocess`], but only the total size is needed.
pub fn preprocess_size(construct: &dyn Construct, value: &Value, ctx: &Context) -> Result<u64> {
    construct.preprocess_size(value, ctx, 0)
}
