//! Conditional combinators: `If` and `IfThenElse`.

use crate::construct::{BoxedConstruct, Construct};
use crate::context::Context;
use crate::error::Result;
use crate::expr::Expr;
use crate::stream::Stream;
use crate::value::Value;
use crate::xml::Element;

/// Runs `subcon` only when `cond(ctx)` is true; parses/builds
/// `Value::None` otherwise, consuming/writing nothing.
pub struct If {
    pub cond: Expr,
    pub subcon: BoxedConstruct,
}

impl If {
    pub fn new(cond: Expr, subcon: BoxedConstruct) -> Self {
        If { cond, subcon }
    }
}

impl Construct for If {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        if self.cond.eval(ctx)?.as_bool()? {
            self.subcon.parse(stream, ctx)
        } else {
            Ok(Value::None)
        }
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        if self.cond.eval(ctx)?.as_bool()? {
            self.subcon.build(value, stream, ctx)
        } else {
            Ok(())
        }
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        if self.cond.eval(ctx)?.as_bool()? {
            self.subcon.static_sizeof(ctx)
        } else {
            Ok(0)
        }
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        if matches!(value, Value::None) {
            Ok(())
        } else {
            self.subcon.to_element(value, parent, name)
        }
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        if self.cond.eval(ctx)?.as_bool()? {
            self.subcon.from_element(element, ctx, name)
        } else {
            Ok(Value::None)
        }
    }
}

/// Runs `then_subcon` when `cond(ctx)` is true, `else_subcon` otherwise.
///
/// `from_element`/`to_element` re-derive the branch from `cond` and
/// the in-memory value the same way `parse`/`build` do, rather than
/// round-tripping an explicit discriminant through the XML tree — the
/// "rebuild hack" the specification's design notes allude to: so long as
/// `cond` only references fields already present by the time this field
/// is reached, no separate tag is needed to remember which branch an
/// exported document took.
pub struct IfThenElse {
    pub cond: Expr,
    pub then_subcon: BoxedConstruct,
    pub else_subcon: BoxedConstruct,
}

impl IfThenElse {
    pub fn new(cond: Expr, then_subcon: BoxedConstruct, else_subcon: BoxedConstruct) -> Self {
        IfThenElse {
            cond,
            then_subcon,
            else_subcon,
        }
    }

    fn branch(&self, ctx: &Context) -> Result<&BoxedConstruct> {
        Ok(if self.cond.eval(ctx)?.as_bool()? {
            &self.then_subcon
        } else {
            &self.else_subcon
        })
    }
}

impl Construct for IfThenElse {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        self.branch(ctx)?.parse(stream, ctx)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        self.branch(ctx)?.build(value, stream, ctx)
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        self.branch(ctx)?.static_sizeof(ctx)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        // No ctx is available here; try the branch the specification
        // treats as primary (`then`) and fall back to `else` on failure.
        self.then_subcon
            .to_element(value, parent, name)
            .or_else(|_| self.else_subcon.to_element(value, parent, name))
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        self.branch(ctx)?.from_element(element, ctx, name)
    }
}
