//! The lazy path/arithmetic language used inside format descriptions.
//!
//! Every combinator parameter that can be "dynamic" (an array length, a
//! pointer offset, a switch key, a rebuild value) is an [`Expr`] rather
//! than a bare value. `Expr` is deliberately a tagged AST (`Literal`,
//! `Path`, `BinOp`, `Unary`, `Call`) instead of the duck-typed callables
//! the specification's source lineage uses, per the re-architecture note
//! in §9 of the specification.

use std::fmt;
use std::rc::Rc;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::value::Value;

/// A dotted/indexed path through a context, e.g. `this.a.b`, `this._.c`,
/// `this._root.d`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path(pub Vec<Segment>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `_`: one step toward the enclosing context.
    Parent,
    /// `_root`: jump straight to the topmost context.
    Root,
    /// A named field of the current container.
    Field(String),
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|s| match s {
                Segment::Parent => "_".to_string(),
                Segment::Root => "_root".to_string(),
                Segment::Field(name) => name.clone(),
            })
            .collect();
        write!(f, "this.{}", rendered.join("."))
    }
}

/// A comparison/arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// The expression AST. Build with [`This`] for path expressions, or
/// [`Expr::lambda`] to wrap an arbitrary user closure.
#[derive(Clone)]
pub enum Expr {
    /// A constant value, independent of the context.
    Literal(Value),
    /// A path lookup, e.g. `this.width`.
    Path(Path),
    BinOp(Op, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    /// A user-supplied lambda `Fn(&Context) -> Result<Value>`, for
    /// anything the path/arithmetic sublanguage can't express.
    Lambda(Rc<dyn Fn(&Context) -> Result<Value>>),
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "Literal({v:?})"),
            Expr::Path(p) => write!(f, "Path({p})"),
            Expr::BinOp(op, a, b) => write!(f, "BinOp({op:?}, {a:?}, {b:?})"),
            Expr::Neg(e) => write!(f, "Neg({e:?})"),
            Expr::Not(e) => write!(f, "Not({e:?})"),
            Expr::Lambda(_) => write!(f, "Lambda(..)"),
        }
    }
}

impl Expr {
    /// Wraps a constant.
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Wraps a user lambda.
    pub fn lambda<F>(f: F) -> Self
    where
        F: Fn(&Context) -> Result<Value> + 'static,
    {
        Expr::Lambda(Rc::new(f))
    }

    /// Evaluates this expression against a context.
    pub fn eval(&self, ctx: &Context) -> Result<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Path(path) => eval_path(path, ctx),
            Expr::BinOp(op, a, b) => eval_binop(*op, &a.eval(ctx)?, &b.eval(ctx)?),
            Expr::Neg(e) => {
                let v = e.eval(ctx)?;
                match v {
                    Value::Float(f) => Ok(Value::Float(-f)),
                    _ => Ok(Value::Int(-v.as_int()?)),
                }
            }
            Expr::Not(e) => Ok(Value::Bool(!e.eval(ctx)?.as_bool()?)),
            Expr::Lambda(f) => f(ctx),
        }
    }

    /// Convenience: evaluate and coerce to `usize`, the common case for
    /// array counts, byte lengths, and stream offsets.
    pub fn eval_usize(&self, ctx: &Context) -> Result<usize> {
        self.eval(ctx)?.as_usize()
    }

    fn binop(self, op: Op, rhs: Expr) -> Expr {
        Expr::BinOp(op, Box::new(self), Box::new(rhs))
    }

    pub fn add(self, rhs: Expr) -> Expr {
        self.binop(Op::Add, rhs)
    }
    pub fn sub(self, rhs: Expr) -> Expr {
        self.binop(Op::Sub, rhs)
    }
    pub fn mul(self, rhs: Expr) -> Expr {
        self.binop(Op::Mul, rhs)
    }
    pub fn div(self, rhs: Expr) -> Expr {
        self.binop(Op::Div, rhs)
    }
    pub fn rem(self, rhs: Expr) -> Expr {
        self.binop(Op::Mod, rhs)
    }
    pub fn eq(self, rhs: Expr) -> Expr {
        self.binop(Op::Eq, rhs)
    }
    pub fn ne(self, rhs: Expr) -> Expr {
        self.binop(Op::Ne, rhs)
    }
    pub fn lt(self, rhs: Expr) -> Expr {
        self.binop(Op::Lt, rhs)
    }
    pub fn le(self, rhs: Expr) -> Expr {
        self.binop(Op::Le, rhs)
    }
    pub fn gt(self, rhs: Expr) -> Expr {
        self.binop(Op::Gt, rhs)
    }
    pub fn ge(self, rhs: Expr) -> Expr {
        self.binop(Op::Ge, rhs)
    }
    pub fn and(self, rhs: Expr) -> Expr {
        self.binop(Op::And, rhs)
    }
    pub fn or(self, rhs: Expr) -> Expr {
        self.binop(Op::Or, rhs)
    }
    pub fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    /// Builds a field-access path extending this expression, which must
    /// itself be a `Path`. Panics if called on a non-path expression —
    /// mirrors how `this.a.b` only makes sense built from `This`.
    pub fn field(&self, name: &str) -> Expr {
        match self {
            Expr::Path(Path(segments)) => {
                let mut segments = segments.clone();
                segments.push(Segment::Field(name.to_string()));
                Expr::Path(Path(segments))
            }
            _ => panic!("field() can only extend a path expression built from `this`"),
        }
    }
}

fn eval_path(path: &Path, ctx: &Context) -> Result<Value> {
    let mut cur = *ctx;
    let mut owned: Option<Value> = None;
    for segment in &path.0 {
        match segment {
            Segment::Parent => {
                cur = *cur
                    .parent()
                    .ok_or_else(|| Error::Context(format!("{path}: no parent context")))?;
            }
            Segment::Root => {
                cur = *cur.root();
            }
            Segment::Field(name) => {
                let next = if let Some(value) = &owned {
                    // Already descended into a nested struct value (e.g.
                    // `this.a.b` where `a` is itself a struct); keep
                    // stepping through it rather than through `cur`.
                    let container = value.as_container().map_err(|_| {
                        Error::Context(format!("{path}: `{name}` is not a field of a struct"))
                    })?;
                    container.get(name)
                } else {
                    cur.get(name)
                };
                owned = Some(
                    next.ok_or_else(|| Error::Context(format!("{path}: no field named `{name}`")))?,
                );
            }
        }
    }
    owned.ok_or_else(|| Error::Context(format!("{path}: empty path")))
}

fn eval_binop(op: Op, a: &Value, b: &Value) -> Result<Value> {
    use Op::*;
    match op {
        Add | Sub | Mul | Div | Mod => {
            if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
                let (x, y) = (a.as_float()?, b.as_float()?);
                Ok(Value::Float(match op {
                    Add => x + y,
                    Sub => x - y,
                    Mul => x * y,
                    Div => x / y,
                    Mod => x % y,
                    _ => unreachable!(),
                }))
            } else {
                let (x, y) = (a.as_int()?, b.as_int()?);
                Ok(Value::Int(match op {
                    Add => x + y,
                    Sub => x - y,
                    Mul => x * y,
                    Div => x.checked_div(y).ok_or_else(|| {
                        Error::Explicit("division by zero in expression".into())
                    })?,
                    Mod => x.checked_rem(y).ok_or_else(|| {
                        Error::Explicit("modulo by zero in expression".into())
                    })?,
                    _ => unreachable!(),
                }))
            }
        }
        Eq => Ok(Value::Bool(values_equal(a, b)?)),
        Ne => Ok(Value::Bool(!values_equal(a, b)?)),
        Lt | Le | Gt | Ge => {
            let ordering = if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
                a.as_float()?.partial_cmp(&b.as_float()?)
            } else {
                a.as_int()?.partial_cmp(&b.as_int()?)
            };
            let ordering = ordering
                .ok_or_else(|| Error::Format("cannot compare NaN".to_string()))?;
            use std::cmp::Ordering::*;
            Ok(Value::Bool(match (op, ordering) {
                (Lt, Less) | (Le, Less | Equal) | (Gt, Greater) | (Ge, Greater | Equal) => true,
                _ => false,
            }))
        }
        And => Ok(Value::Bool(a.as_bool()? && b.as_bool()?)),
        Or => Ok(Value::Bool(a.as_bool()? || b.as_bool()?)),
    }
}

fn values_equal(a: &Value, b: &Value) -> Result<bool> {
    Ok(a == b)
}

/// Ergonomic builder for path expressions, the `this` of the
/// specification. `This.field("width")` yields an `Expr::Path` rooted at
/// the field `width` of the context `eval` is called against.
#[derive(Debug, Clone, Copy)]
pub struct This;

impl This {
    pub fn field(self, name: &str) -> Expr {
        Expr::Path(Path(vec![Segment::Field(name.to_string())]))
    }

    pub fn parent(self) -> Expr {
        Expr::Path(Path(vec![Segment::Parent]))
    }

    pub fn root(self) -> Expr {
        Expr::Path(Path(vec![Segment::Root]))
    }
}

/// Singleton used to start path expressions: `this.field("width")`.
pub const THIS: This = This;

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

macro_rules! expr_from_scalar {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Expr {
            fn from(v: $ty) -> Self {
                Expr::Literal(v.into())
            }
        })*
    };
}
expr_from_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, bool, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Container;

    #[test]
    fn arithmetic_over_fields() {
        let mut c = Container::new();
        c.insert("width", 3u32);
        c.insert("height", 2u32);
        let ctx = Context::new(&c);
        let expr = THIS.field("width").mul(THIS.field("height"));
        assert_eq!(expr.eval_usize(&ctx).unwrap(), 6);
    }

    #[test]
    fn parent_and_root() {
        let mut root_c = Container::new();
        root_c.insert("magic", 42u32);
        let root_ctx = Context::new(&root_c);

        let mut mid_c = Container::new();
        mid_c.insert("size", 10u32);
        let mid_ctx = root_ctx.child(&mid_c);

        let leaf_c = Container::new();
        let leaf_ctx = mid_ctx.child(&leaf_c);

        assert_eq!(
            THIS.parent().field("size").eval(&leaf_ctx).unwrap(),
            Value::UInt(10)
        );
        assert_eq!(
            THIS.root().field("magic").eval(&leaf_ctx).unwrap(),
            Value::UInt(42)
        );
    }

    #[test]
    fn missing_path_is_context_error() {
        let c = Container::new();
        let ctx = Context::new(&c);
        let err = THIS.field("nope").eval(&ctx).unwrap_err();
        assert!(matches!(err, Error::Context(_)));
    }
}
