//! `FocusedSeq`: parses/builds an ordered sequence of fields (typically
//! side-effecting ones like `Const`/`Padding`) but exposes only one of
//! them as its value.

use crate::construct::{BoxedConstruct, Construct};
use crate::context::{Container, Context};
use crate::error::{Error, Result};
use crate::stream::Stream;
use crate::value::Value;

pub struct FocusedSeq {
    pub fields: Vec<(String, BoxedConstruct)>,
    pub focus: String,
}

impl FocusedSeq {
    pub fn new(fields: Vec<(&str, BoxedConstruct)>, focus: &str) -> Self {
        FocusedSeq {
            fields: fields.into_iter().map(|(n, c)| (n.to_string(), c)).collect(),
            focus: focus.to_string(),
        }
    }
}

impl Construct for FocusedSeq {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let mut container = Container::new();
        for (name, subcon) in &self.fields {
            let child_ctx = ctx.child(&container);
            let value = subcon.parse(stream, &child_ctx)?;
            container.insert(name.clone(), value);
        }
        container
            .get(&self.focus)
            .ok_or_else(|| Error::Context(format!("FocusedSeq: no field named `{}`", self.focus)))
    }

    /// Every non-focus field is built with `Value::None`: they are
    /// expected to be self-sufficient (`Const`, `Padding`, `Computed`),
    /// the same side-effecting role they play in `parse`.
    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let mut container = Container::new();
        container.insert(self.focus.clone(), value.clone());
        let child_ctx = ctx.child(&container);
        for (name, subcon) in &self.fields {
            let field_value = if *name == self.focus { value.clone() } else { Value::None };
            subcon.build(&field_value, stream, &child_ctx)?;
        }
        Ok(())
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        let empty = Container::new();
        let child_ctx = ctx.child(&empty);
        let mut total = 0u64;
        for (_, subcon) in &self.fields {
            total += subcon.static_sizeof(&child_ctx)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::{Const, FormatField};
    use crate::stream::Endian;

    #[test]
    fn focused_seq_exposes_only_the_focus_field() {
        let magic: BoxedConstruct = Box::new(Const::new(
            7u32,
            Box::new(FormatField::new(Endian::Big, 1, false)) as BoxedConstruct,
        ));
        let value_field: BoxedConstruct = Box::new(FormatField::new(Endian::Big, 1, false));
        let seq = FocusedSeq::new(vec![("magic", magic), ("value", value_field)], "value");
        let root = Container::new();
        let ctx = Context::new(&root);
        let mut s = Stream::from_bytes(vec![7, 42]);
        assert_eq!(seq.parse(&mut s, &ctx).unwrap(), Value::UInt(42));

        let mut out = Stream::new();
        seq.build(&Value::UInt(42), &mut out, &ctx).unwrap();
        assert_eq!(out.as_bytes(), &[7, 42]);
    }
}
