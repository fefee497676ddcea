//! `Switch`: dispatches to one of several named cases by an evaluated
//! key, falling back to a default branch.

use crate::construct::{BoxedConstruct, Construct};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::stream::Stream;
use crate::value::Value;
use crate::xml::{switch_id_key, Element};

fn label_of(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Evaluates `key(ctx)` and parses/builds whichever case's key equals
/// it, or `default` if none match (an unmatched key with no default is
/// `Error::Switch`).
pub struct Switch {
    pub key: Expr,
    pub cases: Vec<(Value, BoxedConstruct)>,
    pub default: Option<BoxedConstruct>,
}

impl Switch {
    pub fn new(key: Expr, cases: Vec<(Value, BoxedConstruct)>, default: Option<BoxedConstruct>) -> Self {
        Switch { key, cases, default }
    }

    fn case_for<'a>(&'a self, key: &Value) -> Option<&'a BoxedConstruct> {
        self.cases
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, subcon)| subcon)
            .or(self.default.as_ref())
    }
}

impl Construct for Switch {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let key = self.key.eval(ctx)?;
        let subcon = self
            .case_for(&key)
            .ok_or_else(|| Error::Switch(format!("no case matches key {key} and no default given")))?;
        subcon.parse(stream, ctx)
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let key = self.key.eval(ctx)?;
        let subcon = self
            .case_for(&key)
            .ok_or_else(|| Error::Switch(format!("no case matches key {key} and no default given")))?;
        subcon.build(value, stream, ctx)
    }

    fn static_sizeof(&self, ctx: &Context) -> Result<u64> {
        let key = self.key.eval(ctx)?;
        let subcon = self
            .case_for(&key)
            .ok_or_else(|| Error::Switch(format!("no case matches key {key} and no default given")))?;
        subcon.static_sizeof(ctx)
    }

    /// Exports the matching case as a child tagged with the case's own
    /// label rather than `name` — the case-name child tag convention —
    /// trying each case's `to_element` against a scratch element since
    /// this method has no context to re-evaluate `key` against.
    fn to_element(&self, value: &Value, parent: &mut Element, _name: &str) -> Result<()> {
        for (key, subcon) in &self.cases {
            let mut probe = Element::new("_probe");
            if subcon.to_element(value, &mut probe, &label_of(key)).is_ok() {
                for (k, v) in probe.attributes() {
                    parent.set_attribute(k, v);
                }
                for child in probe.children() {
                    parent.add_child(child.clone());
                }
                return Ok(());
            }
        }
        if let Some(subcon) = &self.default {
            return subcon.to_element(value, parent, "default");
        }
        Err(Error::Xml("Switch: no case matched value for export".into()))
    }

    /// Resolves `key(ctx)` to pick the same case `from_element` reads,
    /// and records it under `_switchid_<name>` on a returned `Container`
    /// so a sibling `Rebuild` can recover the discriminant even though
    /// the case's own key is not itself present as an XML attribute.
    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        let key = self.key.eval(ctx)?;
        let subcon = self
            .case_for(&key)
            .ok_or_else(|| Error::Switch(format!("no case matches key {key} and no default given")))?;
        let resolved = subcon.from_element(element, ctx, &label_of(&key))?;
        Ok(match resolved {
            Value::Container(mut c) => {
                c.insert(switch_id_key(name), key);
                Value::Container(c)
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::FormatField;
    use crate::context::Container;
    use crate::expr::THIS;
    use crate::stream::Endian;

    fn u8_field() -> BoxedConstruct {
        Box::new(FormatField::new(Endian::Big, 1, false))
    }

    #[test]
    fn switch_dispatches_by_key() {
        let s = Switch::new(
            THIS.field("kind"),
            vec![(Value::from(1u32), u8_field()), (Value::from(2u32), u8_field())],
            None,
        );
        let mut root = Container::new();
        root.insert("kind", 2u32);
        let ctx = Context::new(&root);
        let mut stream = Stream::from_bytes(vec![42]);
        assert_eq!(s.parse(&mut stream, &ctx).unwrap(), Value::UInt(42));
    }

    #[test]
    fn switch_errors_without_matching_case_or_default() {
        let s = Switch::new(THIS.field("kind"), vec![(Value::from(1u32), u8_field())], None);
        let mut root = Container::new();
        root.insert("kind", 9u32);
        let ctx = Context::new(&root);
        let mut stream = Stream::from_bytes(vec![42]);
        assert!(matches!(s.parse(&mut stream, &ctx), Err(Error::Switch(_))));
    }
}
