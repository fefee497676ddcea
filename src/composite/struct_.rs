//! `Struct`: an ordered record of named fields, each able to see its
//! already-parsed/already-built siblings through the context chain.

use std::any::Any;

use crate::composite::modifiers::Rebuild;
use crate::construct::{BoxedConstruct, Construct};
use crate::context::{Container, Context, Meta};
use crate::error::{Error, Result};
use crate::stream::Stream;
use crate::value::Value;
use crate::xml::Element;

/// An ordered sequence of `(name, subcon)` fields. Parses/builds each
/// field in declaration order, exposing every already-processed sibling
/// (plus its meta aliases) to the next field's expressions.
pub struct Struct {
    pub fields: Vec<(String, BoxedConstruct)>,
}

impl Struct {
    pub fn new(fields: Vec<(&str, BoxedConstruct)>) -> Self {
        Struct {
            fields: fields.into_iter().map(|(n, c)| (n.to_string(), c)).collect(),
        }
    }

    fn field(&self, name: &str) -> Option<&BoxedConstruct> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}

impl Construct for Struct {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn parse(&self, stream: &mut Stream, ctx: &Context) -> Result<Value> {
        let mut container = Container::new();
        for (name, subcon) in &self.fields {
            let start = stream.tell();
            let value = {
                let child_ctx = ctx.child(&container);
                subcon.parse(stream, &child_ctx)?
            };
            let end = stream.tell();
            container.insert(name.clone(), value);
            container.set_meta(name.clone(), Meta::span(start, end - start));
        }
        Ok(Value::Container(container))
    }

    fn build(&self, value: &Value, stream: &mut Stream, ctx: &Context) -> Result<()> {
        let container = value.as_container()?;
        let child_ctx = ctx.child(container);
        for (name, subcon) in &self.fields {
            let field_value = container
                .get(name)
                .ok_or_else(|| Error::Context(format!("missing field `{name}` to build")))?;
            subcon.build(&field_value, stream, &child_ctx)?;
        }
        Ok(())
    }

    /// Implements the five-step algorithm: recursively preprocess each
    /// field, write its offset/size meta, then resolve every `Rebuild`
    /// field in a second sweep. A `Rebuild` is never inserted into the
    /// container during the first pass (only its meta is written), so a
    /// deferred field whose expression reaches another deferred field can't
    /// simply be resolved in declaration order — `b = Rebuild(this.c)`
    /// declared after `a = Rebuild(this.b)` would still be unresolved when
    /// `a` runs. Instead this resolves by repeated passes over whatever
    /// remains unresolved, inserting each success immediately so later
    /// passes (or even the same pass, for a field later in the list) can
    /// see it; a pass that resolves nothing means a cyclic or otherwise
    /// unsatisfiable dependency.
    fn preprocess(&self, value: Value, ctx: &Context, offset: u64) -> Result<(Value, u64)> {
        let mut container = match value {
            Value::Container(c) => c,
            other => return Err(Error::Format(format!("expected a struct, found {}", other.kind()))),
        };
        let mut running = offset;
        let mut deferred: Vec<String> = Vec::new();

        for (name, subcon) in &self.fields {
            if let Some(rebuild) = (**subcon).as_any().downcast_ref::<Rebuild>() {
                let child_ctx = ctx.child(&container);
                let size = rebuild.subcon.static_sizeof(&child_ctx).unwrap_or(0);
                // Strip any user-supplied placeholder so a sibling Rebuild
                // referencing this field genuinely fails to resolve until
                // the deferred sweep below fills it in for real.
                container.remove(name);
                container.set_meta(name.clone(), Meta::span(running, size));
                running += size;
                deferred.push(name.clone());
                continue;
            }

            let field_value = container.get(name).unwrap_or(Value::None);
            let (new_value, size, full_size) = {
                let child_ctx = ctx.child(&container);
                let (new_value, size) = subcon.preprocess(field_value, &child_ctx, running)?;
                let full_size = subcon.full_sizeof(&new_value, &child_ctx).unwrap_or(size);
                (new_value, size, full_size)
            };
            container.insert(name.clone(), new_value);
            let mut meta = Meta::span(running, size);
            if full_size > size {
                meta.ptr_size = Some(full_size - size);
            }
            container.set_meta(name.clone(), meta);
            running += size;
        }

        let mut remaining = deferred;
        while !remaining.is_empty() {
            let mut next_round = Vec::new();
            let mut progressed = false;
            for name in remaining {
                let outcome = {
                    let child_ctx = ctx.child(&container);
                    let subcon = self
                        .field(&name)
                        .expect("deferred field name was collected from self.fields");
                    let rebuild = (**subcon)
                        .as_any()
                        .downcast_ref::<Rebuild>()
                        .expect("deferred field was checked to be a Rebuild above");
                    rebuild.expr.eval(&child_ctx)
                };
                match outcome {
                    Ok(resolved) => {
                        container.insert(name, resolved);
                        progressed = true;
                    }
                    Err(_) => next_round.push(name),
                }
            }
            if !progressed {
                return Err(Error::Context(format!(
                    "cannot resolve Rebuild field(s) `{}`: cyclic or unsatisfiable dependency",
                    next_round.join("`, `")
                )));
            }
            remaining = next_round;
        }

        Ok((Value::Container(container), running - offset))
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

    fn sizeof(&self, value: &Value, ctx: &Context) -> Result<u64> {
        let container = value.as_container()?;
        let child_ctx = ctx.child(container);
        let mut total = 0u64;
        for (name, subcon) in &self.fields {
            let field_value = container.get(name).unwrap_or(Value::None);
            total += subcon.sizeof(&field_value, &child_ctx)?;
        }
        Ok(total)
    }

    fn to_element(&self, value: &Value, parent: &mut Element, name: &str) -> Result<()> {
        let container = value.as_container()?;
        let mut element = Element::new(name);
        for (field_name, subcon) in &self.fields {
            let field_value = container
                .get(field_name)
                .ok_or_else(|| Error::Xml(format!("missing field `{field_name}` to export")))?;
            subcon.to_element(&field_value, &mut element, field_name)?;
        }
        parent.add_child(element);
        Ok(())
    }

    fn from_element(&self, element: &Element, ctx: &Context, name: &str) -> Result<Value> {
        let child_element = element.require_child(name)?;
        let mut container = Container::new();
        for (field_name, subcon) in &self.fields {
            let child_ctx = ctx.child(&container);
            let value = subcon.from_element(child_element, &child_ctx, field_name)?;
            container.insert(field_name.clone(), value);
        }
        Ok(Value::Container(container))
    }
}
