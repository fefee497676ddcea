//! The XML bridge: a minimal in-memory element tree plus the
//! to_element/from_element conventions combinators use against it.
//!
//! The textual XML representation (turning this tree into/from an XML
//! document) is an external collaborator per the specification; this
//! module only provides the tree itself — "a minimal API for element
//! creation, attribute get/set, child iteration, and tag-name access" —
//! and the traversal conventions (`Switch`'s case-name child tag,
//! homogeneous-array CSV attributes, the `IfThenElse` rebuild hack).

use crate::construct::Construct;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::value::Value;

/// An in-memory XML-like element: a tag, an ordered attribute list, and
/// ordered children. No text lexer/writer is attached — this is the tree
/// `to_element`/`from_element` produce and consume directly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.attributes.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.attributes.push((key, value));
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn require_attribute(&self, key: &str) -> Result<&str> {
        self.get_attribute(key)
            .ok_or_else(|| Error::Xml(format!("missing attribute `{key}` on <{}>", self.tag)))
    }

    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }

    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn require_child(&self, tag: &str) -> Result<&Element> {
        self.child(tag)
            .ok_or_else(|| Error::Xml(format!("missing child <{tag}> of <{}>", self.tag)))
    }
}

/// Encodes a homogeneous list of scalars as the CSV-bracketed attribute
/// value form the specification names: `[1,2,3]`.
pub fn encode_csv_array<I: IntoIterator<Item = String>>(items: I) -> String {
    let joined: Vec<String> = items.into_iter().collect();
    format!("[{}]", joined.join(","))
}

/// Decodes a `[1,2,3]`-style attribute value back into its comma
/// separated fields. Empty brackets decode to an empty list.
pub fn decode_csv_array(text: &str) -> Result<Vec<String>> {
    let inner = text
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| Error::Xml(format!("expected a `[..]` array attribute, found `{text}`")))?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(',').map(|s| s.trim().to_string()).collect())
}

/// The context key convention `Switch`'s `from_element` uses to record
/// the case it dispatched to, so an enclosing `Rebuild` can recover the
/// discriminant that selected it (the key field is usually not itself
/// present in the XML once a case has been chosen).
pub fn switch_id_key(field: &str) -> String {
    format!("_switchid_{field}")
}

/// Exports `value` as a root `Element` named `name` — `construct`'s
/// `to_element` appends a fragment to a parent, so this wraps a
/// throwaway parent and takes the one child it produced.
pub fn to_root_element(construct: &dyn Construct, value: &Value, name: &str) -> Result<Element> {
    let mut wrapper = Element::new("__root__");
    construct.to_element(value, &mut wrapper, name)?;
    wrapper
        .children
        .into_iter()
        .next()
        .ok_or_else(|| Error::Xml("to_element produced no root element".into()))
}

/// The inverse of [`to_root_element`]: wraps `root` as the sole child of
/// a throwaway parent so `construct`'s `from_element(parent, ctx, name)`
/// contract applies uniformly at the top level too.
pub fn from_root_element(
    construct: &dyn Construct,
    root: &Element,
    ctx: &Context,
    name: &str,
) -> Result<Value> {
    let mut wrapper = Element::new("__root__");
    wrapper.add_child(root.clone());
    construct.from_element(&wrapper, ctx, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_array_roundtrip() {
        let encoded = encode_csv_array(vec!["1".into(), "2".into(), "3".into()]);
        assert_eq!(encoded, "[1,2,3]");
        assert_eq!(decode_csv_array(&encoded).unwrap(), vec!["1", "2", "3"]);
    }

    #[test]
    fn empty_csv_array() {
        assert_eq!(decode_csv_array("[]").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn attribute_get_set() {
        let mut e = Element::new("Foo");
        e.set_attribute("width", "3");
        assert_eq!(e.get_attribute("width"), Some("3"));
        e.set_attribute("width", "4");
        assert_eq!(e.get_attribute("width"), Some("4"));
    }
}
