//! Owned XML subtrees
//!
//! A deliberately small element tree: enough to carry a placemark from a
//! source document into the merged document without interpreting it.

use crate::domain::qname::{declared_prefix, split_qname, KML_NAMESPACE};

/// Namespace binding: `(prefix, uri)`, `None` prefix is the default namespace.
pub type Binding = (Option<String>, String);

/// Child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

/// Element with its raw tag name, attributes in document order and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn push_child(&mut self, node: XmlNode) {
        self.children.push(node);
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Tag prefix, if the raw name is prefixed.
    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Namespace bindings declared on this element itself.
    pub fn declarations(&self) -> Vec<Binding> {
        self.attributes
            .iter()
            .filter_map(|(key, value)| {
                declared_prefix(key).map(|prefix| (prefix.map(str::to_string), value.clone()))
            })
            .collect()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of this element's direct text and CDATA children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(t) | XmlNode::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// A `Placemark` subtree detached from its source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placemark(Element);

impl Placemark {
    /// Detach `element` from its source, re-declaring the namespace bindings it
    /// inherited from its ancestors.
    ///
    /// The default KML namespace is not re-declared: the merged root already
    /// binds it. A prefixed placemark whose source had no default namespace
    /// gets `xmlns=""` so its unprefixed descendants stay namespace-less.
    pub fn rehome(mut element: Element, inherited: &[Binding]) -> Self {
        let own: Vec<Option<String>> = element
            .declarations()
            .into_iter()
            .map(|(prefix, _)| prefix)
            .collect();

        let mut added = Vec::new();
        for (prefix, uri) in inherited {
            if own.contains(prefix) {
                continue;
            }
            match prefix {
                None if uri == KML_NAMESPACE => {}
                None => added.push(("xmlns".to_string(), uri.clone())),
                Some(p) => added.push((format!("xmlns:{p}"), uri.clone())),
            }
        }

        let has_default = own.contains(&None) || inherited.iter().any(|(p, _)| p.is_none());
        if !has_default && element.prefix().is_some() {
            added.push(("xmlns".to_string(), String::new()));
        }

        if !added.is_empty() {
            added.append(&mut element.attributes);
            element.attributes = added;
        }
        Self(element)
    }

    pub fn element(&self) -> &Element {
        &self.0
    }

    pub fn into_element(self) -> Element {
        self.0
    }

    /// Text of the first `name` child, if any.
    pub fn name(&self) -> Option<String> {
        self.0
            .child_elements()
            .find(|e| e.local_name() == "name")
            .map(Element::text)
    }
}
