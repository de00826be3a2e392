//! Minimal XML element tree and its serializer.
//!
//! The message builder decides element order; the serializer only walks the
//! tree, so whatever order the builder produces is what ends up on the wire.

use crate::error::{xml, Result};
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// SEPA Credit Transfer Initiation namespace, version 09.
pub const PAIN_001_NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pain.001.001.09";

/// Schema file named by `xsi:schemaLocation`.
pub const PAIN_001_SCHEMA_FILE: &str = "pain.001.001.09.xsd";

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// An element with either text content or child elements.
///
/// Text is escaped for `<`, `>` and `&` only; quotes stay literal in text
/// content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: &'static str,
    pub attributes: Vec<(&'static str, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    /// An element with no content yet.
    pub fn new(name: &'static str) -> Self {
        Element {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// A text-only element.
    pub fn leaf(name: &'static str, text: impl Into<String>) -> Self {
        Element {
            text: Some(text.into()),
            ..Element::new(name)
        }
    }

    pub fn attr(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((key, value.into()));
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Appends `child` only when present.
    pub fn child_opt(mut self, child: Option<Element>) -> Self {
        self.children.extend(child);
        self
    }

    pub fn extend<I: IntoIterator<Item = Element>>(mut self, children: I) -> Self {
        self.children.extend(children);
        self
    }

    /// First direct child with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Follows a path of direct-child names.
    pub fn find_path(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |el, name| el.find(name))
    }

    /// Names of direct children, in order.
    pub fn child_names(&self) -> Vec<&'static str> {
        self.children.iter().map(|c| c.name).collect()
    }
}

/// Renders an element tree as a pain.001.001.09 document.
///
/// The default namespace is bound on the root, so every element is
/// unprefixed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serializer {
    schema_location: bool,
}

impl Serializer {
    /// `schema_location` adds `xmlns:xsi` and `xsi:schemaLocation` to the root.
    pub fn new(schema_location: bool) -> Self {
        Serializer { schema_location }
    }

    /// Serializes the whole document into memory.
    pub fn to_bytes(&self, root: &Element) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml)?;

        let mut start = BytesStart::new(root.name);
        start.push_attribute(("xmlns", PAIN_001_NAMESPACE));
        if self.schema_location {
            let location = format!("{} {}", PAIN_001_NAMESPACE, PAIN_001_SCHEMA_FILE);
            start.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
            start.push_attribute(("xsi:schemaLocation", location.as_str()));
        }
        write_element(&mut writer, root, start)?;

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    element: &Element,
    mut start: BytesStart<'_>,
) -> Result<()> {
    for (key, value) in &element.attributes {
        start.push_attribute((*key, value.as_str()));
    }

    match &element.text {
        Some(text) => {
            writer.write_event(Event::Start(start)).map_err(xml)?;
            writer
                .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))
                .map_err(xml)?;
        }
        None if element.children.is_empty() => {
            writer.write_event(Event::Empty(start)).map_err(xml)?;
            return Ok(());
        }
        None => {
            writer.write_event(Event::Start(start)).map_err(xml)?;
            for child in &element.children {
                write_element(writer, child, BytesStart::new(child.name))?;
            }
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name)))
        .map_err(xml)?;
    Ok(())
}
