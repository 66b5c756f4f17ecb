//! # Versioned Document Codecs
//!
//! Translation between external documents and operation lists.
//!
//! The framework owns the XML text layer: [`XmlElement::parse`] turns a document
//! into a small element tree (whitespace, comments and the declaration are
//! dropped) and [`XmlElement::to_xml`] renders one back. A [`DocumentCodec`] only
//! deals with element trees, one codec per [`SchemaVersion`]:
//!
//! - `parse` turns a tree into an ordered list of operations and never touches
//!   the model, so the list can be executed, dry-run or discarded.
//! - `write` renders the `describe` output of the model in the codec's version.
//!
//! The [`CodecRegistry`] selects codecs by version or by document namespace and
//! designates the default writer used for persistence.

use super::error::{FormatError, ManagementResult};
use super::transaction::Operation;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// A `major.minor` schema version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion {
    pub major: u16,
    pub minor: u16,
}

impl SchemaVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for SchemaVersion {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || FormatError::UnknownVersion(s.to_string());
        let (major, minor) = s.split_once('.').ok_or_else(unknown)?;
        Ok(Self {
            major: major.parse().map_err(|_| unknown())?,
            minor: minor.parse().map_err(|_| unknown())?,
        })
    }
}

/// A parsed XML element with its attributes and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The default namespace declared on this element.
    pub fn namespace(&self) -> Option<&str> {
        self.attribute("xmlns")
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, FormatError> {
        let local = start.local_name();
        let name = std::str::from_utf8(local.as_ref())
            .map_err(|e| FormatError::Malformed(e.to_string()))?
            .to_string();
        let mut element = XmlElement::new(name);
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| FormatError::Malformed(e.to_string()))?;
            let key = std::str::from_utf8(attribute.key.as_ref())
                .map_err(|e| FormatError::Malformed(e.to_string()))?
                .to_string();
            let value = attribute.unescape_value()?.into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    /// Reads a whole document into its root element.
    pub fn parse(document: &str) -> Result<XmlElement, FormatError> {
        let mut reader = Reader::from_str(document);
        reader.trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| FormatError::Malformed("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    if !text.trim().is_empty() {
                        return Err(FormatError::Malformed(format!(
                            "unexpected text '{}'",
                            text.trim()
                        )));
                    }
                }
                Event::CData(_) => {
                    return Err(FormatError::Malformed("unexpected CDATA section".into()));
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if !stack.is_empty() {
            return Err(FormatError::Malformed("unclosed element".into()));
        }
        root.ok_or_else(|| FormatError::Malformed("document has no root element".into()))
    }

    /// Renders the element as an indented document.
    pub fn to_xml(&self) -> Result<String, FormatError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| FormatError::Malformed(e.to_string()))
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), FormatError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        let malformed = |e: quick_xml::Error| FormatError::Malformed(e.to_string());
        if self.children.is_empty() {
            writer.write_event(Event::Empty(start)).map_err(malformed)?;
        } else {
            writer.write_event(Event::Start(start)).map_err(malformed)?;
            for child in &self.children {
                child.write_to(writer)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(self.name.as_str())))
                .map_err(malformed)?;
        }
        Ok(())
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), FormatError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_some() {
        return Err(FormatError::Malformed("more than one root element".into()));
    } else {
        *root = Some(element);
    }
    Ok(())
}

/// Parser/writer pair for one schema version.
pub trait DocumentCodec: Send + Sync {
    fn version(&self) -> SchemaVersion;

    fn namespace(&self) -> &str;

    /// Translates a document into operations. Never mutates the model.
    fn parse(&self, root: &XmlElement) -> ManagementResult<Vec<Operation>>;

    /// Renders the `describe` output of the model.
    fn write(&self, description: &[Operation]) -> ManagementResult<XmlElement>;
}

/// Registered codecs, keyed by version.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: BTreeMap<SchemaVersion, Arc<dyn DocumentCodec>>,
    default_writer: Option<SchemaVersion>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("versions", &self.codecs.keys().collect::<Vec<_>>())
            .field("default_writer", &self.default_writer)
            .finish()
    }
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, version: SchemaVersion, codec: Arc<dyn DocumentCodec>) {
        debug!(%version, namespace = codec.namespace(), "Registered document codec");
        self.codecs.insert(version, codec);
    }

    /// Designates the codec used for round-trip persistence.
    pub fn set_default_writer(&mut self, version: SchemaVersion) -> Result<(), FormatError> {
        if !self.codecs.contains_key(&version) {
            return Err(FormatError::UnknownVersion(version.to_string()));
        }
        self.default_writer = Some(version);
        Ok(())
    }

    /// The designated writer, or the newest registered version.
    pub fn default_writer(&self) -> Option<SchemaVersion> {
        self.default_writer
            .or_else(|| self.codecs.keys().next_back().copied())
    }

    pub fn versions(&self) -> Vec<SchemaVersion> {
        self.codecs.keys().copied().collect()
    }

    pub fn get(&self, version: SchemaVersion) -> Result<&Arc<dyn DocumentCodec>, FormatError> {
        self.codecs
            .get(&version)
            .ok_or_else(|| FormatError::UnknownVersion(version.to_string()))
    }

    pub fn for_namespace(&self, namespace: &str) -> Result<&Arc<dyn DocumentCodec>, FormatError> {
        self.codecs
            .values()
            .find(|codec| codec.namespace() == namespace)
            .ok_or_else(|| FormatError::UnknownNamespace(namespace.to_string()))
    }

    /// Parses `document` with the codec for `version`.
    pub fn parse(&self, version: SchemaVersion, document: &str) -> ManagementResult<Vec<Operation>> {
        let codec = self.get(version)?;
        let root = XmlElement::parse(document)?;
        let operations = codec.parse(&root)?;
        info!(%version, operations = operations.len(), "Parsed document");
        Ok(operations)
    }

    /// Parses `document` with the codec its root namespace selects.
    pub fn parse_document(&self, document: &str) -> ManagementResult<(SchemaVersion, Vec<Operation>)> {
        let root = XmlElement::parse(document)?;
        let namespace = root.namespace().unwrap_or_default();
        let codec = self.for_namespace(namespace)?;
        let operations = codec.parse(&root)?;
        info!(version = %codec.version(), operations = operations.len(), "Parsed document");
        Ok((codec.version(), operations))
    }

    /// Renders a model description with the codec for `version`.
    pub fn write(&self, version: SchemaVersion, description: &[Operation]) -> ManagementResult<String> {
        let codec = self.get(version)?;
        let document = codec.write(description)?.to_xml()?;
        info!(%version, "Wrote document");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_element_tree() {
        let root = XmlElement::parse(
            r#"<?xml version="1.0"?>
            <!-- comment -->
            <root xmlns="urn:test:1.0">
                <child a="1"/>
                <child a="2"><leaf/></child>
            </root>"#,
        )
        .unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.namespace(), Some("urn:test:1.0"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].attribute("a"), Some("2"));
        assert_eq!(root.children[1].children[0].name, "leaf");
    }

    #[test]
    fn test_text_content_rejected() {
        let err = XmlElement::parse("<root>hello</root>").unwrap_err();
        assert!(matches!(err, FormatError::Malformed(_)));
    }

    #[test]
    fn test_render_and_reparse() {
        let element = XmlElement::new("root")
            .with_attribute("xmlns", "urn:test:1.0")
            .with_child(XmlElement::new("child").with_attribute("a", "x<y"));
        let text = element.to_xml().unwrap();
        assert_eq!(XmlElement::parse(&text).unwrap(), element);
    }

    #[test]
    fn test_schema_version_parse() {
        let version: SchemaVersion = "1.1".parse().unwrap();
        assert_eq!(version, SchemaVersion::new(1, 1));
        assert!(SchemaVersion::new(1, 0) < version);
        assert!("one".parse::<SchemaVersion>().is_err());
    }
}
