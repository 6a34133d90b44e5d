//! Minimal XML element tree for OpenPnP package files.
//!
//! Packages files written by OpenPnP carry more than this tool generates
//! (nozzle tips, vision settings, ...). `--join` must keep all of it, so
//! existing files are read into a generic tree rather than typed structs.

use std::path::{Path, PathBuf};

use quick_xml::escape::unescape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Root element of an OpenPnP packages file.
pub const PACKAGES_ROOT: &str = "openpnp-packages";
/// Element holding one package.
pub const PACKAGE_ELEMENT: &str = "package";

const INDENT_WIDTH: usize = 2;

/// Errors raised while reading XML.
#[derive(Error, Debug)]
pub enum XmlError {
    /// The file could not be read.
    #[error("failed to read packages file: {path}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed.
    #[error("malformed XML: {message}")]
    Parse {
        /// Description of the problem.
        message: String,
    },

    /// The document could not be written.
    #[error("failed to write XML")]
    Write {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The document root is not the expected element.
    #[error("expected <{expected}> root element, found <{found}>")]
    InvalidRoot {
        /// Required root name.
        expected: &'static str,
        /// Actual root name.
        found: String,
    },
}

impl XmlError {
    fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    /// Everything on one line.
    #[default]
    Compact,
    /// One element per line, two spaces per level, empty elements closed
    /// with `/>` as OpenPnP writes them.
    Indented,
    /// Indented, with empty elements closed by ` />`.
    Pretty,
}

impl Style {
    /// Footprint mode: compact unless `pretty` is set.
    #[must_use]
    pub const fn footprint(pretty: bool) -> Self {
        if pretty {
            Self::Pretty
        } else {
            Self::Compact
        }
    }

    /// Board mode: always indented, so the output can be pasted into a
    /// packages file as is.
    #[must_use]
    pub const fn board(pretty: bool) -> Self {
        if pretty {
            Self::Pretty
        } else {
            Self::Indented
        }
    }
}

/// Child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data, unescaped.
    Text(String),
}

/// An XML element with ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order, values unescaped.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attribute`].
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Sets an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Value of an attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Appends a child element.
    pub fn push(&mut self, child: Self) {
        self.children.push(Node::Element(child));
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Child elements with the given name.
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> {
        self.elements().filter(move |e| e.name == name)
    }

    /// Serialises the element. No XML declaration is written.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Write`] if the writer fails.
    pub fn to_xml(&self, style: Style) -> Result<String, XmlError> {
        let mut writer = match style {
            Style::Compact => Writer::new(Vec::new()),
            Style::Indented | Style::Pretty => Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH),
        };
        self.write_to(&mut writer)
            .map_err(|source| XmlError::Write { source })?;

        let out = String::from_utf8_lossy(&writer.into_inner()).into_owned();
        // '>' is escaped in attribute values and text, so "/>" only closes
        // empty elements.
        Ok(match style {
            Style::Pretty => out.replace("/>", " />"),
            Style::Compact | Style::Indented => out,
        })
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> std::io::Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return writer.write_event(Event::Empty(start));
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_to(writer)?,
                Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))
    }
}

fn start_element(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::parse(e.to_string()))?;
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw).map_err(|e| XmlError::parse(e.to_string()))?;
        element.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(element)
}

/// Text collected between markup, flushed as one node so entity
/// references do not split it.
#[derive(Default)]
struct PendingText(String);

impl PendingText {
    fn flush_into(&mut self, element: &mut Element) {
        let text = std::mem::take(&mut self.0);
        // Formatting whitespace between elements is not content.
        if !text.trim().is_empty() {
            element.children.push(Node::Text(text));
        }
    }
}

/// Parses a document and returns its root element.
///
/// Declarations, comments and processing instructions are dropped.
///
/// # Errors
///
/// Returns [`XmlError::Parse`] for malformed documents.
pub fn parse_document(text: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut pending = PendingText::default();
    let mut root = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::parse(format!("at byte {}: {e}", reader.error_position())))?;

        match event {
            Event::Start(start) => {
                if let Some(parent) = stack.last_mut() {
                    pending.flush_into(parent);
                }
                stack.push(start_element(&start)?);
            }
            Event::Empty(start) => {
                let element = start_element(&start)?;
                match stack.last_mut() {
                    Some(parent) => {
                        pending.flush_into(parent);
                        parent.push(element);
                    }
                    None if root.is_none() => root = Some(element),
                    None => return Err(XmlError::parse("multiple root elements")),
                }
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| XmlError::parse("unexpected closing tag"))?;
                pending.flush_into(&mut element);
                match stack.last_mut() {
                    Some(parent) => parent.push(element),
                    None if root.is_none() => root = Some(element),
                    None => return Err(XmlError::parse("multiple root elements")),
                }
            }
            Event::Text(t) => {
                if !stack.is_empty() {
                    let raw = String::from_utf8_lossy(&t);
                    let text = unescape(&raw).map_err(|e| XmlError::parse(e.to_string()))?;
                    pending.0.push_str(&text);
                }
            }
            Event::CData(c) => {
                if !stack.is_empty() {
                    pending.0.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::GeneralRef(r) => {
                if !stack.is_empty() {
                    let reference = format!("&{};", String::from_utf8_lossy(&r));
                    let text = unescape(&reference).map_err(|e| XmlError::parse(e.to_string()))?;
                    pending.0.push_str(&text);
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::parse(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| XmlError::parse("document has no root element"))
}

/// Parses an `<openpnp-packages>` document.
///
/// # Errors
///
/// Returns an error for malformed XML or a different root element.
pub fn parse_packages(text: &str) -> Result<Element, XmlError> {
    let root = parse_document(text)?;
    if root.name != PACKAGES_ROOT {
        return Err(XmlError::InvalidRoot {
            expected: PACKAGES_ROOT,
            found: root.name,
        });
    }
    Ok(root)
}

/// Reads an `<openpnp-packages>` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a packages file.
pub fn read_packages(path: &Path) -> Result<Element, XmlError> {
    let text = std::fs::read_to_string(path).map_err(|e| XmlError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let root = parse_packages(&text)?;
    tracing::debug!(
        path = %path.display(),
        packages = root.elements_named(PACKAGE_ELEMENT).count(),
        "Read existing packages"
    );
    Ok(root)
}

/// Adds generated packages to an existing packages document.
///
/// Existing packages win: a generated package whose `id` is already present
/// is dropped. New packages are appended in the order given.
#[must_use]
pub fn merge_packages(mut existing: Element, generated: impl IntoIterator<Item = Element>) -> Element {
    let known: Vec<String> = existing
        .elements_named(PACKAGE_ELEMENT)
        .filter_map(|p| p.attribute("id"))
        .map(ToString::to_string)
        .collect();

    let mut added = 0usize;
    for package in generated {
        let id = package.attribute("id").unwrap_or_default();
        if known.iter().any(|k| k == id) {
            tracing::debug!(id, "Keeping existing package");
            continue;
        }
        existing.push(package);
        added += 1;
    }

    tracing::info!(existing = known.len(), added, "Joined packages");
    existing
}
