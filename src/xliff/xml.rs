/*!
 * Generic XML element tree.
 *
 * quick-xml does the tokenizing; this module turns the event stream into an
 * owned tree and writes it back deterministically. Text and attribute values
 * are held unescaped and escaped again on output. Whitespace between elements
 * is kept as ordinary text nodes, so a parsed document writes back the same
 * bytes on every subsequent run.
 */

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::errors::DocumentError;

/// Elements whose children are content, never pretty-printed
const CONTENT_ELEMENTS: &[&str] = &["source", "target", "note", "seg-source", "alt-trans"];

/// A node of the element tree
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

impl XmlNode {
    /// The element, if this node is one
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// True for text nodes made only of whitespace
    pub fn is_whitespace(&self) -> bool {
        matches!(self, XmlNode::Text(text) if text.trim().is_empty())
    }
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified element name
    pub name: String,

    /// Attributes in document order, values unescaped
    pub attributes: Vec<(String, String)>,

    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Look up an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing it in place if it already exists
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Remove an attribute if present
    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.retain(|(key, _)| key != name);
    }

    /// Child elements, skipping text and comments
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// First child element with the given name
    pub fn first_child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|child| child.name == name)
    }

    /// Concatenated text of all descendant text and CDATA nodes
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[XmlNode], out: &mut String) {
    for node in nodes {
        match node {
            XmlNode::Text(text) | XmlNode::CData(text) => out.push_str(text),
            XmlNode::Element(element) => collect_text(&element.children, out),
            _ => {}
        }
    }
}

/// The `<?xml ...?>` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: None,
        }
    }
}

/// A complete document: declaration, root element and the nodes around it
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// XML declaration, if present
    pub declaration: Option<XmlDeclaration>,

    /// Nodes between the declaration and the root element
    pub prolog: Vec<XmlNode>,

    /// Root element
    pub root: XmlElement,

    /// Nodes after the root element
    pub epilog: Vec<XmlNode>,
}

impl XmlDocument {
    /// Wrap a freshly built root element with a default declaration
    pub fn new(root: XmlElement) -> Self {
        Self {
            declaration: Some(XmlDeclaration::default()),
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse a complete document
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut stack: Vec<XmlElement> = Vec::new();

        loop {
            let event = reader.read_event()?;
            let node = match event {
                Event::Eof => break,
                Event::Decl(decl) => {
                    let version = bytes_to_string(decl.version()?);
                    let encoding = decl
                        .encoding()
                        .transpose()
                        .map_err(|e| DocumentError::Xml(e.to_string()))?
                        .map(bytes_to_string);
                    let standalone = decl
                        .standalone()
                        .transpose()
                        .map_err(|e| DocumentError::Xml(e.to_string()))?
                        .map(bytes_to_string);
                    declaration = Some(XmlDeclaration { version, encoding, standalone });
                    continue;
                }
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                    continue;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        DocumentError::Xml("unexpected closing tag".to_string())
                    })?;
                    XmlNode::Element(element)
                }
                Event::Empty(start) => XmlNode::Element(element_from_start(&start)?),
                Event::Text(text) => XmlNode::Text(text.unescape()?.into_owned()),
                Event::CData(data) => XmlNode::CData(bytes_to_string(data.into_inner())),
                Event::Comment(comment) => XmlNode::Comment(bytes_to_string(comment.into_inner())),
                Event::PI(pi) => XmlNode::ProcessingInstruction(format!(
                    "{}{}",
                    bytes_to_string(pi.target()),
                    bytes_to_string(pi.content())
                )),
                Event::DocType(doctype) => XmlNode::DocType(bytes_to_string(doctype.into_inner())),
            };

            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
                continue;
            }
            match node {
                XmlNode::Element(element) if root.is_none() => root = Some(element),
                XmlNode::Element(element) => {
                    return Err(DocumentError::Xml(format!(
                        "multiple root elements, found <{}> after the root",
                        element.name
                    )));
                }
                other if root.is_none() => prolog.push(other),
                other => epilog.push(other),
            }
        }

        if let Some(open) = stack.last() {
            return Err(DocumentError::Xml(format!("unclosed element <{}>", open.name)));
        }
        let root = root.ok_or_else(|| DocumentError::Xml("document has no root element".to_string()))?;

        Ok(Self { declaration, prolog, root, epilog })
    }

    /// Serialize the document
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if let Some(decl) = &self.declaration {
            out.push_str("<?xml version=\"");
            out.push_str(&decl.version);
            out.push('"');
            if let Some(encoding) = &decl.encoding {
                out.push_str(" encoding=\"");
                out.push_str(encoding);
                out.push('"');
            }
            if let Some(standalone) = &decl.standalone {
                out.push_str(" standalone=\"");
                out.push_str(standalone);
                out.push('"');
            }
            out.push_str("?>");
            if self.prolog.is_empty() {
                out.push('\n');
            }
        }
        write_nodes(&mut out, &self.prolog, 0, true);
        write_element(&mut out, &self.root, 0, false);
        if self.epilog.is_empty() {
            out.push('\n');
        }
        write_nodes(&mut out, &self.epilog, 0, true);
        out
    }
}

/// Parse a fragment of mixed content into nodes
pub fn parse_fragment(fragment: &str) -> Result<Vec<XmlNode>, DocumentError> {
    let wrapped = format!("<fragment>{}</fragment>", fragment);
    let doc = XmlDocument::parse(&wrapped)?;
    Ok(doc.root.children)
}

/// Append an escaped attribute value
pub fn escape_attribute(out: &mut String, value: &str) {
    escape_into(out, value, true);
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, DocumentError> {
    let mut element = XmlElement::new(bytes_to_string(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| DocumentError::Xml(e.to_string()))?;
        let key = bytes_to_string(attribute.key.as_ref());
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

fn write_nodes(out: &mut String, nodes: &[XmlNode], depth: usize, preserve: bool) {
    for node in nodes {
        write_node(out, node, depth, preserve);
    }
}

fn write_node(out: &mut String, node: &XmlNode, depth: usize, preserve: bool) {
    match node {
        XmlNode::Element(element) => write_element(out, element, depth, preserve),
        XmlNode::Text(text) => escape_into(out, text, false),
        XmlNode::CData(text) => {
            out.push_str("<![CDATA[");
            out.push_str(text);
            out.push_str("]]>");
        }
        XmlNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        XmlNode::ProcessingInstruction(text) => {
            out.push_str("<?");
            out.push_str(text);
            out.push_str("?>");
        }
        XmlNode::DocType(text) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(text.trim_start());
            out.push('>');
        }
    }
}

// Elements built in memory carry no whitespace nodes; they get two-space
// indentation unless they sit inside content.
fn write_element(out: &mut String, element: &XmlElement, depth: usize, preserve: bool) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_into(out, value, true);
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let has_text = element
        .children
        .iter()
        .any(|child| matches!(child, XmlNode::Text(_) | XmlNode::CData(_)));
    let preserve_children = preserve || has_text || CONTENT_ELEMENTS.contains(&element.name.as_str());

    if preserve_children {
        write_nodes(out, &element.children, depth + 1, true);
    } else {
        for child in &element.children {
            push_indent(out, depth + 1);
            write_node(out, child, depth + 1, false);
        }
        push_indent(out, depth);
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn push_indent(out: &mut String, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\t' if attribute => out.push_str("&#9;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}
