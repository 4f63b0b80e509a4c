/*!
 * Inline content of `source`, `target` and `note` elements.
 *
 * Entities carry content as a flat string. Text is unescaped and inline
 * markup (`cp ph pc sc ec mrk sm em`) appears as literal tags. Text that
 * would read as an inline tag is written with `&lt;`, and an `&` starting
 * `&lt;` or `&amp;` as `&amp;`, so the string form maps back to the same
 * nodes. Converting back finds the inline tags, decodes the text between
 * them and parses the result.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use super::xml::{self, XmlElement, XmlNode};

/// Inline elements recognised inside content
pub const INLINE_ELEMENTS: &[&str] = &["cp", "ph", "pc", "sc", "ec", "mrk", "sm", "em"];

static INLINE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"</?(?:cp|ph|pc|sc|ec|mrk|sm|em)(?:\s+[^<>]*?)?\s*/?>"#)
        .expect("inline tag pattern is valid")
});

/// Child nodes of a content-bearing element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Content {
    nodes: Vec<XmlNode>,
}

impl Content {
    /// Wrap existing nodes
    pub fn from_nodes(nodes: Vec<XmlNode>) -> Self {
        Self { nodes }
    }

    /// Plain text content
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self { nodes: vec![XmlNode::Text(text)] }
    }

    /// Build content from its string form, restoring inline markup
    pub fn from_text(text: &str) -> Self {
        if !INLINE_TAG_REGEX.is_match(text) {
            return Self::plain(decode_text(text));
        }

        let mut fragment = String::with_capacity(text.len() + 16);
        let mut last = 0;
        for tag in INLINE_TAG_REGEX.find_iter(text) {
            escape_text(&mut fragment, &decode_text(&text[last..tag.start()]));
            fragment.push_str(tag.as_str());
            last = tag.end();
        }
        escape_text(&mut fragment, &decode_text(&text[last..]));

        match xml::parse_fragment(&fragment) {
            Ok(nodes) => Self { nodes },
            Err(e) => {
                warn!("Unbalanced inline markup, keeping content as text: {}", e);
                Self::plain(decode_text(text))
            }
        }
    }

    /// String form: unescaped text with inline elements written as tags
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        write_flat(&mut out, &self.nodes);
        out
    }

    /// Underlying nodes
    pub fn nodes(&self) -> &[XmlNode] {
        &self.nodes
    }

    /// Consume into nodes
    pub fn into_nodes(self) -> Vec<XmlNode> {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build an element of the given name holding this content
    pub fn to_element(&self, name: &str) -> XmlElement {
        XmlElement {
            name: name.to_string(),
            attributes: Vec::new(),
            children: self.nodes.clone(),
        }
    }
}

fn write_flat(out: &mut String, nodes: &[XmlNode]) {
    for node in nodes {
        match node {
            XmlNode::Text(text) | XmlNode::CData(text) => encode_text(out, text),
            XmlNode::Element(element) => {
                if !INLINE_ELEMENTS.contains(&element.name.as_str()) {
                    warn!("Unknown inline element <{}> in content", element.name);
                }
                out.push('<');
                out.push_str(&element.name);
                for (key, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    xml::escape_attribute(out, value);
                    out.push('"');
                }
                if element.children.is_empty() {
                    out.push_str("/>");
                    continue;
                }
                out.push('>');
                write_flat(out, &element.children);
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
            _ => {}
        }
    }
}

/// Text in string form: tag lookalikes and entity lookalikes are escaped
fn encode_text(out: &mut String, text: &str) {
    let tag_starts: Vec<usize> = INLINE_TAG_REGEX.find_iter(text).map(|tag| tag.start()).collect();
    for (index, ch) in text.char_indices() {
        match ch {
            '<' if tag_starts.contains(&index) => out.push_str("&lt;"),
            '&' if text[index..].starts_with("&lt;") || text[index..].starts_with("&amp;") => out.push_str("&amp;"),
            _ => out.push(ch),
        }
    }
}

/// Inverse of `encode_text`
fn decode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(position) = rest.find('&') {
        out.push_str(&rest[..position]);
        let tail = &rest[position..];
        if let Some(after) = tail.strip_prefix("&amp;") {
            out.push('&');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("&lt;") {
            out.push('<');
            rest = after;
        } else {
            out.push('&');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}
