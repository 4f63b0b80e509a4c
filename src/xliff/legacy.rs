/*!
 * Model of the legacy interchange dialect (XLIFF 1.2).
 *
 * Legacy documents are only read and written by the converter, so the model
 * is shallow: whitespace between elements is dropped on parse and the writer
 * indents the tree it builds.
 */

use log::warn;

use super::content::Content;
use super::xml::{XmlDocument, XmlElement, XmlNode};
use crate::errors::DocumentError;

/// Namespace of the legacy dialect
pub const XLIFF1_NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:1.2";

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "urn:oasis:names:tc:xliff:document:1.2 xliff-core-1.2-transitional.xsd";

/// Root of a legacy document
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyXliff {
    pub version: String,
    /// Root attributes other than `version`
    pub attributes: Vec<(String, String)>,
    pub files: Vec<LegacyFile>,
}

/// A legacy `file`
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyFile {
    pub original: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub datatype: Option<String>,
    pub attributes: Vec<(String, String)>,
    /// The `header` element, kept as is
    pub header: Option<XmlElement>,
    pub body: Vec<LegacyItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LegacyItem {
    Group(LegacyGroup),
    TransUnit(TransUnit),
    BinUnit(XmlElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyGroup {
    pub id: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub items: Vec<LegacyItem>,
}

/// A `trans-unit`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransUnit {
    pub id: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub source: Option<Content>,
    pub target: Option<Content>,
    pub notes: Vec<String>,
}

impl LegacyXliff {
    /// Empty document carrying the standard legacy namespaces
    pub fn new() -> Self {
        Self {
            version: "1.2".to_string(),
            attributes: vec![
                ("xmlns:xsi".to_string(), XSI_NAMESPACE.to_string()),
                ("xmlns".to_string(), XLIFF1_NAMESPACE.to_string()),
                ("xmlns:xliff".to_string(), XLIFF1_NAMESPACE.to_string()),
                ("xsi:schemaLocation".to_string(), SCHEMA_LOCATION.to_string()),
            ],
            files: Vec::new(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let doc = XmlDocument::parse(text)?;
        let root = doc.root;
        if root.name != "xliff" {
            return Err(DocumentError::Structure(format!(
                "Expected <xliff> root, found <{}>",
                root.name
            )));
        }

        let version = root.attribute("version").unwrap_or("1.2").to_string();
        let attributes = root
            .attributes
            .iter()
            .filter(|(key, _)| key != "version")
            .cloned()
            .collect();

        let mut files = Vec::new();
        for element in elements(root.children) {
            if element.name == "file" {
                files.push(LegacyFile::from_element(element));
            } else {
                warn!("Ignoring <{}> under legacy <xliff>", element.name);
            }
        }

        Ok(Self { version, attributes, files })
    }

    pub fn to_xml_string(&self) -> String {
        let mut root = XmlElement::new("xliff");
        root.attributes.push(("version".to_string(), self.version.clone()));
        root.attributes.extend(self.attributes.iter().cloned());
        root.children = self
            .files
            .iter()
            .map(|file| XmlNode::Element(file.to_element()))
            .collect();
        XmlDocument::new(root).to_xml_string()
    }
}

impl Default for LegacyXliff {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyFile {
    fn from_element(element: XmlElement) -> Self {
        let mut original = None;
        let mut source_language = None;
        let mut target_language = None;
        let mut datatype = None;
        let mut attributes = Vec::new();
        for (key, value) in element.attributes {
            match key.as_str() {
                "original" => original = Some(value),
                "source-language" => source_language = Some(value),
                "target-language" => target_language = Some(value),
                "datatype" => datatype = Some(value),
                _ => attributes.push((key, value)),
            }
        }

        let mut header = None;
        let mut body = Vec::new();
        for child in elements(element.children) {
            match child.name.as_str() {
                "header" => header = Some(child),
                "body" => body = items_from_elements(child.children),
                other => warn!("Ignoring <{}> under legacy <file>", other),
            }
        }

        Self { original, source_language, target_language, datatype, attributes, header, body }
    }

    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("file");
        let known = [
            ("original", &self.original),
            ("source-language", &self.source_language),
            ("target-language", &self.target_language),
            ("datatype", &self.datatype),
        ];
        for (key, value) in known {
            if let Some(value) = value {
                element.attributes.push((key.to_string(), value.clone()));
            }
        }
        element.attributes.extend(self.attributes.iter().cloned());
        if let Some(header) = &self.header {
            element.children.push(XmlNode::Element(header.clone()));
        }
        let mut body = XmlElement::new("body");
        body.children = items_to_nodes(&self.body);
        element.children.push(XmlNode::Element(body));
        element
    }
}

fn elements(nodes: Vec<XmlNode>) -> impl Iterator<Item = XmlElement> {
    nodes.into_iter().filter_map(|node| match node {
        XmlNode::Element(element) => Some(element),
        _ => None,
    })
}

fn items_from_elements(nodes: Vec<XmlNode>) -> Vec<LegacyItem> {
    let mut items = Vec::new();
    for element in elements(nodes) {
        match element.name.as_str() {
            "group" => items.push(LegacyItem::Group(LegacyGroup {
                id: element.attribute("id").map(str::to_string),
                attributes: without_id(&element.attributes),
                items: items_from_elements(element.children),
            })),
            "trans-unit" => items.push(LegacyItem::TransUnit(TransUnit::from_element(element))),
            "bin-unit" => items.push(LegacyItem::BinUnit(element)),
            other => warn!("Ignoring <{}> in legacy body", other),
        }
    }
    items
}

fn items_to_nodes(items: &[LegacyItem]) -> Vec<XmlNode> {
    items
        .iter()
        .map(|item| {
            XmlNode::Element(match item {
                LegacyItem::Group(group) => {
                    let mut element = XmlElement::new("group");
                    if let Some(id) = &group.id {
                        element.attributes.push(("id".to_string(), id.clone()));
                    }
                    element.attributes.extend(group.attributes.iter().cloned());
                    element.children = items_to_nodes(&group.items);
                    element
                }
                LegacyItem::TransUnit(unit) => unit.to_element(),
                LegacyItem::BinUnit(element) => element.clone(),
            })
        })
        .collect()
}

fn without_id(attributes: &[(String, String)]) -> Vec<(String, String)> {
    attributes.iter().filter(|(key, _)| key != "id").cloned().collect()
}

impl TransUnit {
    pub fn new(id: impl Into<String>, source: Content) -> Self {
        Self {
            id: Some(id.into()),
            source: Some(source),
            ..Default::default()
        }
    }

    fn from_element(element: XmlElement) -> Self {
        let id = element.attribute("id").map(str::to_string);
        let attributes = without_id(&element.attributes);
        let mut unit = Self { id, attributes, ..Default::default() };
        for child in elements(element.children) {
            match child.name.as_str() {
                "source" => unit.source = Some(Content::from_nodes(child.children)),
                "target" => unit.target = Some(Content::from_nodes(child.children)),
                "note" => unit.notes.push(child.text()),
                _ => {}
            }
        }
        unit
    }

    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("trans-unit");
        if let Some(id) = &self.id {
            element.attributes.push(("id".to_string(), id.clone()));
        }
        element.attributes.extend(self.attributes.iter().cloned());
        if let Some(source) = &self.source {
            element.children.push(XmlNode::Element(source.to_element("source")));
        }
        if let Some(target) = &self.target {
            element.children.push(XmlNode::Element(target.to_element("target")));
        }
        for note in &self.notes {
            let mut child = XmlElement::new("note");
            if !note.is_empty() {
                child.children.push(XmlNode::Text(note.clone()));
            }
            element.children.push(XmlNode::Element(child));
        }
        element
    }
}
