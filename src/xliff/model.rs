/*!
 * Typed model of the current interchange dialect (XLIFF 2).
 *
 * The model keeps every node it does not interpret (whitespace, comments,
 * unknown elements and attributes) as passthrough, so documents can be
 * parsed, edited and written back without losing anything. Known attributes
 * are held in typed fields and written first.
 */

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use super::content::Content;
use super::xml::{XmlDeclaration, XmlDocument, XmlElement, XmlNode};
use crate::errors::DocumentError;

/// Namespace of the current dialect
pub const XLIFF2_NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:2.0";

/// Translation state of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentState {
    Initial,
    Translated,
    Reviewed,
    Final,
}

impl SegmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Translated => "translated",
            Self::Reviewed => "reviewed",
            Self::Final => "final",
        }
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentState {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(Self::Initial),
            "translated" => Ok(Self::Translated),
            "reviewed" => Ok(Self::Reviewed),
            "final" => Ok(Self::Final),
            other => Err(DocumentError::Structure(format!("Invalid segment state: {}", other))),
        }
    }
}

/// Root of a current-dialect document
#[derive(Debug, Clone, PartialEq)]
pub struct Xliff {
    /// Dialect version, `2.0` unless parsed otherwise
    pub version: String,

    /// Source language (`srcLang`)
    pub src_lang: String,

    /// Target language (`trgLang`)
    pub trg_lang: Option<String>,

    /// Remaining root attributes, including namespaces
    pub attributes: Vec<(String, String)>,

    /// Files and passthrough nodes in document order
    pub children: Vec<XliffChild>,

    /// XML declaration
    pub declaration: Option<XmlDeclaration>,

    /// Nodes before the root element
    pub prolog: Vec<XmlNode>,

    /// Nodes after the root element
    pub epilog: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XliffChild {
    File(File),
    Other(XmlNode),
}

/// A `file` element
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: String,
    pub original: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub items: Vec<Item>,
}

/// Child of a file or group
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Group(Group),
    Unit(Unit),
    Other(XmlNode),
}

/// A `group` element; groups nest without limit
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: String,
    pub attributes: Vec<(String, String)>,
    pub items: Vec<Item>,
}

/// A `unit` element
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: String,
    pub attributes: Vec<(String, String)>,
    pub parts: Vec<UnitPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitPart {
    Notes(Notes),
    Segment(Segment),
    Other(XmlNode),
}

/// A `notes` block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Notes {
    pub attributes: Vec<(String, String)>,
    pub items: Vec<NotesItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotesItem {
    Note(Note),
    Other(XmlNode),
}

/// A single `note`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Note {
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

/// A `segment` element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segment {
    pub id: Option<String>,
    pub state: Option<SegmentState>,
    pub sub_state: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub parts: Vec<SegmentPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentPart {
    Source(TextElement),
    Target(TextElement),
    Other(XmlNode),
}

/// A `source` or `target` with its attributes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextElement {
    pub attributes: Vec<(String, String)>,
    pub content: Content,
}

impl TextElement {
    pub fn new(content: Content) -> Self {
        Self { attributes: Vec::new(), content }
    }
}

impl Xliff {
    /// Create an empty document for a language pair
    pub fn new(src_lang: impl Into<String>, trg_lang: Option<String>) -> Self {
        Self {
            version: "2.0".to_string(),
            src_lang: src_lang.into(),
            trg_lang,
            attributes: vec![("xmlns".to_string(), XLIFF2_NAMESPACE.to_string())],
            children: Vec::new(),
            declaration: Some(XmlDeclaration::default()),
            prolog: Vec::new(),
            epilog: Vec::new(),
        }
    }

    /// Builder-style file append
    pub fn with_file(mut self, file: File) -> Self {
        self.children.push(XliffChild::File(file));
        self
    }

    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.children.iter().filter_map(|child| match child {
            XliffChild::File(file) => Some(file),
            XliffChild::Other(_) => None,
        })
    }

    pub fn files_mut(&mut self) -> impl Iterator<Item = &mut File> {
        self.children.iter_mut().filter_map(|child| match child {
            XliffChild::File(file) => Some(file),
            XliffChild::Other(_) => None,
        })
    }

    /// Parse a document from its XML text
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        Self::from_document(XmlDocument::parse(text)?)
    }

    /// Build the typed model from a generic tree
    pub fn from_document(doc: XmlDocument) -> Result<Self, DocumentError> {
        let root = doc.root;
        if root.name != "xliff" {
            return Err(DocumentError::Structure(format!(
                "Expected <xliff> root, found <{}>",
                root.name
            )));
        }

        let mut version = None;
        let mut src_lang = None;
        let mut trg_lang = None;
        let mut attributes = Vec::new();
        for (key, value) in root.attributes {
            match key.as_str() {
                "version" => version = Some(value),
                "srcLang" => src_lang = Some(value),
                "trgLang" => trg_lang = Some(value),
                _ => attributes.push((key, value)),
            }
        }
        let version = version.unwrap_or_else(|| "2.0".to_string());
        if version.starts_with('1') {
            return Err(DocumentError::Structure(format!(
                "Document uses legacy version {}, convert it first",
                version
            )));
        }
        let src_lang = src_lang
            .ok_or_else(|| DocumentError::Structure("Missing srcLang on <xliff>".to_string()))?;

        let mut children = Vec::new();
        for node in root.children {
            match node {
                XmlNode::Element(element) if element.name == "file" => {
                    match File::from_element(element)? {
                        Ok(file) => children.push(XliffChild::File(file)),
                        Err(element) => children.push(XliffChild::Other(XmlNode::Element(element))),
                    }
                }
                other => children.push(XliffChild::Other(other)),
            }
        }

        Ok(Self {
            version,
            src_lang,
            trg_lang,
            attributes,
            children,
            declaration: doc.declaration,
            prolog: doc.prolog,
            epilog: doc.epilog,
        })
    }

    /// Convert back into a generic tree
    pub fn to_document(&self) -> XmlDocument {
        let mut root = XmlElement::new("xliff");
        root.attributes.push(("version".to_string(), self.version.clone()));
        root.attributes.push(("srcLang".to_string(), self.src_lang.clone()));
        if let Some(trg_lang) = &self.trg_lang {
            root.attributes.push(("trgLang".to_string(), trg_lang.clone()));
        }
        root.attributes.extend(self.attributes.iter().cloned());
        for child in &self.children {
            root.children.push(match child {
                XliffChild::File(file) => XmlNode::Element(file.to_element()),
                XliffChild::Other(node) => node.clone(),
            });
        }

        XmlDocument {
            declaration: self.declaration.clone(),
            prolog: self.prolog.clone(),
            root,
            epilog: self.epilog.clone(),
        }
    }

    /// Serialize to XML text
    pub fn to_xml_string(&self) -> String {
        self.to_document().to_xml_string()
    }
}

impl File {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            original: Some(id.clone()),
            id,
            attributes: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    // Ok(file) or the untouched element when it cannot be modelled
    fn from_element(element: XmlElement) -> Result<Result<Self, XmlElement>, DocumentError> {
        let Some(id) = element.attribute("id").map(str::to_string) else {
            warn!("Skipping <file> without id");
            return Ok(Err(element));
        };
        let original = element.attribute("original").map(str::to_string);
        let attributes = without(&element.attributes, &["id", "original"]);
        let items = items_from_nodes(element.children)?;
        Ok(Ok(Self { id, original, attributes, items }))
    }

    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("file");
        element.attributes.push(("id".to_string(), self.id.clone()));
        if let Some(original) = &self.original {
            element.attributes.push(("original".to_string(), original.clone()));
        }
        element.attributes.extend(self.attributes.iter().cloned());
        element.children = items_to_nodes(&self.items);
        element
    }
}

fn items_from_nodes(nodes: Vec<XmlNode>) -> Result<Vec<Item>, DocumentError> {
    let mut items = Vec::with_capacity(nodes.len());
    for node in nodes {
        let item = match node {
            XmlNode::Element(element) if element.name == "group" => match element.attribute("id") {
                Some(id) => {
                    let id = id.to_string();
                    let attributes = without(&element.attributes, &["id"]);
                    Item::Group(Group { id, attributes, items: items_from_nodes(element.children)? })
                }
                None => {
                    warn!("Keeping <group> without id as passthrough");
                    Item::Other(XmlNode::Element(element))
                }
            },
            XmlNode::Element(element) if element.name == "unit" => match element.attribute("id") {
                Some(id) => Item::Unit(Unit::from_element(id.to_string(), element)?),
                None => {
                    warn!("Keeping <unit> without id as passthrough");
                    Item::Other(XmlNode::Element(element))
                }
            },
            other => Item::Other(other),
        };
        items.push(item);
    }
    Ok(items)
}

fn items_to_nodes(items: &[Item]) -> Vec<XmlNode> {
    items
        .iter()
        .map(|item| match item {
            Item::Group(group) => {
                let mut element = XmlElement::new("group");
                element.attributes.push(("id".to_string(), group.id.clone()));
                element.attributes.extend(group.attributes.iter().cloned());
                element.children = items_to_nodes(&group.items);
                XmlNode::Element(element)
            }
            Item::Unit(unit) => XmlNode::Element(unit.to_element()),
            Item::Other(node) => node.clone(),
        })
        .collect()
}

impl Group {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), attributes: Vec::new(), items: Vec::new() }
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }
}

impl Unit {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), attributes: Vec::new(), parts: Vec::new() }
    }

    pub fn with_notes(mut self, notes: &[&str]) -> Self {
        self.parts.push(UnitPart::Notes(Notes::from_texts(notes.iter().map(|n| n.to_string()))));
        self
    }

    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.parts.push(UnitPart::Segment(segment));
        self
    }

    /// First segment of the unit
    pub fn segment(&self) -> Option<&Segment> {
        self.parts.iter().find_map(|part| match part {
            UnitPart::Segment(segment) => Some(segment),
            _ => None,
        })
    }

    pub fn segment_mut(&mut self) -> Option<&mut Segment> {
        self.parts.iter_mut().find_map(|part| match part {
            UnitPart::Segment(segment) => Some(segment),
            _ => None,
        })
    }

    /// Text of every note in every notes block, in order
    pub fn note_texts(&self) -> Vec<String> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                UnitPart::Notes(notes) => Some(notes.texts()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Make the unit's notes equal `texts`.
    ///
    /// The first notes block is rewritten when its text differs; attributes of
    /// existing notes are reused by position. A block is only created when
    /// there is something to put in it.
    pub fn set_notes(&mut self, texts: &[String]) {
        if self.note_texts() == texts {
            return;
        }

        let existing = self.parts.iter().position(|part| matches!(part, UnitPart::Notes(_)));
        match existing {
            Some(_) if texts.is_empty() => {
                // An empty notes block is not valid, drop blocks with their indentation
                let mut kept: Vec<UnitPart> = Vec::with_capacity(self.parts.len());
                for part in self.parts.drain(..) {
                    if matches!(part, UnitPart::Notes(_)) {
                        if matches!(kept.last(), Some(UnitPart::Other(node)) if node.is_whitespace()) {
                            kept.pop();
                        }
                        continue;
                    }
                    kept.push(part);
                }
                self.parts = kept;
            }
            Some(index) => {
                // Notes from later blocks now live in the first one
                let mut first = true;
                self.parts.retain(|part| match part {
                    UnitPart::Notes(_) if first => {
                        first = false;
                        true
                    }
                    UnitPart::Notes(_) => false,
                    _ => true,
                });
                if let UnitPart::Notes(notes) = &mut self.parts[index] {
                    notes.replace_texts(texts);
                }
            }
            None if texts.is_empty() => {}
            None => {
                let notes = UnitPart::Notes(Notes::from_texts(texts.iter().cloned()));
                let anchor = self
                    .parts
                    .iter()
                    .position(|part| matches!(part, UnitPart::Segment(_)))
                    .unwrap_or(self.parts.len());
                let indent = anchor
                    .checked_sub(1)
                    .and_then(|before| match self.parts.get(before) {
                        Some(UnitPart::Other(node)) if node.is_whitespace() => Some(node.clone()),
                        _ => None,
                    });
                // notes, then a copy of the indentation the segment had
                if let Some(indent) = indent {
                    self.parts.insert(anchor, UnitPart::Other(indent));
                }
                self.parts.insert(anchor, notes);
            }
        }
    }

    fn from_element(id: String, element: XmlElement) -> Result<Self, DocumentError> {
        let attributes = without(&element.attributes, &["id"]);
        let mut parts = Vec::with_capacity(element.children.len());
        for node in element.children {
            let part = match node {
                XmlNode::Element(child) if child.name == "notes" => UnitPart::Notes(Notes::from_element(child)),
                XmlNode::Element(child) if child.name == "segment" => UnitPart::Segment(Segment::from_element(child)?),
                other => UnitPart::Other(other),
            };
            parts.push(part);
        }
        Ok(Self { id, attributes, parts })
    }

    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("unit");
        element.attributes.push(("id".to_string(), self.id.clone()));
        element.attributes.extend(self.attributes.iter().cloned());
        element.children = self
            .parts
            .iter()
            .map(|part| match part {
                UnitPart::Notes(notes) => XmlNode::Element(notes.to_element()),
                UnitPart::Segment(segment) => XmlNode::Element(segment.to_element()),
                UnitPart::Other(node) => node.clone(),
            })
            .collect();
        element
    }
}

impl Notes {
    pub fn from_texts(texts: impl IntoIterator<Item = String>) -> Self {
        Self {
            attributes: Vec::new(),
            items: texts
                .into_iter()
                .map(|text| NotesItem::Note(Note { attributes: Vec::new(), text }))
                .collect(),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.notes().map(|note| note.text.clone()).collect()
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.items.iter().filter_map(|item| match item {
            NotesItem::Note(note) => Some(note),
            NotesItem::Other(_) => None,
        })
    }

    fn replace_texts(&mut self, texts: &[String]) {
        let mut reused = self.notes().map(|note| note.attributes.clone()).collect::<Vec<_>>().into_iter();
        let mut fresh: Vec<NotesItem> = texts
            .iter()
            .map(|text| {
                NotesItem::Note(Note { attributes: reused.next().unwrap_or_default(), text: text.clone() })
            })
            .collect();

        // Keep the block's own formatting around the first note
        let leading: Vec<NotesItem> = self
            .items
            .iter()
            .take_while(|item| matches!(item, NotesItem::Other(node) if node.is_whitespace()))
            .cloned()
            .collect();
        let trailing: Option<NotesItem> = self
            .items
            .last()
            .filter(|item| matches!(item, NotesItem::Other(node) if node.is_whitespace()))
            .cloned();
        let separator = leading.last().cloned();

        let mut items = leading;
        for (index, note) in fresh.drain(..).enumerate() {
            if index > 0 {
                if let Some(separator) = &separator {
                    items.push(separator.clone());
                }
            }
            items.push(note);
        }
        if let Some(trailing) = trailing {
            if !items.is_empty() {
                items.push(trailing);
            }
        }
        self.items = items;
    }

    fn from_element(element: XmlElement) -> Self {
        let items = element
            .children
            .into_iter()
            .map(|node| match node {
                XmlNode::Element(note) if note.name == "note" => NotesItem::Note(Note {
                    text: note.text(),
                    attributes: note.attributes,
                }),
                other => NotesItem::Other(other),
            })
            .collect();
        Self { attributes: element.attributes, items }
    }

    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("notes");
        element.attributes = self.attributes.clone();
        element.children = self
            .items
            .iter()
            .map(|item| match item {
                NotesItem::Note(note) => {
                    let mut child = XmlElement::new("note");
                    child.attributes = note.attributes.clone();
                    if !note.text.is_empty() {
                        child.children.push(XmlNode::Text(note.text.clone()));
                    }
                    XmlNode::Element(child)
                }
                NotesItem::Other(node) => node.clone(),
            })
            .collect();
        element
    }
}

impl Segment {
    pub fn new(source: Content) -> Self {
        Self {
            parts: vec![SegmentPart::Source(TextElement::new(source))],
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: Content) -> Self {
        self.set_target(target);
        self
    }

    pub fn with_state(mut self, state: SegmentState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn source(&self) -> Option<&Content> {
        self.parts.iter().find_map(|part| match part {
            SegmentPart::Source(source) => Some(&source.content),
            _ => None,
        })
    }

    pub fn target(&self) -> Option<&Content> {
        self.parts.iter().find_map(|part| match part {
            SegmentPart::Target(target) => Some(&target.content),
            _ => None,
        })
    }

    /// Replace the target content, creating the element after the source if needed
    pub fn set_target(&mut self, content: Content) {
        for part in self.parts.iter_mut() {
            if let SegmentPart::Target(target) = part {
                target.content = content;
                return;
            }
        }
        let source = self.parts.iter().position(|part| matches!(part, SegmentPart::Source(_)));
        let anchor = source.map(|index| index + 1).unwrap_or(self.parts.len());
        let indent = source
            .and_then(|index| index.checked_sub(1))
            .and_then(|before| match self.parts.get(before) {
                Some(SegmentPart::Other(node)) if node.is_whitespace() => Some(node.clone()),
                _ => None,
            });
        // the source's indentation, then the target
        self.parts.insert(anchor, SegmentPart::Target(TextElement::new(content)));
        if let Some(indent) = indent {
            self.parts.insert(anchor, SegmentPart::Other(indent));
        }
    }

    /// Effective state: explicit state, else `initial` without a target and
    /// `translated` with one
    pub fn effective_state(&self) -> SegmentState {
        match (self.state, self.target()) {
            (Some(state), _) => state,
            (None, None) => SegmentState::Initial,
            (None, Some(_)) => SegmentState::Translated,
        }
    }

    fn from_element(element: XmlElement) -> Result<Self, DocumentError> {
        let id = element.attribute("id").map(str::to_string);
        let state = element.attribute("state").map(SegmentState::from_str).transpose()?;
        let sub_state = element.attribute("subState").map(str::to_string);
        let attributes = without(&element.attributes, &["id", "state", "subState"]);
        let parts = element
            .children
            .into_iter()
            .map(|node| match node {
                XmlNode::Element(child) if child.name == "source" => SegmentPart::Source(TextElement {
                    attributes: child.attributes,
                    content: Content::from_nodes(child.children),
                }),
                XmlNode::Element(child) if child.name == "target" => SegmentPart::Target(TextElement {
                    attributes: child.attributes,
                    content: Content::from_nodes(child.children),
                }),
                other => SegmentPart::Other(other),
            })
            .collect();
        Ok(Self { id, state, sub_state, attributes, parts })
    }

    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("segment");
        if let Some(id) = &self.id {
            element.attributes.push(("id".to_string(), id.clone()));
        }
        if let Some(state) = self.state {
            element.attributes.push(("state".to_string(), state.to_string()));
        }
        if let Some(sub_state) = &self.sub_state {
            element.attributes.push(("subState".to_string(), sub_state.clone()));
        }
        element.attributes.extend(self.attributes.iter().cloned());
        element.children = self
            .parts
            .iter()
            .map(|part| match part {
                SegmentPart::Source(source) => XmlNode::Element(text_element("source", source)),
                SegmentPart::Target(target) => XmlNode::Element(text_element("target", target)),
                SegmentPart::Other(node) => node.clone(),
            })
            .collect();
        element
    }
}

fn text_element(name: &str, text: &TextElement) -> XmlElement {
    let mut element = text.content.to_element(name);
    element.attributes = text.attributes.clone();
    element
}

fn without(attributes: &[(String, String)], names: &[&str]) -> Vec<(String, String)> {
    attributes
        .iter()
        .filter(|(key, _)| !names.contains(&key.as_str()))
        .cloned()
        .collect()
}
