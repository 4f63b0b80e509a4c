/*!
 * Interchange documents.
 *
 * - `xml`: owned element tree over quick-xml
 * - `content`: inline content and its string form
 * - `model`: typed current dialect (2.0)
 * - `legacy`: legacy dialect (1.2)
 * - `convert`: conversion between the two
 */

pub mod content;
pub mod convert;
pub mod legacy;
pub mod model;
pub mod xml;

pub use content::Content;
pub use legacy::LegacyXliff;
pub use model::{File, Group, Item, Notes, Segment, SegmentState, Unit, UnitPart, Xliff};

use crate::errors::DocumentError;
use xml::XmlDocument;

/// Parse a current-dialect document
pub fn parse_xliff(text: &str) -> Result<Xliff, DocumentError> {
    Xliff::parse(text)
}

/// Parse a legacy-dialect document
pub fn parse_legacy_xliff(text: &str) -> Result<LegacyXliff, DocumentError> {
    LegacyXliff::parse(text)
}

/// Dialect of a parsed document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentVersion {
    Legacy,
    Current,
}

/// Detect the dialect from the root `version` attribute
pub fn detect_version(text: &str) -> Result<DocumentVersion, DocumentError> {
    let doc = XmlDocument::parse(text)?;
    if doc.root.name != "xliff" {
        return Err(DocumentError::Structure(format!(
            "Expected <xliff> root, found <{}>",
            doc.root.name
        )));
    }
    match doc.root.attribute("version") {
        Some(version) if version.starts_with('1') => Ok(DocumentVersion::Legacy),
        _ => Ok(DocumentVersion::Current),
    }
}
