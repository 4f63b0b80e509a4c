/*!
 * Localization entities.
 *
 * An entity is one translatable unit addressed by a stable key derived from
 * its position in the document (file, groups, unit). Targets are kept per
 * language together with their review state and notes.
 */

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::EntityError;
use crate::xliff::SegmentState;

pub mod extract;
pub mod merge;
pub mod writeback;

pub use extract::extract_entities;
pub use merge::{MergeReport, merge_previous_document, merge_prior};
pub use writeback::{WriteBackReport, write_back};

/// Sub-state of a declined review
pub const SUB_STATE_DECLINED: &str = "declined";

/// Sub-state of a review asking for another translation
pub const SUB_STATE_REFINE_NEEDED: &str = "refine-needed";

/// Length of the hex key
const KEY_LENGTH: usize = 12;

/// Source side of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceText {
    /// Source language code
    pub code: String,

    /// Source text in content string form
    pub value: String,
}

/// One language slot of an entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalizationTarget {
    /// Translated text, if any
    pub value: Option<String>,

    /// Explicit segment state
    pub state: Option<SegmentState>,

    /// Segment sub-state, e.g. `declined`
    pub sub_state: Option<String>,

    /// Notes carried with this slot
    pub notes: Vec<String>,
}

impl LocalizationTarget {
    /// State used for decisions: explicit state, else derived from the value
    pub fn effective_state(&self) -> SegmentState {
        match (self.state, &self.value) {
            (Some(state), _) => state,
            (None, None) => SegmentState::Initial,
            (None, Some(_)) => SegmentState::Translated,
        }
    }

    /// Effective state is `initial`: no value and no state, or an explicit `initial`
    pub fn is_initial(&self) -> bool {
        self.effective_state() == SegmentState::Initial
    }

    /// Needs a translation: initial, or reviewed and sent back for refinement
    pub fn is_untranslated(&self) -> bool {
        match self.effective_state() {
            SegmentState::Initial => true,
            SegmentState::Reviewed => self.sub_state.as_deref() == Some(SUB_STATE_REFINE_NEEDED),
            SegmentState::Translated | SegmentState::Final => false,
        }
    }

    /// Append notes that are not already present
    pub fn add_notes<I: IntoIterator<Item = String>>(&mut self, notes: I) {
        for note in notes {
            if !self.notes.contains(&note) {
                self.notes.push(note);
            }
        }
    }
}

/// A translatable unit flattened out of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationEntity {
    /// Short stable key
    pub key: String,

    /// File id, group ids and unit id
    pub key_path: Vec<String>,

    pub source: SourceText,

    /// Targets by language
    pub target: BTreeMap<String, LocalizationTarget>,
}

impl LocalizationEntity {
    pub fn new(key_path: Vec<String>, source: SourceText) -> Self {
        Self {
            key: entity_key(&key_path),
            key_path,
            source,
            target: BTreeMap::new(),
        }
    }

    /// Builder-style target insertion
    pub fn with_target(mut self, language: impl Into<String>, target: LocalizationTarget) -> Self {
        self.target.insert(language.into(), target);
        self
    }

    /// All target languages, sorted
    pub fn target_languages(&self) -> Vec<String> {
        self.target.keys().cloned().collect()
    }

    /// Target languages still needing a translation, sorted
    pub fn untranslated_languages(&self) -> Vec<String> {
        self.target
            .iter()
            .filter(|(_, target)| target.is_untranslated())
            .map(|(language, _)| language.clone())
            .collect()
    }

    pub fn is_final(&self) -> bool {
        self.target
            .values()
            .all(|target| target.effective_state() == SegmentState::Final)
    }

    pub fn needs_review(&self) -> bool {
        !self.is_final()
    }

    /// Notes of every target, deduplicated in first-seen order
    pub fn all_notes(&self) -> Vec<String> {
        self.notes_for(self.target.keys().map(String::as_str))
    }

    /// Notes of the given languages, deduplicated in first-seen order
    pub fn notes_for<'a>(&self, languages: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut notes: Vec<String> = Vec::new();
        for language in languages {
            if let Some(target) = self.target.get(language) {
                for note in &target.notes {
                    if !notes.contains(note) {
                        notes.push(note.clone());
                    }
                }
            }
        }
        notes
    }

    /// Append a note to every target
    pub fn add_note(&mut self, note: &str) {
        for target in self.target.values_mut() {
            target.add_notes([note.to_string()]);
        }
    }

    /// Human readable path, used in diagnostics
    pub fn path_display(&self) -> String {
        self.key_path.join("/")
    }
}

/// Short key for a key path: hex SHA-256 of the percent-encoded parts joined by `&`
pub fn entity_key<S: AsRef<str>>(key_path: &[S]) -> String {
    let joined = key_path
        .iter()
        .map(|part| urlencoding::encode(part.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..KEY_LENGTH].to_string()
}

/// Insertion-ordered map of entities by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDictionary {
    entities: Vec<LocalizationEntity>,
    index: HashMap<String, usize>,
}

impl EntityDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity, merging its targets into an existing entry with the same key.
    ///
    /// Fails when the existing entry has a different key path.
    pub fn insert(&mut self, entity: LocalizationEntity) -> Result<(), EntityError> {
        match self.index.get(&entity.key) {
            Some(&position) => {
                let existing = &mut self.entities[position];
                if existing.key_path != entity.key_path {
                    return Err(EntityError::KeyCollision {
                        key: entity.key.clone(),
                        existing: existing.path_display(),
                        incoming: entity.path_display(),
                    });
                }
                existing.target.extend(entity.target);
            }
            None => {
                self.index.insert(entity.key.clone(), self.entities.len());
                self.entities.push(entity);
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&LocalizationEntity> {
        self.index.get(key).map(|&position| &self.entities[position])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut LocalizationEntity> {
        match self.index.get(key) {
            Some(&position) => self.entities.get_mut(position),
            None => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalizationEntity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LocalizationEntity> {
        self.entities.iter_mut()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.entities.iter().map(|entity| entity.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of entities with at least one untranslated language
    pub fn untranslated_count(&self) -> usize {
        self.entities
            .iter()
            .filter(|entity| !entity.untranslated_languages().is_empty())
            .count()
    }

    pub fn into_vec(self) -> Vec<LocalizationEntity> {
        self.entities
    }
}

impl FromIterator<LocalizationEntity> for EntityDictionary {
    /// Collect entities; later duplicates of a key overwrite the earlier entry
    fn from_iter<T: IntoIterator<Item = LocalizationEntity>>(iter: T) -> Self {
        let mut dictionary = Self::new();
        for entity in iter {
            match dictionary.index.get(&entity.key) {
                Some(&position) => dictionary.entities[position] = entity,
                None => {
                    dictionary.index.insert(entity.key.clone(), dictionary.entities.len());
                    dictionary.entities.push(entity);
                }
            }
        }
        dictionary
    }
}
