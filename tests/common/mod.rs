/*!
 * Common test utilities for the locflow test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use locflow::entity::{LocalizationEntity, LocalizationTarget, SourceText};
use locflow::errors::TranslationError;
use locflow::translation::TokenCounter;
use locflow::translation::pipeline::{ReviewDecision, ReviewRequest, Reviewer};

/// French document of the sample bundle
pub const FR_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xliff version="2.0" srcLang="en" trgLang="fr" xmlns="urn:oasis:names:tc:xliff:document:2.0">
  <file id="app" original="Localizable.strings">
    <group id="home">
      <unit id="welcome">
        <notes>
          <note>Shown at launch</note>
        </notes>
        <segment>
          <source>Welcome to <ph id="1" disp="app"/>!</source>
        </segment>
      </unit>
    </group>
    <unit id="save">
      <segment state="final">
        <source>Save</source>
        <target>Enregistrer</target>
      </segment>
    </unit>
    <unit id="cancel">
      <segment>
        <source>Cancel</source>
      </segment>
    </unit>
  </file>
</xliff>
"#;

/// German document of the sample bundle, same units as the French one
pub const DE_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xliff version="2.0" srcLang="en" trgLang="de" xmlns="urn:oasis:names:tc:xliff:document:2.0">
  <file id="app" original="Localizable.strings">
    <group id="home">
      <unit id="welcome">
        <notes>
          <note>Shown at launch</note>
        </notes>
        <segment>
          <source>Welcome to <ph id="1" disp="app"/>!</source>
        </segment>
      </unit>
    </group>
    <unit id="save">
      <segment>
        <source>Save</source>
      </segment>
    </unit>
    <unit id="cancel">
      <segment>
        <source>Cancel</source>
      </segment>
    </unit>
  </file>
</xliff>
"#;

/// Legacy document with a group, a note, a target and a bin-unit
pub const LEGACY_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xliff version="1.2" xmlns="urn:oasis:names:tc:xliff:document:1.2">
  <file original="Main.strings" source-language="en" target-language="ja" datatype="plaintext">
    <body>
      <group id="menu">
        <trans-unit id="open">
          <source>Open <x id="1"/></source>
          <target>開く</target>
          <note>Menu item</note>
        </trans-unit>
      </group>
      <trans-unit id="quit">
        <source>Quit</source>
      </trans-unit>
      <bin-unit id="icon" mime-type="image/png"/>
    </body>
  </file>
</xliff>
"#;

/// Route log output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, creating parent directories
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes the French and German sample documents under `dir`
pub fn create_sample_bundle(dir: &Path) -> Result<PathBuf> {
    create_test_file(dir, "fr.lproj/Localizable.xliff", FR_DOCUMENT)?;
    create_test_file(dir, "de.lproj/Localizable.xliff", DE_DOCUMENT)?;
    Ok(dir.to_path_buf())
}

/// Deterministic counter: one token per four characters, rounded up
pub struct FixedTokenCounter;

impl TokenCounter for FixedTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

/// Reviewer replaying a fixed list of decisions
///
/// Records every request. Fails once the script is exhausted.
pub struct ScriptedReviewer {
    decisions: Mutex<VecDeque<ReviewDecision>>,
    requests: Mutex<Vec<ReviewRequest>>,
}

impl ScriptedReviewer {
    pub fn new(decisions: Vec<ReviewDecision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Approves everything it is shown
    pub fn approving() -> Self {
        Self::new(vec![ReviewDecision::Approve; 64])
    }

    pub fn requests(&self) -> Vec<ReviewRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Reviewer for ScriptedReviewer {
    async fn review(&self, request: &ReviewRequest) -> Result<ReviewDecision, TranslationError> {
        self.requests.lock().push(request.clone());
        self.decisions
            .lock()
            .pop_front()
            .ok_or_else(|| TranslationError::Review("script exhausted".to_string()))
    }
}

/// Entity with a fixed key and one empty target per language
pub fn entity_with_key(key: &str, source: &str, languages: &[(&str, &[&str])]) -> LocalizationEntity {
    let mut entity = LocalizationEntity::new(
        vec![key.to_string()],
        SourceText { code: "en".to_string(), value: source.to_string() },
    );
    entity.key = key.to_string();
    for (language, notes) in languages {
        entity = entity.with_target(
            *language,
            LocalizationTarget { notes: notes.iter().map(|n| n.to_string()).collect(), ..Default::default() },
        );
    }
    entity
}
