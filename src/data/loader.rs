// ============================================================
// Layer 4: Input Loaders
// ============================================================
// Reads the three inputs of the pipeline from disk:
//
//   annotated corpus   → Vec<AnnotatedDocument>
//       either a JSON Lines file (one document per line)
//       or a directory of *.json files (one document per file)
//
//   frequency table    → FrequencyTable
//       a JSON object  { "word": count, ... }
//
//   targets            → Vec<TargetRecord>
//       a JSON array   [ { "id", "target", "standard_error" }, ... ]
//
//   custom tag map     → TagMap
//       a JSON object  { "raw tag": "canonical tag", ... }
//
// The annotation itself comes from an external NLP service; this
// module only deserialises its output.

use anyhow::{bail, Context, Result};
use std::{fs, path::Path};

use crate::data::tag_map::TagMap;
use crate::domain::{AnnotatedDocument, AnnotationSource, FrequencyTable, TargetRecord};

/// Loads annotated documents from a JSONL file or a directory of JSON files.
/// Implements the AnnotationSource trait from Layer 3.
pub struct JsonCorpusLoader {
    path: String,
}

impl JsonCorpusLoader {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl AnnotationSource for JsonCorpusLoader {
    fn load_all(&self) -> Result<Vec<AnnotatedDocument>> {
        let path = Path::new(&self.path);

        if !path.exists() {
            bail!("Corpus path '{}' does not exist", self.path);
        }

        let docs = if path.is_dir() {
            load_directory(path)?
        } else {
            load_jsonl(path)?
        };

        tracing::info!("Loaded {} annotated documents from '{}'", docs.len(), self.path);
        Ok(docs)
    }
}

/// One document per non-blank line. A line that does not parse is fatal.
fn load_jsonl(path: &Path) -> Result<Vec<AnnotatedDocument>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    let mut docs = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: AnnotatedDocument = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid annotated document", path.display(), n + 1))?;
        tracing::debug!("Loaded: {} ({} tokens)", doc.id, doc.tokens.len());
        docs.push(doc);
    }
    Ok(docs)
}

/// Every `*.json` file in `dir`, in file-name order. Files that fail to
/// parse are skipped with a warning.
fn load_directory(dir: &Path) -> Result<Vec<AnnotatedDocument>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut docs = Vec::new();
    for path in paths {
        match load_single_document(&path) {
            Ok(doc) => {
                tracing::debug!("Loaded: {} ({} tokens)", doc.id, doc.tokens.len());
                docs.push(doc);
            }
            Err(e) => {
                tracing::warn!("Skipping '{}': {:#}", path.display(), e);
            }
        }
    }
    Ok(docs)
}

fn load_single_document(path: &Path) -> Result<AnnotatedDocument> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid annotated document in '{}'", path.display()))
}

/// Load a word → count table.
pub fn load_frequency_table(path: impl AsRef<Path>) -> Result<FrequencyTable> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read frequency table '{}'", path.display()))?;
    let table: FrequencyTable = serde_json::from_str(&text)
        .with_context(|| format!("Invalid frequency table in '{}'", path.display()))?;

    tracing::info!("Loaded frequency table with {} words", table.len());
    Ok(table)
}

/// Load per-document targets.
pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<TargetRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read targets '{}'", path.display()))?;
    let targets: Vec<TargetRecord> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid targets in '{}'", path.display()))?;

    tracing::info!("Loaded {} targets", targets.len());
    Ok(targets)
}

/// Load a custom raw → canonical tag map.
pub fn load_tag_map(path: impl AsRef<Path>) -> Result<TagMap> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read tag map '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid tag map in '{}'", path.display()))
}

/// Load a fixed raw tag vocabulary, a JSON array of tags.
pub fn load_tag_vocabulary(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read tag vocabulary '{}'", path.display()))?;
    let tags: Vec<String> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid tag vocabulary in '{}'", path.display()))?;
    if tags.is_empty() {
        bail!("Tag vocabulary '{}' is empty", path.display());
    }
    Ok(tags)
}
