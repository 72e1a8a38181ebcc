// ============================================================
// Layer 2: FeatureTableUseCase
// ============================================================
// Builds one scalar feature row per document and writes the
// table as CSV:
//
//   Step 1: Load the annotated corpus        (Layer 4 - data)
//   Step 2: Load frequency table / targets   (Layer 4 - data)
//   Step 3: Build the tag table              (Layer 4 - data)
//   Step 4: Project + aggregate each doc     (Layer 4b - features)
//   Step 5: Attach targets, upscale          (Layer 4 - data)
//   Step 6: Write the CSV                    (Layer 6 - infra)
//
// A document without alphabetic tokens or content words has no
// defined feature row; it is skipped with a warning. Every other
// failure stops the run.
//
// The tag columns come from a fixed raw tag vocabulary when one
// is given, otherwise from the tags of the corpus itself. Either
// way the vocabulary used is written next to the CSV, and passing
// that file back in gives an inference table the training columns.

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::data::loader::{
    load_frequency_table, load_tag_map, load_tag_vocabulary, load_targets, JsonCorpusLoader,
};
use crate::data::projection::{project_document, ProjectionConfig};
use crate::data::resample::upscale_targets;
use crate::data::tag_map::{normalize_tags, TagMap, TagTable};
use crate::domain::{
    AnnotatedDocument, AnnotationSource, FeatureError, FrequencyTable, Labeled, TargetRecord,
};
use crate::features::base::gen_base_features;
use crate::features::word_vectors::{summarize_word_vectors, VectorSummary};
use crate::features::FeatureRow;
use crate::infra::table_writer::{tag_vocabulary_path, write_feature_table, write_tag_vocabulary};

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTableConfig {
    pub corpus: String,
    pub frequency_table: Option<String>,
    pub targets: Option<String>,
    pub output: String,
    pub projection: ProjectionConfig,
    /// Add per-dimension word-vector summaries
    pub word_vectors: Option<VectorSummary>,
    /// Add one frequency feature per canonical tag
    pub tag_features: bool,
    /// Custom tag map file; the default substitutions otherwise
    pub tag_map: Option<String>,
    /// Fixed raw tag vocabulary (JSON array); the corpus tags otherwise
    pub tag_vocabulary: Option<String>,
    /// Expected entity labels; entity features are added when set
    pub entity_labels: Option<Vec<String>>,
    /// Noisy replicates per labelled document; 1 disables upscaling
    pub n_rep: usize,
    pub seed: Option<u64>,
}

impl Default for FeatureTableConfig {
    fn default() -> Self {
        Self {
            corpus: "data/corpus.jsonl".to_string(),
            frequency_table: None,
            targets: None,
            output: "artifacts/features.csv".to_string(),
            projection: ProjectionConfig::default(),
            word_vectors: None,
            tag_features: true,
            tag_map: None,
            tag_vocabulary: None,
            entity_labels: None,
            n_rep: 1,
            seed: None,
        }
    }
}

// ─── DocumentFeatures ─────────────────────────────────────────────────────────
/// One document's scalar feature row, optionally labelled.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFeatures {
    pub id: String,
    pub values: FeatureRow,
    pub target: Option<f64>,
    pub standard_error: Option<f64>,
}

impl Labeled for DocumentFeatures {
    fn id(&self) -> &str {
        &self.id
    }

    fn target(&self) -> f64 {
        self.target.unwrap_or(0.0)
    }

    fn standard_error(&self) -> f64 {
        self.standard_error.unwrap_or(0.0)
    }

    fn with_target(&self, target: f64) -> Self {
        Self {
            target: Some(target),
            ..self.clone()
        }
    }
}

/// Tag table over every raw tag the collection uses.
pub fn collection_tag_table(docs: &[AnnotatedDocument], tag_map: Option<&TagMap>) -> TagTable {
    let tags: BTreeSet<&str> = docs
        .iter()
        .flat_map(|d| d.tokens.iter().map(|t| t.tag.as_str()))
        .collect();
    normalize_tags(tags, tag_map)
}

/// Tag table over a fixed raw vocabulary when given, over the
/// collection's own tags otherwise.
pub fn resolve_tag_table(
    docs: &[AnnotatedDocument],
    tag_map: Option<&TagMap>,
    vocabulary: Option<&[String]>,
) -> TagTable {
    match vocabulary {
        Some(tags) => normalize_tags(tags, tag_map),
        None => collection_tag_table(docs, tag_map),
    }
}

/// Everything `build_feature_rows` needs besides the documents.
pub struct FeatureInputs<'a> {
    pub freq: Option<&'a FrequencyTable>,
    pub targets: Option<&'a [TargetRecord]>,
    pub tag_table: Option<&'a TagTable>,
}

/// Build the feature rows of a collection, in collection order.
pub fn build_feature_rows<R: Rng + ?Sized>(
    docs: &[AnnotatedDocument],
    inputs: &FeatureInputs<'_>,
    cfg: &FeatureTableConfig,
    rng: &mut R,
) -> Result<Vec<DocumentFeatures>> {
    let targets: Option<HashMap<&str, &TargetRecord>> = inputs
        .targets
        .map(|t| t.iter().map(|r| (r.id.as_str(), r)).collect());

    let mut rows = Vec::with_capacity(docs.len());
    for doc in docs {
        let tables = project_document(doc, inputs.freq, &cfg.projection)?;

        let built = gen_base_features(
            &tables.tokens,
            &tables.sentences,
            Some(&tables.entities),
            inputs.tag_table,
            cfg.entity_labels.as_deref(),
        )
        .and_then(|mut values| {
            if let Some(mode) = &cfg.word_vectors {
                values.extend(summarize_word_vectors(&tables.tokens, mode)?);
            }
            Ok(values)
        });

        let values = match built {
            Ok(values) => values,
            Err(FeatureError::EmptyInput(reason)) => {
                tracing::warn!("Skipping document '{}': {}", doc.id, reason);
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("Document '{}'", doc.id)),
        };

        let (target, standard_error) = match &targets {
            Some(t) => {
                let record = t
                    .get(doc.id.as_str())
                    .ok_or_else(|| FeatureError::MissingTarget(doc.id.clone()))?;
                (Some(record.target), Some(record.standard_error))
            }
            None => (None, None),
        };

        tracing::debug!("Built {} features for '{}'", values.len(), doc.id);
        rows.push(DocumentFeatures {
            id: doc.id.clone(),
            values,
            target,
            standard_error,
        });
    }

    if cfg.n_rep > 1 {
        if inputs.targets.is_none() {
            bail!("Noisy replicates (n_rep = {}) need a target table", cfg.n_rep);
        }
        rows = upscale_targets(&rows, cfg.n_rep, rng)?;
    }

    Ok(rows)
}

// ─── FeatureTableUseCase ──────────────────────────────────────────────────────
pub struct FeatureTableUseCase {
    config: FeatureTableConfig,
}

impl FeatureTableUseCase {
    pub fn new(config: FeatureTableConfig) -> Self {
        Self { config }
    }

    /// Run the whole pipeline; returns the number of rows written.
    pub fn execute(&self) -> Result<usize> {
        let cfg = &self.config;

        // ── Step 1: Load the annotated corpus ────────────────────────────────
        let docs = JsonCorpusLoader::new(&cfg.corpus).load_all()?;
        if docs.is_empty() {
            bail!("Corpus '{}' contains no documents", cfg.corpus);
        }

        // ── Step 2: Optional inputs ──────────────────────────────────────────
        let freq = cfg.frequency_table.as_ref().map(load_frequency_table).transpose()?;
        let targets = cfg.targets.as_ref().map(load_targets).transpose()?;

        // ── Step 3: Tag table ────────────────────────────────────────────────
        let tag_table = if cfg.tag_features {
            let custom = cfg.tag_map.as_ref().map(load_tag_map).transpose()?;
            let vocabulary = cfg.tag_vocabulary.as_ref().map(load_tag_vocabulary).transpose()?;
            let table = resolve_tag_table(&docs, custom.as_ref(), vocabulary.as_deref());
            tracing::info!(
                "Tag table: {} raw tags, {} canonical",
                table.len(),
                table.canonical_vocabulary().len()
            );
            Some(table)
        } else {
            None
        };

        // ── Steps 4-5: Feature rows ──────────────────────────────────────────
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let inputs = FeatureInputs {
            freq: freq.as_ref(),
            targets: targets.as_deref(),
            tag_table: tag_table.as_ref(),
        };
        let rows = build_feature_rows(&docs, &inputs, cfg, &mut rng)?;
        tracing::info!("Built {} feature rows from {} documents", rows.len(), docs.len());

        // ── Step 6: Write ────────────────────────────────────────────────────
        let output = Path::new(&cfg.output);
        write_feature_table(output, &rows)?;
        if let Some(table) = &tag_table {
            write_tag_vocabulary(&tag_vocabulary_path(output), table)?;
        }
        tracing::info!("Feature table written to '{}'", cfg.output);

        Ok(rows.len())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::projection::fixtures;
    use std::fs;

    fn docs() -> Vec<AnnotatedDocument> {
        vec![fixtures::fox_document(), fixtures::sized_document("river", 9)]
    }

    fn no_inputs() -> FeatureInputs<'static> {
        FeatureInputs {
            freq: None,
            targets: None,
            tag_table: None,
        }
    }

    #[test]
    fn test_rows_share_one_key_set() {
        let docs = docs();
        let table = collection_tag_table(&docs, None);
        let inputs = FeatureInputs {
            tag_table: Some(&table),
            ..no_inputs()
        };
        let cfg = FeatureTableConfig {
            word_vectors: Some(VectorSummary::default()),
            entity_labels: Some(vec!["ORG".into(), "PERSON".into()]),
            ..FeatureTableConfig::default()
        };
        let rows = build_feature_rows(&docs, &inputs, &cfg, &mut StdRng::seed_from_u64(0)).unwrap();

        assert_eq!(rows.len(), 2);
        let keys0: Vec<&String> = rows[0].values.keys().collect();
        let keys1: Vec<&String> = rows[1].values.keys().collect();
        assert_eq!(keys0, keys1);
        // VBZ only occurs in the second document but is a key of both
        assert_eq!(rows[0].values["VBZ"], 0.0);
        assert!(rows[0].values.contains_key("vec_0_q20"));
        assert_eq!(rows[1].values["ORG"], 0.0);
    }

    #[test]
    fn test_documents_without_words_are_skipped() {
        let mut docs = docs();
        docs[0].tokens.retain(|t| t.is_punct);
        docs[0].entities.clear();
        let rows = build_feature_rows(&docs, &no_inputs(), &FeatureTableConfig::default(), &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "river");
    }

    #[test]
    fn test_targets_attached_and_upscaled() {
        let docs = docs();
        let targets = vec![TargetRecord::new("fox", 1.0, 0.2), TargetRecord::new("river", -1.0, 0.0)];
        let inputs = FeatureInputs {
            targets: Some(&targets),
            ..no_inputs()
        };
        let cfg = FeatureTableConfig {
            n_rep: 3,
            ..FeatureTableConfig::default()
        };
        let rows = build_feature_rows(&docs, &inputs, &cfg, &mut StdRng::seed_from_u64(4)).unwrap();

        assert_eq!(rows.len(), 6);
        assert!(rows[..3].iter().all(|r| r.id == "fox" && r.standard_error == Some(0.2)));
        assert!(rows[3..].iter().all(|r| r.target == Some(-1.0)));
        assert_eq!(rows[0].values, rows[2].values);
    }

    #[test]
    fn test_missing_target_stops_the_run() {
        let docs = docs();
        let targets = vec![TargetRecord::new("fox", 1.0, 0.2)];
        let inputs = FeatureInputs {
            targets: Some(&targets),
            ..no_inputs()
        };
        let err = build_feature_rows(&docs, &inputs, &FeatureTableConfig::default(), &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FeatureError>(),
            Some(FeatureError::MissingTarget(id)) if id == "river"
        ));
    }

    #[test]
    fn test_replicates_need_targets() {
        let cfg = FeatureTableConfig {
            n_rep: 2,
            ..FeatureTableConfig::default()
        };
        assert!(build_feature_rows(&docs(), &no_inputs(), &cfg, &mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn test_execute_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.jsonl");
        let lines: Vec<String> = docs().iter().map(|d| serde_json::to_string(d).unwrap()).collect();
        fs::write(&corpus, lines.join("\n")).unwrap();
        let output = dir.path().join("out").join("features.csv");

        let cfg = FeatureTableConfig {
            corpus: corpus.to_string_lossy().into_owned(),
            output: output.to_string_lossy().into_owned(),
            seed: Some(1),
            ..FeatureTableConfig::default()
        };
        let n = FeatureTableUseCase::new(cfg).execute().unwrap();
        assert_eq!(n, 2);

        let text = fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("id,"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_fixed_tag_vocabulary_gives_identical_keys() {
        let train = vec![fixtures::fox_document()];
        let infer = vec![fixtures::sized_document("z", 6)];
        let vocabulary = collection_tag_table(&train, None).raw_tags();

        let keys = |docs: &[AnnotatedDocument]| -> Vec<String> {
            let table = resolve_tag_table(docs, None, Some(&vocabulary));
            let inputs = FeatureInputs {
                tag_table: Some(&table),
                ..no_inputs()
            };
            let rows = build_feature_rows(docs, &inputs, &FeatureTableConfig::default(), &mut StdRng::seed_from_u64(0))
                .unwrap();
            rows[0].values.keys().cloned().collect()
        };

        let train_keys = keys(&train);
        assert_eq!(train_keys, keys(&infer));
        // a tag outside the vocabulary adds no column
        assert!(!train_keys.contains(&"VBZ".to_string()));
    }

    #[test]
    fn test_saved_vocabulary_reproduces_training_columns() {
        let dir = tempfile::tempdir().unwrap();
        let write_corpus = |name: &str, docs: &[AnnotatedDocument]| {
            let lines: Vec<String> = docs.iter().map(|d| serde_json::to_string(d).unwrap()).collect();
            let path = dir.path().join(name);
            fs::write(&path, lines.join("\n")).unwrap();
            path.to_string_lossy().into_owned()
        };
        let train_corpus = write_corpus("train.jsonl", &[fixtures::fox_document()]);
        let infer_corpus = write_corpus("infer.jsonl", &[fixtures::sized_document("z", 6)]);
        let train_out = dir.path().join("train.csv");
        let infer_out = dir.path().join("infer.csv");

        FeatureTableUseCase::new(FeatureTableConfig {
            corpus: train_corpus,
            output: train_out.to_string_lossy().into_owned(),
            ..FeatureTableConfig::default()
        })
        .execute()
        .unwrap();
        let vocabulary = tag_vocabulary_path(&train_out);
        assert!(vocabulary.exists());

        FeatureTableUseCase::new(FeatureTableConfig {
            corpus: infer_corpus,
            output: infer_out.to_string_lossy().into_owned(),
            tag_vocabulary: Some(vocabulary.to_string_lossy().into_owned()),
            ..FeatureTableConfig::default()
        })
        .execute()
        .unwrap();

        let header = |p: &Path| fs::read_to_string(p).unwrap().lines().next().unwrap().to_string();
        assert_eq!(header(&train_out), header(&infer_out));
    }
}
