// ============================================================
// Layer 2: AssembleUseCase
// ============================================================
// Orchestrates tensor assembly for a whole collection:
//
//   Step 1: Load corpus, frequency table, targets  (Layer 4 - data)
//   Step 2: Load a training run, if reusing one     (Layer 6 - infra)
//   Step 3: Build the tag table                    (Layer 4 - data)
//   Step 4: Raw per-token rows per document        (Layer 4b - features)
//   Step 5: Assemble the tensor                    (Layer 4 - data)
//   Step 6: Persist artifacts                      (Layer 6 - infra)
//
// Training runs resolve their own column schema and save it.
// Inference runs point `schema_from` at a training run's artifact
// directory so the new tensor has exactly the training columns.
// That run's row filters and tag vocabulary replace the ones given
// for the inference run.

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::application::feature_use_case::resolve_tag_table;
use crate::data::assembler::{
    assemble_training_data, AssemblyConfig, ColumnSchema, DocumentRows, TrainingData,
};
use crate::data::loader::{
    load_frequency_table, load_tag_map, load_tag_vocabulary, load_targets, JsonCorpusLoader,
};
use crate::data::projection::{project_document, ProjectionConfig};
use crate::data::tag_map::TagTable;
use crate::domain::{AnnotatedDocument, AnnotationSource, FrequencyTable};
use crate::features::raw::{gen_raw_word_features, RawFeatureConfig};
use crate::infra::schema_store::SchemaStore;
use crate::infra::table_writer::write_aux_table;

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembleConfig {
    pub corpus: String,
    pub frequency_table: Option<String>,
    pub targets: Option<String>,
    pub artifacts_dir: String,
    /// Artifact directory of a training run whose schema is enforced
    pub schema_from: Option<String>,
    /// Add one-hot tag columns
    pub tag_columns: bool,
    pub tag_map: Option<String>,
    /// Fixed raw tag vocabulary (JSON array); overrides a reused run's
    pub tag_vocabulary: Option<String>,
    pub raw: RawFeatureConfig,
    pub assembly: AssemblyConfig,
}

impl Default for AssembleConfig {
    fn default() -> Self {
        Self {
            corpus: "data/corpus.jsonl".to_string(),
            frequency_table: None,
            targets: None,
            artifacts_dir: "artifacts".to_string(),
            schema_from: None,
            tag_columns: true,
            tag_map: None,
            tag_vocabulary: None,
            raw: RawFeatureConfig::default(),
            assembly: AssemblyConfig::default(),
        }
    }
}

/// Per-token rows and sentence records of every document.
pub fn prepare_documents(
    docs: &[AnnotatedDocument],
    tag_table: Option<&TagTable>,
    freq: Option<&FrequencyTable>,
    raw_cfg: &RawFeatureConfig,
) -> Result<Vec<DocumentRows>> {
    docs.iter()
        .map(|doc| -> Result<DocumentRows> {
            let raw = gen_raw_word_features(doc, tag_table, freq, raw_cfg)
                .with_context(|| format!("Raw features for document '{}'", doc.id))?;
            let sentences = project_document(doc, None, &ProjectionConfig::default())?.sentences;
            tracing::debug!("Document '{}': {} rows", doc.id, raw.len());
            Ok(DocumentRows { raw, sentences })
        })
        .collect()
}

/// What an inference run takes over from its training run.
struct TrainingRun {
    schema: ColumnSchema,
    assembly: AssemblyConfig,
    tag_vocabulary: Option<Vec<String>>,
}

impl TrainingRun {
    fn load(dir: &str) -> Result<Self> {
        let store = SchemaStore::open(dir);
        Ok(Self {
            schema: store.load_schema()?,
            assembly: store.load_config()?,
            tag_vocabulary: store.load_tag_vocabulary()?,
        })
    }
}

/// Inference rows must be filtered exactly like the training rows.
fn with_training_filters(cfg: &AssemblyConfig, training: &AssemblyConfig) -> AssemblyConfig {
    AssemblyConfig {
        drop_cols: training.drop_cols.clone(),
        rem_punct: training.rem_punct,
        rem_stop: training.rem_stop,
        min_stop_len: training.min_stop_len,
        ..cfg.clone()
    }
}

// ─── AssembleUseCase ──────────────────────────────────────────────────────────
pub struct AssembleUseCase {
    config: AssembleConfig,
}

impl AssembleUseCase {
    pub fn new(config: AssembleConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainingData> {
        let cfg = &self.config;

        // ── Step 1: Inputs ───────────────────────────────────────────────────
        let docs = JsonCorpusLoader::new(&cfg.corpus).load_all()?;
        if docs.is_empty() {
            bail!("Corpus '{}' contains no documents", cfg.corpus);
        }
        let freq = cfg.frequency_table.as_ref().map(load_frequency_table).transpose()?;
        let targets = cfg.targets.as_ref().map(load_targets).transpose()?;

        // ── Step 2: Training run being reused ────────────────────────────────
        let training = cfg.schema_from.as_deref().map(TrainingRun::load).transpose()?;
        let assembly = match &training {
            Some(run) => {
                tracing::info!(
                    "Enforcing schema from '{}' ({} columns)",
                    cfg.schema_from.as_deref().unwrap_or_default(),
                    run.schema.columns.len()
                );
                with_training_filters(&cfg.assembly, &run.assembly)
            }
            None => cfg.assembly.clone(),
        };

        // ── Step 3: Tag table ────────────────────────────────────────────────
        let tag_table = if cfg.tag_columns {
            let custom = cfg.tag_map.as_ref().map(load_tag_map).transpose()?;
            let vocabulary = match &cfg.tag_vocabulary {
                Some(path) => Some(load_tag_vocabulary(path)?),
                None => training.as_ref().and_then(|run| run.tag_vocabulary.clone()),
            };
            Some(resolve_tag_table(&docs, custom.as_ref(), vocabulary.as_deref()))
        } else {
            None
        };

        // ── Step 4: Raw rows ─────────────────────────────────────────────────
        let rows = prepare_documents(&docs, tag_table.as_ref(), freq.as_ref(), &cfg.raw)?;

        // ── Step 5: Assemble ─────────────────────────────────────────────────
        let mut rng = match assembly.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let data = assemble_training_data(
            &rows,
            targets.as_deref(),
            training.as_ref().map(|run| &run.schema),
            &assembly,
            &mut rng,
        )
        .context("Tensor assembly failed")?;
        tracing::info!("Assembled tensor of shape {:?}", data.tensor.shape);

        // ── Step 6: Persist ──────────────────────────────────────────────────
        let store = SchemaStore::new(&cfg.artifacts_dir)?;
        persist(&store, &assembly, &data)?;
        if let Some(table) = &tag_table {
            store.save_tag_vocabulary(table)?;
        }
        tracing::info!("Artifacts written to '{}'", cfg.artifacts_dir);

        Ok(data)
    }
}

fn persist(store: &SchemaStore, assembly: &AssemblyConfig, data: &TrainingData) -> Result<()> {
    store.save_schema(&data.schema)?;
    store.save_config(assembly)?;
    store.save_tensor(&data.tensor)?;
    store.save_groups(&data.groups)?;
    if let Some(targets) = &data.targets {
        store.save_targets(targets)?;
    }
    if let Some(aggregates) = &data.aggregates {
        write_aux_table(&store.path("aggregates.csv"), aggregates, &data.groups)?;
    }
    for table in &data.quantiles {
        write_aux_table(&store.path(&format!("{}.csv", table.name)), table, &data.groups)?;
    }
    Ok(())
}
