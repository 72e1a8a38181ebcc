// ============================================================
// Layer 4: Training Tensor Assembler
// ============================================================
// Turns the per-token feature tables of a whole collection into
// one fixed-shape training tensor. Steps, in order:
//
//   1. Auxiliary tables   per-document aggregates and quantiles,
//                         computed from the untouched rows while
//                         every row still knows its document
//   2. Align columns      union of per-document columns; one-hot
//                         tag columns a document lacks are 0
//   3. Drop columns       configured identifier / unused columns
//   4. Filter rows        optional: punctuation, short stopwords
//   5. Resolve schema     zero-variance columns dropped over the
//                         WHOLE collection, or a persisted schema
//                         enforced as-is (inference)
//   6. Resample           even_upsample per document
//   7. Noisy targets      target + (1 - group_mean / doc_mean)
//                                  · standard_error · multiplier
//   8. Stack              (example, row, feature, 1)
//
// Step 5 is the one global synchronisation point: it has to see
// every document before a single column can be judged constant,
// and it finishes before any resampling starts.
//
// Examples are ordered by (document id, group id). Targets and
// re-expanded auxiliary rows follow the same order.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::resample::{even_upsample, ResampleConfig};
use crate::domain::{FeatureError, FeatureResult, SentenceRecord, TargetRecord};
use crate::features::raw::{is_tag_column, RawFeatureTable};
use crate::features::stats::{mean, quantile_sorted, sorted};

/// Identifier fields that are never numeric columns but may appear in
/// `drop_cols` for symmetry with the raw table layout.
const IDENTIFIER_FIELDS: [&str; 1] = ["word"];

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Per-token columns averaged per document
    pub columns: Vec<String>,
    /// Divisor of the mean sentence length
    pub words_per_sent_scale: f64,
    /// Divisor of the mean noun-chunk count per sentence
    pub noun_chunks_per_sent_scale: f64,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            columns: vec!["length".into(), "comm_score".into(), "stop".into()],
            words_per_sent_scale: 25.0,
            noun_chunks_per_sent_scale: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileConfig {
    /// One quantile table per listed column
    pub columns: Vec<String>,
    /// Breakpoints in [0, 1]
    pub quantiles: Vec<f64>,
}

impl Default for QuantileConfig {
    fn default() -> Self {
        Self {
            columns: vec!["length".into(), "comm_score".into()],
            quantiles: vec![0.1, 0.25, 0.5, 0.75, 0.9],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    pub drop_cols: Vec<String>,
    pub rem_punct: bool,
    pub rem_stop: bool,
    /// Stopword rows with a normalised length below this are removed
    pub min_stop_len: f64,
    /// None keeps every document whole as group 0
    pub resample: Option<ResampleConfig>,
    /// Column whose per-group deviation drives target noise
    pub tgt_noise_var: String,
    pub tgt_noise_mult: f64,
    /// Seed of the random source; None draws one from the OS
    pub seed: Option<u64>,
    pub aggregates: Option<AggregateConfig>,
    pub quantiles: Option<QuantileConfig>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            drop_cols: vec!["seq".into(), "word".into(), "alpha".into()],
            rem_punct: false,
            rem_stop: false,
            min_stop_len: 0.3,
            resample: Some(ResampleConfig::default()),
            tgt_noise_var: "length".into(),
            tgt_noise_mult: 2.0,
            seed: None,
            aggregates: None,
            quantiles: None,
        }
    }
}

// ─── Inputs and outputs ───────────────────────────────────────────────────────
/// One document as the assembler sees it.
#[derive(Debug, Clone)]
pub struct DocumentRows {
    pub raw: RawFeatureTable,
    pub sentences: Vec<SentenceRecord>,
}

/// The resolved tensor column set. Persist it after training and hand
/// it back at inference so both see exactly the same columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Tensor feature columns, in tensor order
    pub columns: Vec<String>,
    /// Candidate columns removed for having zero variance
    pub dropped: Vec<String>,
}

impl ColumnSchema {
    /// Compare the candidate columns of a new collection to this schema.
    ///
    /// A one-hot tag column may be absent (no token carried that tag);
    /// any other absent column, or a column this schema has never seen,
    /// is a mismatch.
    pub fn check(&self, candidates: &[String]) -> FeatureResult<()> {
        let present: HashSet<&str> = candidates.iter().map(String::as_str).collect();
        let known: HashSet<&str> = self
            .columns
            .iter()
            .chain(self.dropped.iter())
            .map(String::as_str)
            .collect();

        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !present.contains(c.as_str()) && !is_tag_column(c))
            .cloned()
            .collect();
        let unexpected: Vec<String> = candidates
            .iter()
            .filter(|c| !known.contains(c.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(FeatureError::SchemaMismatch { missing, unexpected })
        }
    }
}

/// (document id, group id): the identity of one training example.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub id: String,
    pub group_id: usize,
}

/// Row-major 4-D tensor of shape (example, row, feature, 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingTensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

impl TrainingTensor {
    /// The rows x features block of one example.
    pub fn example(&self, i: usize) -> &[f32] {
        let size = self.shape[1] * self.shape[2] * self.shape[3];
        &self.data[i * size..(i + 1) * size]
    }

    pub fn n_examples(&self) -> usize {
        self.shape[0]
    }
}

/// A per-example side table; row `i` belongs to example `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingData {
    pub tensor: TrainingTensor,
    pub targets: Option<Vec<f64>>,
    pub groups: Vec<GroupKey>,
    pub schema: ColumnSchema,
    pub aggregates: Option<AuxTable>,
    pub quantiles: Vec<AuxTable>,
}

// ─── Working frame ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
struct FrameRow {
    seq: usize,
    /// Value of the target-noise proxy column, captured before any drop
    proxy: f64,
    values: Vec<f64>,
}

#[derive(Debug, Clone)]
struct FrameDoc {
    id: String,
    rows: Vec<FrameRow>,
}

#[derive(Debug, Clone)]
struct Frame {
    columns: Vec<String>,
    docs: Vec<FrameDoc>,
}

impl Frame {
    /// Align every document onto the union of their columns.
    fn align(docs: &[DocumentRows], proxy: Option<&str>) -> FeatureResult<Self> {
        let first = docs
            .iter()
            .find(|d| !d.raw.rows.is_empty())
            .map(|d| &d.raw)
            .ok_or_else(|| FeatureError::EmptyInput("no document has rows".to_string()))?;
        let base: Vec<String> = first
            .columns
            .iter()
            .filter(|c| !is_tag_column(c))
            .cloned()
            .collect();
        let tags: BTreeSet<String> = docs
            .iter()
            .flat_map(|d| d.raw.columns.iter().filter(|c| is_tag_column(c)).cloned())
            .collect();

        let columns: Vec<String> = base.iter().cloned().chain(tags).collect();
        let position: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let mut frame_docs = Vec::with_capacity(docs.len());
        for doc in docs {
            let raw = &doc.raw;
            let doc_base: Vec<&String> = raw.columns.iter().filter(|c| !is_tag_column(c)).collect();
            if doc_base.len() != base.len() || doc_base.iter().zip(&base).any(|(a, b)| *a != b) {
                return Err(FeatureError::InvalidParameter(format!(
                    "document '{}' has columns {:?}, expected {:?}",
                    raw.id, doc_base, base
                )));
            }

            let proxy_idx = match proxy {
                Some(name) => Some(
                    raw.column_index(name)
                        .ok_or_else(|| FeatureError::UnknownColumn(name.to_string()))?,
                ),
                None => None,
            };

            let targets: Vec<usize> = raw.columns.iter().map(|c| position[c.as_str()]).collect();
            let rows = raw
                .rows
                .iter()
                .map(|r| {
                    let mut values = vec![0.0; columns.len()];
                    for (v, &t) in r.values.iter().zip(&targets) {
                        values[t] = *v;
                    }
                    FrameRow {
                        seq: r.seq,
                        proxy: proxy_idx.map(|i| r.values[i]).unwrap_or(0.0),
                        values,
                    }
                })
                .collect();

            frame_docs.push(FrameDoc {
                id: raw.id.clone(),
                rows,
            });
        }

        Ok(Self {
            columns,
            docs: frame_docs,
        })
    }

    fn index(&self, name: &str) -> FeatureResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| FeatureError::UnknownColumn(name.to_string()))
    }

    fn drop_column(&mut self, name: &str) -> FeatureResult<()> {
        let idx = self.index(name)?;
        self.columns.remove(idx);
        for doc in &mut self.docs {
            for row in &mut doc.rows {
                row.values.remove(idx);
            }
        }
        Ok(())
    }

    fn retain_rows(&mut self, keep: impl Fn(&[f64]) -> bool) {
        for doc in &mut self.docs {
            doc.rows.retain(|r| keep(&r.values));
        }
    }

    fn n_rows(&self) -> usize {
        self.docs.iter().map(|d| d.rows.len()).sum()
    }

    /// Columns holding a single value across every row of the collection.
    fn zero_variance_columns(&self) -> Vec<String> {
        if self.n_rows() < 2 {
            return Vec::new();
        }

        let mut rows = self.docs.iter().flat_map(|d| d.rows.iter());
        let Some(first) = rows.next() else {
            return Vec::new();
        };
        let mut constant = vec![true; self.columns.len()];
        for row in rows {
            for (c, (a, b)) in constant.iter_mut().zip(first.values.iter().zip(&row.values)) {
                if a != b {
                    *c = false;
                }
            }
        }

        self.columns
            .iter()
            .zip(constant)
            .filter(|(_, c)| *c)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Rebuild every row on exactly `columns`, zero-filling columns the
    /// frame does not have.
    fn select(&mut self, columns: &[String]) {
        let source: Vec<Option<usize>> = columns
            .iter()
            .map(|c| self.columns.iter().position(|x| x == c))
            .collect();

        for doc in &mut self.docs {
            for row in &mut doc.rows {
                row.values = source
                    .iter()
                    .map(|s| s.map(|i| row.values[i]).unwrap_or(0.0))
                    .collect();
            }
        }
        self.columns = columns.to_vec();
    }
}

// ─── Assembly ─────────────────────────────────────────────────────────────────
/// Assemble the training tensor for a collection of documents.
///
/// * `targets` - one row per document id; required for every document
///               when given
/// * `schema`  - a previously resolved column set; when None the column
///               set is resolved from this collection
pub fn assemble_training_data<R>(
    docs: &[DocumentRows],
    targets: Option<&[TargetRecord]>,
    schema: Option<&ColumnSchema>,
    cfg: &AssemblyConfig,
    rng: &mut R,
) -> FeatureResult<TrainingData>
where
    R: Rng + ?Sized,
{
    if docs.is_empty() {
        return Err(FeatureError::EmptyInput("empty document collection".to_string()));
    }
    let mut seen = HashSet::new();
    for doc in docs {
        if !seen.insert(doc.raw.id.as_str()) {
            return Err(FeatureError::InvalidParameter(format!(
                "duplicate document id '{}'",
                doc.raw.id
            )));
        }
        // a token-less document has no vector columns either
        if doc.raw.rows.is_empty() {
            return Err(FeatureError::EmptyDocument(doc.raw.id.clone()));
        }
    }

    // ── Step 1: Auxiliary tables from the untouched rows ─────────────────────
    let aggregates = match &cfg.aggregates {
        Some(agg) => Some(aggregate_rows(docs, agg)?),
        None => None,
    };
    let quantiles = match &cfg.quantiles {
        Some(q) => quantile_rows(docs, q)?,
        None => Vec::new(),
    };

    // ── Step 2: Align columns ─────────────────────────────────────────────────
    let proxy = targets.map(|_| cfg.tgt_noise_var.as_str());
    let mut frame = Frame::align(docs, proxy)?;

    // ── Step 3: Drop configured columns ───────────────────────────────────────
    for name in &cfg.drop_cols {
        if IDENTIFIER_FIELDS.contains(&name.as_str()) {
            continue;
        }
        frame.drop_column(name)?;
    }

    // ── Step 4: Row filters ───────────────────────────────────────────────────
    if cfg.rem_punct {
        let punct = frame.index("punct")?;
        frame.retain_rows(|v| v[punct] == 0.0);
        frame.drop_column("punct")?;
    }
    if cfg.rem_stop {
        let stop = frame.index("stop")?;
        let length = frame.index("length")?;
        let min_len = cfg.min_stop_len;
        frame.retain_rows(|v| v[stop] == 0.0 || v[length] >= min_len);
        frame.drop_column("stop")?;
    }

    // ── Step 5: Resolve the column set over the whole collection ─────────────
    let schema = match schema {
        Some(s) => {
            s.check(&frame.columns)?;
            s.clone()
        }
        None => {
            let dropped = frame.zero_variance_columns();
            let columns = frame
                .columns
                .iter()
                .filter(|c| !dropped.contains(c))
                .cloned()
                .collect();
            ColumnSchema { columns, dropped }
        }
    };
    if schema.columns.is_empty() {
        return Err(FeatureError::EmptyInput(
            "no feature columns left after column resolution".to_string(),
        ));
    }
    frame.select(&schema.columns);
    tracing::info!(
        "Resolved {} feature columns ({} zero-variance columns dropped)",
        schema.columns.len(),
        schema.dropped.len()
    );

    // ── Step 6: Resample per document, in document id order ──────────────────
    let mut by_id: BTreeMap<&str, &FrameDoc> = BTreeMap::new();
    for doc in &frame.docs {
        by_id.insert(doc.id.as_str(), doc);
    }

    let mut groups: Vec<(GroupKey, Vec<FrameRow>)> = Vec::new();
    for (id, doc) in &by_id {
        if doc.rows.is_empty() {
            return Err(FeatureError::EmptyDocument(id.to_string()));
        }
        match cfg.resample {
            Some(rs) => {
                for rep in even_upsample(&doc.rows, rs.n_row, rs.n_rep, rng)? {
                    let key = GroupKey {
                        id: id.to_string(),
                        group_id: rep.group_id,
                    };
                    groups.push((key, rep.rows));
                }
            }
            None => {
                let mut rows = doc.rows.clone();
                rows.sort_by_key(|r| r.seq);
                let key = GroupKey {
                    id: id.to_string(),
                    group_id: 0,
                };
                groups.push((key, rows));
            }
        }
    }

    let n_row = groups[0].1.len();
    if let Some((key, _)) = groups.iter().find(|(_, rows)| rows.len() != n_row) {
        return Err(FeatureError::InvalidParameter(format!(
            "document '{}' has a different row count; enable resampling to stack documents of different lengths",
            key.id
        )));
    }
    tracing::debug!("Built {} resample groups of {} rows", groups.len(), n_row);

    // ── Step 7: Noisy targets ─────────────────────────────────────────────────
    let targets = match targets {
        Some(t) => Some(noisy_targets(&groups, t, cfg.tgt_noise_mult)?),
        None => None,
    };

    // ── Step 8: Stack ─────────────────────────────────────────────────────────
    let n_feat = schema.columns.len();
    let mut data = Vec::with_capacity(groups.len() * n_row * n_feat);
    for (_, rows) in &groups {
        for row in rows {
            data.extend(row.values.iter().map(|&v| v as f32));
        }
    }
    let tensor = TrainingTensor {
        shape: [groups.len(), n_row, n_feat, 1],
        data,
    };

    // ── Re-expand auxiliary tables to one row per example ─────────────────────
    let keys: Vec<GroupKey> = groups.into_iter().map(|(k, _)| k).collect();
    let aggregates = aggregates.map(|t| expand(t, &keys));
    let quantiles = quantiles.into_iter().map(|t| expand(t, &keys)).collect();

    Ok(TrainingData {
        tensor,
        targets,
        groups: keys,
        schema,
        aggregates,
        quantiles,
    })
}

/// target + (1 - group_mean / doc_mean) * standard_error * mult, per group.
fn noisy_targets(
    groups: &[(GroupKey, Vec<FrameRow>)],
    targets: &[TargetRecord],
    mult: f64,
) -> FeatureResult<Vec<f64>> {
    let lookup: HashMap<&str, &TargetRecord> = targets.iter().map(|t| (t.id.as_str(), t)).collect();

    let group_means: Vec<f64> = groups
        .iter()
        .map(|(_, rows)| {
            let proxy: Vec<f64> = rows.iter().map(|r| r.proxy).collect();
            mean(&proxy).unwrap_or(0.0)
        })
        .collect();

    let mut doc_means: HashMap<&str, Vec<f64>> = HashMap::new();
    for ((key, _), m) in groups.iter().zip(&group_means) {
        doc_means.entry(key.id.as_str()).or_default().push(*m);
    }
    let doc_means: HashMap<&str, f64> = doc_means
        .into_iter()
        .map(|(id, ms)| (id, mean(&ms).unwrap_or(0.0)))
        .collect();

    groups
        .iter()
        .zip(group_means)
        .map(|((key, _), group_mean)| -> FeatureResult<f64> {
            let record = lookup
                .get(key.id.as_str())
                .ok_or_else(|| FeatureError::MissingTarget(key.id.clone()))?;
            let doc_mean = doc_means[key.id.as_str()];
            let deviation = if doc_mean == 0.0 {
                0.0
            } else {
                1.0 - group_mean / doc_mean
            };
            Ok(record.target + deviation * record.standard_error * mult)
        })
        .collect()
}

/// One row per document: configured column means plus scaled sentence
/// aggregates.
fn aggregate_rows(docs: &[DocumentRows], cfg: &AggregateConfig) -> FeatureResult<DocTable> {
    let mut columns: Vec<String> = cfg.columns.iter().map(|c| format!("{c}_mean")).collect();
    columns.push("words_per_sent".into());
    columns.push("noun_chunks_per_sent".into());

    let mut rows = HashMap::new();
    for doc in docs {
        let mut row = Vec::with_capacity(columns.len());
        for c in &cfg.columns {
            row.push(mean(&doc.raw.column(c)?).unwrap_or(0.0));
        }

        let sent_len: Vec<f64> = doc.sentences.iter().map(|s| s.length as f64).collect();
        let chunks: Vec<f64> = doc.sentences.iter().map(|s| s.noun_chunks as f64).collect();
        let (Some(wps), Some(ncps)) = (mean(&sent_len), mean(&chunks)) else {
            return Err(FeatureError::EmptyInput(format!(
                "document '{}' has no sentences",
                doc.raw.id
            )));
        };
        row.push(wps / cfg.words_per_sent_scale);
        row.push(ncps / cfg.noun_chunks_per_sent_scale);

        rows.insert(doc.raw.id.clone(), row);
    }

    Ok(DocTable {
        name: "aggregates".into(),
        columns,
        rows,
    })
}

/// One table per configured field: quantile breakpoints of the field over
/// each document's alphabetic rows.
fn quantile_rows(docs: &[DocumentRows], cfg: &QuantileConfig) -> FeatureResult<Vec<DocTable>> {
    let q_columns: Vec<String> = cfg
        .quantiles
        .iter()
        .map(|q| format!("q{}", (q * 100.0 * 1000.0).round() / 1000.0))
        .collect();

    let mut tables = Vec::with_capacity(cfg.columns.len());
    for field in &cfg.columns {
        let mut rows = HashMap::new();
        for doc in docs {
            let alpha = doc.raw.column("alpha")?;
            let values: Vec<f64> = doc
                .raw
                .column(field)?
                .into_iter()
                .zip(alpha)
                .filter(|(_, a)| *a == 1.0)
                .map(|(v, _)| v)
                .collect();
            if values.is_empty() {
                return Err(FeatureError::EmptyInput(format!(
                    "document '{}' has no alphabetic tokens for '{field}' quantiles",
                    doc.raw.id
                )));
            }
            let values = sorted(&values);
            let row = cfg
                .quantiles
                .iter()
                .map(|&q| quantile_sorted(&values, q))
                .collect::<FeatureResult<Vec<f64>>>()?;
            rows.insert(doc.raw.id.clone(), row);
        }
        tables.push(DocTable {
            name: format!("quantiles_{field}"),
            columns: q_columns.clone(),
            rows,
        });
    }
    Ok(tables)
}

/// A per-document side table before re-expansion.
struct DocTable {
    name: String,
    columns: Vec<String>,
    rows: HashMap<String, Vec<f64>>,
}

/// Join a per-document table against the example keys.
fn expand(table: DocTable, keys: &[GroupKey]) -> AuxTable {
    let rows = keys
        .iter()
        .map(|k| table.rows.get(&k.id).cloned().unwrap_or_default())
        .collect();
    AuxTable {
        name: table.name,
        columns: table.columns,
        rows,
    }
}
